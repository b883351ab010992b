use std::{
    fs,
    path::PathBuf,
    sync::atomic::{AtomicU64, Ordering},
};

use declcrawl::record::{Field, Record, RecordPayload};
use declcrawl::store::{JsonStore, Query, RecordStore};

fn test_dir() -> PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let id = COUNTER.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join(format!("declcrawl_store_{}_{id}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn point_record() -> Record {
    Record::new(
        "struct point",
        "t.h",
        RecordPayload::Struct {
            fields: vec![Field::new("int", "x"), Field::new("int", "y")],
        },
    )
}

#[test]
fn save_and_reopen_round_trip() {
    let dir = test_dir();
    let path = dir.join("db.json");

    let mut store = JsonStore::open(&path).unwrap();
    assert!(store.is_empty());
    store.upsert(point_record());
    store.save().unwrap();

    let reopened = JsonStore::open(&path).unwrap();
    assert_eq!(reopened.len(), 1);
    let record = reopened.get(&Query::id("struct point")).unwrap();
    assert_eq!(record, point_record());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn upsert_replaces_by_identifier_and_file() {
    let mut store = JsonStore::in_memory();
    store.upsert(point_record());

    // Same identifier, same file: replaced.
    let mut updated = point_record();
    updated.tag = Some("v2".to_string());
    store.upsert(updated);
    assert_eq!(store.len(), 1);
    assert_eq!(
        store.get(&Query::id("struct point")).unwrap().tag.as_deref(),
        Some("v2")
    );

    // Same identifier, different file: kept alongside.
    let mut other = point_record();
    other.source_file = "u.h".to_string();
    store.upsert(other);
    assert_eq!(store.len(), 2);
}

#[test]
fn upsert_is_part_of_the_store_contract() {
    let mut store = JsonStore::in_memory();
    let store: &mut dyn RecordStore = &mut store;
    store.upsert(point_record());
    assert!(store.contains(&Query::id("struct point")));
}

#[test]
fn query_predicates_are_conjunctive() {
    let mut store = JsonStore::in_memory();
    let mut tagged = point_record();
    tagged.tag = Some("v1".to_string());
    tagged.src = Some("struct outer".to_string());
    store.upsert(tagged);

    assert!(store.contains(&Query::id("struct point")));
    assert!(store.contains(&Query::id("struct point").with_tag("v1")));
    assert!(!store.contains(&Query::id("struct point").with_tag("v2")));
    assert!(store.contains(
        &Query::id("struct point")
            .with_tag("v1")
            .with_src("struct outer")
            .with_source_file("t.h")
    ));
    assert!(!store.contains(&Query::id("struct point").with_src("struct other")));
}

#[test]
fn persisted_shape_uses_class_discriminator() {
    let json = serde_json::to_value(point_record()).unwrap();
    assert_eq!(json["_class"], "cStruct");
    assert_eq!(json["_in"], "t.h");
    assert_eq!(json["id"], "struct point");
    assert_eq!(json["fields"][0]["ty"], "int");
}

#[test]
fn unknown_class_discriminator_is_rejected() {
    let json = r#"{"id": "struct x", "_in": "t.h", "_class": "cBogus", "fields": []}"#;
    assert!(serde_json::from_str::<Record>(json).is_err());
}

#[test]
fn record_round_trips_through_json() {
    let record = point_record();
    let json = serde_json::to_string(&record).unwrap();
    let back: Record = serde_json::from_str(&json).unwrap();
    assert_eq!(back, record);
}

#[test]
fn unsupported_schema_version_is_an_error() {
    let dir = test_dir();
    let path = dir.join("db.json");
    fs::write(&path, r#"{"schema_version": 99, "records": []}"#).unwrap();

    assert!(JsonStore::open(&path).is_err());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn malformed_store_file_is_an_error() {
    let dir = test_dir();
    let path = dir.join("db.json");
    fs::write(&path, "not json").unwrap();

    assert!(JsonStore::open(&path).is_err());

    let _ = fs::remove_dir_all(&dir);
}
