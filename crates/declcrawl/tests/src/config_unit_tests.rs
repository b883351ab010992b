use std::{
    fs,
    path::PathBuf,
    sync::atomic::{AtomicU64, Ordering},
};

use super::*;

/// Create a unique temporary directory for each test.
fn test_dir() -> PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let id = COUNTER.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join(format!("declcrawl_test_{}_{id}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn find_config_discovers_in_same_dir() {
    let dir = test_dir();
    let toml_path = dir.join("declcrawl.toml");
    fs::write(&toml_path, "[collect]\nstrict = true\n").unwrap();

    let found = find_config(&dir);
    assert_eq!(found, Some(toml_path));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn find_config_discovers_in_parent_dir() {
    let dir = test_dir();
    let toml_path = dir.join("declcrawl.toml");
    fs::write(&toml_path, "").unwrap();

    let sub = dir.join("include").join("deep");
    fs::create_dir_all(&sub).unwrap();

    let found = find_config(&sub);
    assert_eq!(found, Some(toml_path));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn load_parses_all_sections() {
    let dir = test_dir();
    let toml_path = dir.join("declcrawl.toml");
    fs::write(
        &toml_path,
        r#"
[database]
path = "types.db.json"

[collect]
strict = true
cxx = true
clang_args = ["-I/opt/include"]

[formats]
default = "layout"
"#,
    )
    .unwrap();

    let config = load(&toml_path).unwrap();
    assert_eq!(config.database.path, dir.join("types.db.json"));
    assert!(config.collect.strict);
    assert!(config.collect.cxx);
    assert_eq!(config.collect.clang_args, vec!["-I/opt/include".to_string()]);
    assert_eq!(config.formats.default, "layout");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn load_keeps_absolute_database_path() {
    let dir = test_dir();
    let toml_path = dir.join("declcrawl.toml");
    fs::write(&toml_path, "[database]\npath = \"/var/db/types.json\"\n").unwrap();

    let config = load(&toml_path).unwrap();
    assert_eq!(config.database.path, PathBuf::from("/var/db/types.json"));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn load_rejects_malformed_toml() {
    let dir = test_dir();
    let toml_path = dir.join("declcrawl.toml");
    fs::write(&toml_path, "[collect\nstrict =\n").unwrap();

    assert!(load(&toml_path).is_err());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn resolve_defaults_when_no_config_exists() {
    let dir = test_dir();
    let config = resolve(&dir).unwrap();
    assert_eq!(config.database.path, PathBuf::from("declcrawl.db.json"));
    assert!(!config.collect.strict);
    assert_eq!(config.formats.default, "c");

    let _ = fs::remove_dir_all(&dir);
}
