//! The record store boundary.
//!
//! The synthesizer only needs an associative collection answering
//! field-equality queries; [`JsonStore`] is the bundled implementation, a
//! single JSON document with a schema-versioned envelope.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::record::Record;

const STORE_SCHEMA_VERSION: u32 = 1;

/// Conjunction of field-equality predicates over stored records.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub id: Option<String>,
    pub source_file: Option<String>,
    pub src: Option<String>,
    pub tag: Option<String>,
}

impl Query {
    pub fn id(identifier: impl Into<String>) -> Self {
        Self {
            id: Some(identifier.into()),
            ..Self::default()
        }
    }

    pub fn with_source_file(
        mut self,
        file: impl Into<String>,
    ) -> Self {
        self.source_file = Some(file.into());
        self
    }

    /// Scope to records nested inside the given enclosing identifier.
    pub fn with_src(
        mut self,
        enclosing: impl Into<String>,
    ) -> Self {
        self.src = Some(enclosing.into());
        self
    }

    pub fn with_tag(
        mut self,
        tag: impl Into<String>,
    ) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn matches(
        &self,
        record: &Record,
    ) -> bool {
        if let Some(id) = &self.id {
            if &record.id != id {
                return false;
            }
        }
        if let Some(file) = &self.source_file {
            if &record.source_file != file {
                return false;
            }
        }
        if let Some(src) = &self.src {
            if record.src.as_deref() != Some(src.as_str()) {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            if record.tag.as_deref() != Some(tag.as_str()) {
                return false;
            }
        }
        true
    }
}

/// The store boundary: collection writes through `upsert`, synthesis only
/// reads.
pub trait RecordStore {
    fn contains(
        &self,
        query: &Query,
    ) -> bool;

    fn get(
        &self,
        query: &Query,
    ) -> Option<Record>;

    fn identifiers(&self) -> Vec<String>;

    /// Insert a record, replacing any existing one with the same
    /// `(id, source_file)`.
    fn upsert(
        &mut self,
        record: Record,
    );
}

#[derive(Debug)]
pub enum StoreError {
    Io(PathBuf, std::io::Error),
    Schema(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::Io(path, e) => write!(f, "store {}: {e}", path.display()),
            Self::Schema(msg) => write!(f, "store schema: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

#[derive(Debug, Serialize, Deserialize)]
struct StoreEnvelope {
    schema_version: u32,
    records: Vec<Record>,
}

/// JSON-file-backed record store.
#[derive(Debug, Default)]
pub struct JsonStore {
    path: Option<PathBuf>,
    records: Vec<Record>,
}

impl JsonStore {
    /// A store with no backing file, used by tests and `--flat` synthesis.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open an existing store file, or start empty if it does not exist yet.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            debug!("store {} does not exist yet, starting empty", path.display());
            return Ok(Self {
                path: Some(path.to_path_buf()),
                records: Vec::new(),
            });
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Io(path.to_path_buf(), e))?;
        let envelope: StoreEnvelope = serde_json::from_str(&content)
            .map_err(|e| StoreError::Schema(e.to_string()))?;
        if envelope.schema_version != STORE_SCHEMA_VERSION {
            return Err(StoreError::Schema(format!(
                "unsupported schema version {}",
                envelope.schema_version
            )));
        }
        debug!("store {}: {} records", path.display(), envelope.records.len());
        Ok(Self {
            path: Some(path.to_path_buf()),
            records: envelope.records,
        })
    }

    /// Write the store back to its file, if it has one.
    pub fn save(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let envelope = StoreEnvelope {
            schema_version: STORE_SCHEMA_VERSION,
            records: self.records.clone(),
        };
        let content = serde_json::to_string_pretty(&envelope)
            .map_err(|e| StoreError::Schema(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| StoreError::Io(path.clone(), e))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }
}

impl RecordStore for JsonStore {
    fn contains(
        &self,
        query: &Query,
    ) -> bool {
        self.records.iter().any(|r| query.matches(r))
    }

    fn get(
        &self,
        query: &Query,
    ) -> Option<Record> {
        self.records.iter().find(|r| query.matches(r)).cloned()
    }

    fn identifiers(&self) -> Vec<String> {
        self.records.iter().map(|r| r.id.clone()).collect()
    }

    fn upsert(
        &mut self,
        record: Record,
    ) {
        if let Some(existing) = self
            .records
            .iter_mut()
            .find(|r| r.id == record.id && r.source_file == record.source_file)
        {
            *existing = record;
        } else {
            self.records.push(record);
        }
    }
}
