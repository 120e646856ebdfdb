//! Core types and data structures for property reconciliation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Identifier distinguishing one property record from another
pub type PropertyId = i64;

/// Attribute set carried by a record, kept exactly as read from the source
pub type Attributes = Map<String, Value>;

/// A single property record
///
/// The identifier is extracted once when the record is read; the attribute
/// set is opaque to reconciliation and is stored verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Identifier, if the record carried a usable one
    pub id: Option<PropertyId>,
    /// Full attribute set, including the identifier attribute itself
    pub attributes: Attributes,
}

impl Record {
    /// Build a record from an attribute set, reading the identifier from `id_field`
    pub fn from_attributes(attributes: Attributes, id_field: &str) -> Self {
        let id = crate::utils::extract_identifier(&attributes, id_field);
        Self { id, attributes }
    }

    /// Build a record with a known identifier stored under `id_field`
    pub fn with_id(id: PropertyId, id_field: &str, mut attributes: Attributes) -> Self {
        attributes.insert(id_field.to_string(), Value::from(id));
        Self {
            id: Some(id),
            attributes,
        }
    }

    /// Whether this record takes part in set operations
    pub fn has_id(&self) -> bool {
        self.id.is_some()
    }
}

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportResult {
    /// Unique id of the run that produced this report
    pub run_id: Uuid,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Number of records inserted into the store
    pub inserted: usize,
    /// Identifiers present in the store but absent from the batch, ascending
    pub missing: Vec<PropertyId>,
    /// Batch records left out of set operations (no identifier, or a duplicate)
    pub skipped: usize,
}

impl ReportResult {
    /// Number of missing identifiers
    pub fn missing_count(&self) -> usize {
        self.missing.len()
    }
}

/// Errors that can occur during a sync run
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Data access error: {0}")]
    DataAccess(String),
    #[error("Store error: {0}")]
    Store(String),
    #[error("Notification error: {0}")]
    Notification(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for sync operations
pub type SyncResult<T> = Result<T, SyncError>;
