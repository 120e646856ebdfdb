//! Reading a batch of property records from a JSON export

use serde_json::Value;
use std::path::Path;
use tracing::info;

use crate::types::*;

/// Read a batch from a JSON file holding an array of objects
pub fn read_batch(path: impl AsRef<Path>, id_field: &str) -> SyncResult<Vec<Record>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| {
        SyncError::DataAccess(format!("cannot read {}: {e}", path.display()))
    })?;
    let batch = parse_batch(&text, id_field)
        .map_err(|e| SyncError::DataAccess(format!("{}: {e}", path.display())))?;
    info!(path = %path.display(), records = batch.len(), "read batch");
    Ok(batch)
}

/// Parse a batch from JSON text
///
/// The document must be an array whose elements are all objects. Elements
/// without a usable identifier are kept, with `id` set to `None`.
pub fn parse_batch(text: &str, id_field: &str) -> SyncResult<Vec<Record>> {
    let document: Value = serde_json::from_str(text)
        .map_err(|e| SyncError::DataAccess(format!("invalid JSON: {e}")))?;

    let Value::Array(items) = document else {
        return Err(SyncError::DataAccess(
            "expected a JSON array of records".to_string(),
        ));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(attributes) => Ok(Record::from_attributes(attributes, id_field)),
            other => Err(SyncError::DataAccess(format!(
                "record {index} is not an object: {other}"
            ))),
        })
        .collect()
}
