//! Validation utilities

use serde_json::Value;
use tracing::warn;

use crate::types::*;

/// Read a usable identifier from `attributes[id_field]`
///
/// Missing, `null`, `false`, `0` and `""` mean the record has no identifier.
/// Integers and strings holding a base-10 integer are accepted; a string is
/// judged by the integer it parses to, so `"0"` and `"000"` also mean no
/// identifier. Anything else is rejected with a warning.
pub fn extract_identifier(attributes: &Attributes, id_field: &str) -> Option<PropertyId> {
    let value = attributes.get(id_field)?;
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::Number(n) => match n.as_i64() {
            Some(0) => None,
            Some(id) => Some(id),
            None => {
                warn!(field = id_field, value = %n, "identifier is not an integer");
                None
            }
        },
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => match s.trim().parse::<PropertyId>() {
            Ok(0) => None,
            Ok(id) => Some(id),
            Err(_) => {
                warn!(field = id_field, value = %s, "identifier is not numeric");
                None
            }
        },
        other => {
            warn!(field = id_field, value = %other, "unsupported identifier type");
            None
        }
    }
}

/// Validate that an identifier attribute name is usable
pub fn validate_id_field(id_field: &str) -> SyncResult<()> {
    if id_field.trim().is_empty() {
        return Err(SyncError::Config(
            "Identifier field cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validate that a mail address looks deliverable
pub fn validate_address(label: &str, address: &str) -> SyncResult<()> {
    let address = address.trim();
    if address.is_empty() {
        return Err(SyncError::Config(format!("{label} address cannot be empty")));
    }

    match address.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(SyncError::Config(format!(
            "{label} address '{address}' is not a valid mail address"
        ))),
    }
}
