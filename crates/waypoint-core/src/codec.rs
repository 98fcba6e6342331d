//! Blob encoding for persisted [`UrlRecord`]s.
//!
//! Every adapter stores a record as the same JSON document, so the blob
//! written by one backend can be read back by any other.

use crate::error::{Result, StoreError};
use crate::record::UrlRecord;
use crate::short_key::ShortKey;

/// Default storage key prefix: `<storage name>:<state name>:`.
pub const DEFAULT_KEY_PREFIX: &str = "urls:url:";

/// Serializes a record into its stored blob.
pub fn encode(record: &UrlRecord) -> Result<Vec<u8>> {
    serde_json::to_vec(record)
        .map_err(|e| StoreError::Serialization(format!("failed to encode record: {e}")))
}

/// Deserializes a stored blob, checking that it belongs to `key`.
///
/// A blob that parses but names another key is treated as corrupt rather
/// than silently handed to the wrong owner.
pub fn decode(key: &ShortKey, blob: &[u8]) -> Result<UrlRecord> {
    let record: UrlRecord = serde_json::from_slice(blob).map_err(|e| {
        StoreError::InvalidData(format!("invalid stored state for key '{key}': {e}"))
    })?;

    if &record.short_key != key {
        return Err(StoreError::InvalidData(format!(
            "stored state for key '{key}' names key '{}'",
            record.short_key
        )));
    }

    Ok(record)
}
