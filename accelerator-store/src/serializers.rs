//! Text encodings for the flat fields of a shared-backend record.
//!
//! Remote backends only store flat string fields, so headers and tag lists
//! are encoded before writing and decoded after reading.

use crate::StoreError;

pub trait RecordSerializer: Send + Sync {
    fn serialize_headers(headers: &[(String, String)]) -> Result<String, StoreError>;

    fn deserialize_headers(data: &str) -> Result<Vec<(String, String)>, StoreError>;

    fn serialize_tags(tags: &[String]) -> Result<String, StoreError>;

    fn deserialize_tags(data: &str) -> Result<Vec<String>, StoreError>;
}

/// Headers as a JSON array of `[name, value]` pairs, tags as a JSON array of
/// strings.
#[derive(Debug, Clone, Copy)]
pub struct JsonSerializer;

impl RecordSerializer for JsonSerializer {
    fn serialize_headers(headers: &[(String, String)]) -> Result<String, StoreError> {
        serde_json::to_string(headers)
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn deserialize_headers(data: &str) -> Result<Vec<(String, String)>, StoreError> {
        serde_json::from_str(data)
            .map_err(|e| StoreError::Deserialization(e.to_string()))
    }

    fn serialize_tags(tags: &[String]) -> Result<String, StoreError> {
        serde_json::to_string(tags)
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn deserialize_tags(data: &str) -> Result<Vec<String>, StoreError> {
        serde_json::from_str(data)
            .map_err(|e| StoreError::Deserialization(e.to_string()))
    }
}
