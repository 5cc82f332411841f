//! Pure functions for serializing/deserializing cached values to/from bytes.
//!
//! Values are stored as JSON, which keeps cache entries human-readable and
//! easy to inspect.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use super::CacheError;

/// Errors that can occur during cache serialization/deserialization.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SerializationError {
    /// Failed to serialize a value to bytes.
    #[error("Failed to serialize: {0}")]
    SerializeFailed(String),
    /// Failed to deserialize bytes to a value.
    #[error("Failed to deserialize: {0}")]
    DeserializeFailed(String),
}

impl From<SerializationError> for CacheError {
    fn from(error: SerializationError) -> Self {
        CacheError::Serialization(error.to_string())
    }
}

/// Result type for serialization operations.
pub type Result<T> = std::result::Result<T, SerializationError>;

/// Serializes a value to JSON bytes.
pub fn serialize_value<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| SerializationError::SerializeFailed(e.to_string()))
}

/// Deserializes JSON bytes to a value.
pub fn deserialize_value<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| SerializationError::DeserializeFailed(e.to_string()))
}

/// Deserializes JSON bytes, treating a stored JSON `null` as absent.
///
/// # Returns
/// `Ok(None)` when the bytes encode `null`, the decoded value otherwise.
pub fn deserialize_present<T: DeserializeOwned>(bytes: &[u8]) -> Result<Option<T>> {
    let value: Value = deserialize_value(bytes)?;
    if value.is_null() {
        return Ok(None);
    }
    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| SerializationError::DeserializeFailed(e.to_string()))
}
