//! Serialization for the persisted blobs: the task list, the tombstone
//! list, and the last-sync timestamp.
//!
//! All blobs are JSON; the timestamp is an RFC 3339 string. Decoding an
//! encoded list yields a list equal in content and order to the original.

use chrono::{DateTime, Utc};

use crate::task::{Task, Tombstone};

/// Error type for codec encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// The stored timestamp string is not valid RFC 3339.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

/// Encodes a task list as a JSON array.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the list cannot be serialized.
pub fn encode_tasks(tasks: &[Task]) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(tasks).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Decodes a task list from a JSON array, preserving order.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the bytes cannot be deserialized.
pub fn decode_tasks(bytes: &[u8]) -> Result<Vec<Task>, CodecError> {
    serde_json::from_slice(bytes).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Encodes a tombstone list as a JSON array.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the list cannot be serialized.
pub fn encode_tombstones(tombstones: &[Tombstone]) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(tombstones).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Decodes a tombstone list from a JSON array.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the bytes cannot be deserialized.
pub fn decode_tombstones(bytes: &[u8]) -> Result<Vec<Tombstone>, CodecError> {
    serde_json::from_slice(bytes).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Encodes a timestamp as an RFC 3339 string.
#[must_use]
pub fn encode_timestamp(ts: DateTime<Utc>) -> Vec<u8> {
    ts.to_rfc3339().into_bytes()
}

/// Decodes an RFC 3339 timestamp string.
///
/// # Errors
///
/// Returns `CodecError::InvalidTimestamp` if the bytes are not valid UTF-8
/// or not a valid RFC 3339 timestamp.
pub fn decode_timestamp(bytes: &[u8]) -> Result<DateTime<Utc>, CodecError> {
    let s = std::str::from_utf8(bytes).map_err(|e| CodecError::InvalidTimestamp(e.to_string()))?;
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CodecError::InvalidTimestamp(e.to_string()))
}
