// src/core/blob/info.rs

//! Blob metadata and object-key validation (spec §3/§6).

use crate::core::errors::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// A single addressable byte sequence's metadata, as mirrored by the index
/// and returned by backend listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobInfo {
    pub key: String,
    pub etag: String,
    pub size: i64,
    /// RFC3339 timestamp string.
    pub last_modified: String,
}

/// The kind of change a blob underwent, delivered to change subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    Put,
    Delete,
    Copy,
}

/// `(key, kind)` delivered to every registered blob-change callback.
#[derive(Debug, Clone)]
pub struct BlobChangeEvent {
    pub key: String,
    pub kind: ChangeKind,
}

/// Validates an object key: UTF-8 (guaranteed by `&str`), length 1..=1024,
/// must not start with `/`, contain `\`, contain `..`, nor equal `.` or
/// `..` (spec §3/§6). Idempotent: re-validating an already-valid key always
/// succeeds.
pub fn validate_key(key: &str) -> CoreResult<()> {
    if key.is_empty() || key.len() > 1024 {
        return Err(CoreError::InvalidKey(format!(
            "key length {} out of range 1..=1024",
            key.len()
        )));
    }
    if key == "." || key == ".." {
        return Err(CoreError::InvalidKey("key must not be \".\" or \"..\"".into()));
    }
    if key.starts_with('/') {
        return Err(CoreError::InvalidKey("key must not begin with '/'".into()));
    }
    if key.contains('\\') {
        return Err(CoreError::InvalidKey("key must not contain '\\'".into()));
    }
    if key.contains("..") {
        return Err(CoreError::InvalidKey("key must not contain '..'".into()));
    }
    Ok(())
}
