// src/core/errors.rs

//! Defines the closed error type shared by the ACL engine and the object
//! store facade.

use std::sync::Arc;
use thiserror::Error;

/// The error type returned by the core subsystems (ACL, blob, datasite, hub).
///
/// Authorization and rule-data errors are returned to callers and never
/// swallowed. Background collaborators (the blob indexer, the datasite
/// coordinator) log these and continue rather than propagate them further.
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    // --- Authorization (spec §4.6/§7) ---
    #[error("no read access")]
    NoReadAccess,
    #[error("no write access")]
    NoWriteAccess,
    #[error("no admin access")]
    NoAdminAccess,
    #[error("invalid access level")]
    InvalidAccessLevel,

    // --- Rule data (spec §4.4/§7) ---
    #[error("no rule covers this path")]
    NoRule,
    #[error("invalid ruleset: {0}")]
    InvalidRuleset(String),
    #[error("ruleset path exceeds maximum depth of 255 segments")]
    MaxDepthExceeded,

    // --- Limits (spec §4.6/§7) ---
    #[error("file size exceeds the rule's limit")]
    FileSizeExceeded,
    #[error("directories are not allowed under this rule")]
    DirsNotAllowed,
    #[error("symlinks are not allowed under this rule")]
    SymlinksNotAllowed,

    // --- Blob (spec §6/§7) ---
    #[error("invalid object key: {0}")]
    InvalidKey(String),
    #[error("object not found")]
    NotFound,
    #[error("blob backend error: {0}")]
    Backend(String),
    #[error("blob index error: {0}")]
    Index(String),

    #[error("io error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::Io(Arc::new(e))
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(e: sqlx::Error) -> Self {
        CoreError::Index(e.to_string())
    }
}

impl From<serde_yaml::Error> for CoreError {
    fn from(e: serde_yaml::Error) -> Self {
        CoreError::InvalidRuleset(e.to_string())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
