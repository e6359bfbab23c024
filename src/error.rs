//! Error types for ordkv
//!
//! Provides a unified error type for all operations, plus a coarse
//! [`ErrorKind`] so callers can tell configuration problems apart from
//! storage failures and from misuse of a closed handle.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using KvError
pub type Result<T> = std::result::Result<T, KvError>;

/// Unified error type for ordkv operations
#[derive(Debug, Error)]
pub enum KvError {
    // -------------------------------------------------------------------------
    // Open-time Errors
    // -------------------------------------------------------------------------
    #[error("Path error for {}: {reason}", path.display())]
    Path { path: PathBuf, reason: String },

    #[error("Database at {} is already open: {reason}", path.display())]
    AlreadyOpen { path: PathBuf, reason: String },

    // -------------------------------------------------------------------------
    // Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("Invalid state: {0}")]
    InvalidState(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Coarse classification of a [`KvError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing, inaccessible or non-directory path at open time
    PathError,

    /// Operation attempted on a closed handle
    InvalidState,

    /// The path is already governed by another live handle
    AlreadyOpen,

    /// Durable I/O failed (includes corruption and descriptor exhaustion)
    StorageFailure,
}

impl KvError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            KvError::Path { .. } => ErrorKind::PathError,
            KvError::AlreadyOpen { .. } => ErrorKind::AlreadyOpen,
            KvError::InvalidState(_) => ErrorKind::InvalidState,
            KvError::Io(_)
            | KvError::Corruption(_)
            | KvError::Serialization(_)
            | KvError::Storage(_) => ErrorKind::StorageFailure,
        }
    }

    pub(crate) fn path(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        KvError::Path {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn closed() -> Self {
        KvError::InvalidState("database is closed".to_string())
    }
}

impl From<bincode::Error> for KvError {
    fn from(e: bincode::Error) -> Self {
        KvError::Serialization(e.to_string())
    }
}
