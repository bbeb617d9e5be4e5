use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for record store and lifecycle operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// The data file or its lock could not be read or written
    #[error("Storage unavailable at {path:?}: {message}")]
    StorageUnavailable { path: PathBuf, message: String },

    /// The data file exists but does not hold the expected table
    #[error("Corrupt data in {path:?}: {message}")]
    CorruptData { path: PathBuf, message: String },

    /// No request carries the given reference ID
    #[error("Request not found: {0}")]
    NotFound(String),

    /// An existing reference ID does not match REQ-<digits>
    #[error("Malformed reference ID '{0}' (expected REQ-<digits>)")]
    MalformedIdentifier(String),

    /// Input rejected before any write
    #[error("Invalid input: {0}")]
    Validation(String),
}

impl StoreError {
    pub(crate) fn unavailable(path: &Path, err: impl std::fmt::Display) -> Self {
        StoreError::StorageUnavailable {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    pub(crate) fn corrupt(path: &Path, err: impl std::fmt::Display) -> Self {
        StoreError::CorruptData {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        StoreError::Validation(message.into())
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
