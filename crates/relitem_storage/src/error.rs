//! Error types for storage operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Items could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store refused a change.
    #[error("change rejected: {message}")]
    Rejected {
        /// Why the change was refused.
        message: String,
    },

    /// Another process holds the store lock.
    #[error("store locked: another process has exclusive access to {}", path.display())]
    Locked {
        /// The locked store file.
        path: PathBuf,
    },

    /// The persisted snapshot is inconsistent.
    #[error("store corrupted: {0}")]
    Corrupted(String),
}

impl StorageError {
    /// Creates a rejected-change error.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}
