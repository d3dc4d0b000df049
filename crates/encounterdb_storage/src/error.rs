//! Error types for blob store operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during blob store operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The key cannot be used by this store.
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey {
        /// The rejected key.
        key: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The store refused the write because it is full.
    #[error("quota exceeded: {needed} bytes requested, {limit} allowed")]
    QuotaExceeded {
        /// Size of the rejected value.
        needed: usize,
        /// Maximum size the store accepts.
        limit: usize,
    },

    /// The store is unavailable.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
