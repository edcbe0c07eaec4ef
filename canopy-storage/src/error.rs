//! Error types for the storage layer.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Backend-specific failure (connection, query, injected fault).
    #[error("backend error: {0}")]
    Backend(String),

    /// Entity not found.
    #[error("entity not found: {0}")]
    NotFound(String),
}
