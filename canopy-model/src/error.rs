//! Error types for the entity model.

use canopy_storage::StorageError;
use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors the entity core propagates.
///
/// Most backend failures are reported as `false`/`None` by the entity
/// operations instead; only the cases below are raised.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The backend could not create the entity row.
    #[error("failed to create entity row: {0}")]
    CreateFailed(#[source] StorageError),

    /// Import was handed something other than a compatible entity descriptor.
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),

    /// The operation needs a persisted entity.
    #[error("entity has not been saved yet")]
    NotPersisted,

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}
