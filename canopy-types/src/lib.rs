//! Core type definitions for Canopy.
//!
//! This crate defines the fundamental, storage-agnostic types used throughout
//! the entity core:
//! - Entity identifiers ([`Guid`]) and export identifiers ([`ExternalId`])
//! - Entity types ([`EntityType`])
//! - Attribute and metadata values ([`Scalar`], [`Value`], [`ValueType`])
//! - Unix-second timestamps ([`Timestamp`])
//!
//! Everything that talks to a backend lives in `canopy-storage`; the entity
//! logic itself lives in `canopy-model`.

mod ids;
mod timestamp;
mod value;

pub use ids::{EntityType, ExternalId, Guid};
pub use timestamp::Timestamp;
pub use value::{Scalar, Value, ValueType};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("invalid guid: {0}")]
    InvalidGuid(String),

    #[error("unknown entity type: {0}")]
    UnknownEntityType(String),
}
