//! Storage contract for Canopy entities.
//!
//! The entity core never talks to a database directly. It calls the
//! [`EntityBackend`] trait defined here, keyed by entity [`Guid`]s.
//!
//! # Architecture
//!
//! - Base entity rows carry the core columns (type, subtype, owner, ...)
//! - Subclass columns live in named fragment tables next to the base row
//! - Metadata and annotations are separate row sets keyed by entity guid
//! - Relationships are named directed edges between two guids
//!
//! [`MemoryBackend`] implements the full contract in memory.
//!
//! [`Guid`]: canopy_types::Guid

mod backend;
mod error;
mod memory;
mod records;

pub use backend::EntityBackend;
pub use error::{StorageError, StorageResult};
pub use memory::{BackendOp, MemoryBackend};
pub use records::{
    columns, Annotation, AnnotationAggregate, AnnotationQuery, EntityRow, EntityUpdate,
    MetadataRow, NewAnnotation, NewEntityRow, NewMetadata, RelationshipQuery, SortOrder,
};
