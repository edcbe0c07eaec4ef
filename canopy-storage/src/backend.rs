//! The storage contract the entity core is written against.

use crate::error::StorageResult;
use crate::records::{
    Annotation, AnnotationAggregate, AnnotationQuery, EntityRow, EntityUpdate, MetadataRow,
    NewAnnotation, NewEntityRow, NewMetadata, RelationshipQuery,
};
use canopy_types::{EntityType, ExternalId, Guid, Scalar};
use std::collections::BTreeMap;

/// Abstract relational store for entities and everything attached to them.
///
/// Implementations own concurrency control: the core issues calls in order
/// and never retries. Boolean results mean "the store reports it did the
/// thing"; `Err` means the call itself failed.
pub trait EntityBackend: Send + Sync {
    // ── Entity rows ─────────────────────────────────────────────

    /// Inserts a base row and returns its newly assigned guid.
    fn create_entity_row(&self, row: &NewEntityRow) -> StorageResult<Guid>;

    /// Updates the mutable core columns and bumps `time_updated`.
    fn update_entity_row(&self, update: &EntityUpdate) -> StorageResult<bool>;

    /// Fetches the base row. Disabled rows are only returned with `include_hidden`.
    fn fetch_entity_row(&self, guid: Guid, include_hidden: bool)
    -> StorageResult<Option<EntityRow>>;

    /// Fetches one subclass table fragment of an entity.
    fn fetch_fragment_row(&self, guid: Guid, table: &str) -> StorageResult<Option<EntityRow>>;

    /// Inserts or replaces one subclass table fragment.
    fn upsert_fragment_row(
        &self,
        guid: Guid,
        table: &str,
        columns: &BTreeMap<String, Scalar>,
    ) -> StorageResult<bool>;

    /// Hard-deletes an entity and everything attached to it.
    fn delete_entity_row(&self, guid: Guid) -> StorageResult<bool>;

    /// Disables an entity. With `recursive`, also disables everything it owns
    /// or contains, transitively.
    fn disable_entity(&self, guid: Guid, reason: &str, recursive: bool) -> StorageResult<bool>;

    fn enable_entity(&self, guid: Guid) -> StorageResult<bool>;

    // ── Metadata ────────────────────────────────────────────────

    /// All values stored under `name`, in insertion order.
    fn get_metadata(&self, guid: Guid, name: &str) -> StorageResult<Vec<MetadataRow>>;

    /// Every metadata row of the entity, in insertion order.
    fn all_metadata(&self, guid: Guid) -> StorageResult<Vec<MetadataRow>>;

    fn create_metadata(&self, metadata: &NewMetadata) -> StorageResult<bool>;

    /// Removes metadata under `name`, or all of it when `name` is `None`.
    fn remove_metadata(&self, guid: Guid, name: Option<&str>) -> StorageResult<bool>;

    // ── Annotations ─────────────────────────────────────────────

    /// Stores an annotation and returns its id.
    fn create_annotation(&self, annotation: &NewAnnotation) -> StorageResult<u64>;

    fn get_annotations(&self, query: &AnnotationQuery) -> StorageResult<Vec<Annotation>>;

    fn clear_annotations(&self, guid: Guid, name: Option<&str>) -> StorageResult<bool>;

    fn count_annotations(&self, guid: Guid, name: Option<&str>) -> StorageResult<usize>;

    /// Reduces the numeric values of annotations named `name`.
    fn aggregate_annotations(
        &self,
        guid: Guid,
        name: &str,
        aggregate: AnnotationAggregate,
    ) -> StorageResult<Option<f64>>;

    // ── Relationships ───────────────────────────────────────────

    fn add_relationship(&self, guid: Guid, relationship: &str, other: Guid)
    -> StorageResult<bool>;

    fn remove_relationship(
        &self,
        guid: Guid,
        relationship: &str,
        other: Guid,
    ) -> StorageResult<bool>;

    /// Removes every edge from `guid` (or to it, with `inverse`), optionally
    /// restricted to one relationship name.
    fn remove_all_relationships(
        &self,
        guid: Guid,
        relationship: Option<&str>,
        inverse: bool,
    ) -> StorageResult<bool>;

    fn get_related_entities(&self, query: &RelationshipQuery) -> StorageResult<Vec<EntityRow>>;

    fn count_related_entities(&self, query: &RelationshipQuery) -> StorageResult<usize>;

    // ── Private settings ────────────────────────────────────────

    fn set_private_setting(&self, guid: Guid, name: &str, value: &str) -> StorageResult<bool>;

    fn get_private_setting(&self, guid: Guid, name: &str) -> StorageResult<Option<String>>;

    fn remove_private_setting(&self, guid: Guid, name: &str) -> StorageResult<bool>;

    // ── Subtypes and identity ───────────────────────────────────

    /// Returns the numeric id of a subtype, registering it if needed.
    /// The empty subtype is always 0.
    fn resolve_subtype_id(&self, entity_type: EntityType, subtype: &str) -> StorageResult<i64>;

    fn resolve_subtype_name(&self, id: i64) -> StorageResult<Option<String>>;

    /// Globally unique id under which `guid` is exported.
    fn external_id(&self, guid: Guid) -> ExternalId;
}
