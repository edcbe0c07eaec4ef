//! Row and query types exchanged with an [`EntityBackend`](crate::EntityBackend).

use canopy_types::{EntityType, Guid, Scalar, Timestamp, ValueType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Column names of the base entity row.
pub mod columns {
    pub const GUID: &str = "guid";
    pub const TYPE: &str = "type";
    pub const SUBTYPE: &str = "subtype";
    pub const OWNER_GUID: &str = "owner_guid";
    pub const CONTAINER_GUID: &str = "container_guid";
    pub const SITE_GUID: &str = "site_guid";
    pub const ACCESS_ID: &str = "access_id";
    pub const TIME_CREATED: &str = "time_created";
    pub const TIME_UPDATED: &str = "time_updated";
    pub const LAST_ACTION: &str = "last_action";
    pub const ENABLED: &str = "enabled";
}

/// A row (or row fragment) of named columns belonging to one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRow {
    pub guid: Guid,
    pub columns: BTreeMap<String, Scalar>,
}

impl EntityRow {
    pub fn new(guid: Guid) -> Self {
        Self {
            guid,
            columns: BTreeMap::new(),
        }
    }

    /// Builder-style column insert.
    pub fn with(mut self, name: &str, value: impl Into<Scalar>) -> Self {
        self.columns.insert(name.to_string(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.columns.get(name)
    }

    /// The `type` column of a base row.
    pub fn entity_type(&self) -> Option<EntityType> {
        self.get(columns::TYPE)
            .and_then(Scalar::as_str)
            .and_then(|s| s.parse().ok())
    }

    /// The `enabled` column of a base row; rows without one count as enabled.
    pub fn is_enabled(&self) -> bool {
        self.get(columns::ENABLED)
            .and_then(Scalar::as_bool)
            .unwrap_or(true)
    }

    fn guid_column(&self, name: &str) -> Option<Guid> {
        self.get(name)
            .and_then(Scalar::as_int)
            .and_then(Guid::from_column)
    }

    pub fn owner_guid(&self) -> Option<Guid> {
        self.guid_column(columns::OWNER_GUID)
    }

    pub fn container_guid(&self) -> Option<Guid> {
        self.guid_column(columns::CONTAINER_GUID)
    }
}

/// Input for inserting a new base entity row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEntityRow {
    pub entity_type: EntityType,
    /// Human-readable subtype; empty for none.
    pub subtype: String,
    pub owner_guid: Option<Guid>,
    pub access_id: i64,
    pub site_guid: Option<Guid>,
    pub container_guid: Option<Guid>,
}

/// Mutable core columns sent on update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityUpdate {
    pub guid: Guid,
    pub owner_guid: Option<Guid>,
    pub access_id: i64,
    pub container_guid: Option<Guid>,
}

/// A stored metadata row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRow {
    pub id: u64,
    pub entity_guid: Guid,
    pub name: String,
    pub value: Scalar,
    pub value_type: ValueType,
    pub owner_guid: Option<Guid>,
    pub access_id: i64,
    pub time_created: Timestamp,
}

/// Input for writing one metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMetadata {
    pub entity_guid: Guid,
    pub name: String,
    pub value: Scalar,
    pub value_type: ValueType,
    pub owner_guid: Option<Guid>,
    pub access_id: i64,
    /// When false, any existing values under `name` are replaced.
    pub allow_multiple: bool,
}

/// A stored annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: u64,
    pub entity_guid: Guid,
    pub name: String,
    pub value: Scalar,
    pub value_type: ValueType,
    pub owner_guid: Option<Guid>,
    pub access_id: i64,
    pub time_created: Timestamp,
}

/// Input for writing one annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAnnotation {
    pub entity_guid: Guid,
    pub name: String,
    pub value: Scalar,
    pub value_type: ValueType,
    pub owner_guid: Option<Guid>,
    pub access_id: i64,
}

/// Ordering of annotation listings by creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Filter for listing annotations of one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationQuery {
    pub entity_guid: Guid,
    pub name: Option<String>,
    pub limit: Option<usize>,
    pub offset: usize,
    pub order: SortOrder,
}

impl AnnotationQuery {
    pub fn new(entity_guid: Guid) -> Self {
        Self {
            entity_guid,
            name: None,
            limit: None,
            offset: 0,
            order: SortOrder::Ascending,
        }
    }
}

/// Aggregate reducers computed by the backend over annotation values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationAggregate {
    Sum,
    Average,
    Min,
    Max,
}

/// Filter for traversing relationships from one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipQuery {
    pub guid: Guid,
    pub relationship: String,
    /// Follow edges pointing at `guid` instead of away from it.
    pub inverse: bool,
    pub entity_type: Option<EntityType>,
    pub subtype: Option<String>,
    pub limit: Option<usize>,
    pub offset: usize,
    /// Include disabled entities.
    pub include_hidden: bool,
}

impl RelationshipQuery {
    pub fn new(guid: Guid, relationship: impl Into<String>) -> Self {
        Self {
            guid,
            relationship: relationship.into(),
            inverse: false,
            entity_type: None,
            subtype: None,
            limit: None,
            offset: 0,
            include_hidden: false,
        }
    }
}
