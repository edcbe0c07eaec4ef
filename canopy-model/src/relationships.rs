//! Named directed edges between entities.

use crate::entity::Entity;
use crate::session::Session;
use canopy_storage::RelationshipQuery;
use canopy_types::{EntityType, Guid};
use tracing::warn;

/// Filter for walking one relationship from an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedFilter {
    pub relationship: String,
    /// Follow edges pointing at this entity instead of away from it.
    pub inverse: bool,
    pub entity_type: Option<EntityType>,
    pub subtype: Option<String>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl RelatedFilter {
    pub fn new(relationship: impl Into<String>) -> Self {
        Self {
            relationship: relationship.into(),
            inverse: false,
            entity_type: None,
            subtype: None,
            limit: None,
            offset: 0,
        }
    }

    pub fn inverse(mut self) -> Self {
        self.inverse = true;
        self
    }

    pub fn of_type(mut self, entity_type: EntityType, subtype: Option<&str>) -> Self {
        self.entity_type = Some(entity_type);
        self.subtype = subtype.map(str::to_string);
        self
    }

    pub fn page(mut self, limit: usize, offset: usize) -> Self {
        self.limit = Some(limit);
        self.offset = offset;
        self
    }

    fn to_query(&self, guid: Guid, session: &Session) -> RelationshipQuery {
        RelationshipQuery {
            guid,
            relationship: self.relationship.clone(),
            inverse: self.inverse,
            entity_type: self.entity_type,
            subtype: self.subtype.clone(),
            limit: self.limit,
            offset: self.offset,
            include_hidden: session.config().show_hidden,
        }
    }
}

impl Entity {
    /// Adds the edge `self -relationship-> other`.
    pub fn add_relationship(&self, session: &Session, other: Guid, relationship: &str) -> bool {
        let Some(guid) = self.guid() else {
            return false;
        };
        session
            .backend()
            .add_relationship(guid, relationship, other)
            .unwrap_or_else(|e| {
                warn!("adding {} {} {} failed: {}", guid, relationship, other, e);
                false
            })
    }

    pub fn remove_relationship(&self, session: &Session, other: Guid, relationship: &str) -> bool {
        let Some(guid) = self.guid() else {
            return false;
        };
        session
            .backend()
            .remove_relationship(guid, relationship, other)
            .unwrap_or_else(|e| {
                warn!("removing {} {} {} failed: {}", guid, relationship, other, e);
                false
            })
    }

    /// Removes every relationship touching this entity, in both directions.
    pub fn clear_relationships(&self, session: &Session) -> bool {
        let Some(guid) = self.guid() else {
            return false;
        };
        let clear = |inverse: bool| {
            session
                .backend()
                .remove_all_relationships(guid, None, inverse)
                .unwrap_or_else(|e| {
                    warn!("clearing relationships of {} failed: {}", guid, e);
                    false
                })
        };
        let outbound = clear(false);
        let inbound = clear(true);
        outbound && inbound
    }

    /// Entities at the other end of `filter.relationship`.
    pub fn related_entities(&self, session: &Session, filter: &RelatedFilter) -> Vec<Entity> {
        let Some(guid) = self.guid() else {
            return Vec::new();
        };
        match session
            .backend()
            .get_related_entities(&filter.to_query(guid, session))
        {
            Ok(rows) => rows.iter().map(|row| session.hydrate(row)).collect(),
            Err(e) => {
                warn!("relationship walk {} from {} failed: {}", filter.relationship, guid, e);
                Vec::new()
            }
        }
    }

    /// Counts what [`related_entities`](Self::related_entities) would return,
    /// ignoring paging.
    pub fn count_related_entities(&self, session: &Session, filter: &RelatedFilter) -> usize {
        let Some(guid) = self.guid() else {
            return 0;
        };
        session
            .backend()
            .count_related_entities(&filter.to_query(guid, session))
            .unwrap_or_else(|e| {
                warn!("relationship count {} from {} failed: {}", filter.relationship, guid, e);
                0
            })
    }
}
