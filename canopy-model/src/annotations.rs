//! Annotation access for entities.
//!
//! Annotations are timestamped facts (ratings, views, likes) that the backend
//! can aggregate. Unlike metadata, a staged annotation holds one value per
//! name; staging a second one under the same name replaces the first.

use crate::entity::{Entity, PendingAnnotation, Persistence};
use crate::session::Session;
use canopy_storage::{
    Annotation, AnnotationAggregate, AnnotationQuery, NewAnnotation, SortOrder,
};
use canopy_types::{Guid, Scalar, ValueType};
use tracing::warn;

/// Paging and ordering for [`Entity::annotations`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnnotationPage {
    pub limit: Option<usize>,
    pub offset: usize,
    pub order: SortOrder,
}

impl Entity {
    /// Attaches an annotation, or stages it if the entity is unsaved.
    ///
    /// `access_id` defaults to the session's default access level and
    /// `owner` to the acting user.
    pub fn annotate(
        &mut self,
        session: &Session,
        name: &str,
        value: impl Into<Scalar>,
        value_type: ValueType,
        access_id: Option<i64>,
        owner: Option<Guid>,
    ) -> bool {
        let pending = PendingAnnotation {
            value: value.into(),
            value_type,
            access_id: access_id.unwrap_or(session.config().default_access_id),
            owner_guid: owner.or(session.actor()),
        };
        match &mut self.state {
            Persistence::Unpersisted {
                pending_annotations,
                ..
            } => {
                pending_annotations.insert(name.to_string(), pending);
                true
            }
            Persistence::Persisted { guid } => write_annotation(session, *guid, name, pending),
        }
    }

    /// Lists annotations, optionally restricted to `name`.
    pub fn annotations(
        &self,
        session: &Session,
        name: Option<&str>,
        page: AnnotationPage,
    ) -> Vec<Annotation> {
        let Some(guid) = self.guid() else {
            return Vec::new();
        };
        let query = AnnotationQuery {
            entity_guid: guid,
            name: name.map(str::to_string),
            limit: page.limit,
            offset: page.offset,
            order: page.order,
        };
        session
            .backend()
            .get_annotations(&query)
            .unwrap_or_else(|e| {
                warn!("annotation listing on {} failed: {}", guid, e);
                Vec::new()
            })
    }

    /// Removes annotations named `name`, or all of them.
    pub fn clear_annotations(&mut self, session: &Session, name: Option<&str>) -> bool {
        match &mut self.state {
            Persistence::Unpersisted {
                pending_annotations,
                ..
            } => match name {
                Some(name) => pending_annotations.remove(name).is_some(),
                None => {
                    pending_annotations.clear();
                    true
                }
            },
            Persistence::Persisted { guid } => {
                match session.backend().clear_annotations(*guid, name) {
                    Ok(cleared) => cleared,
                    Err(e) => {
                        warn!("annotation removal on {} failed: {}", guid, e);
                        false
                    }
                }
            }
        }
    }

    /// Counts annotations; staged ones are counted for unsaved entities.
    pub fn count_annotations(&self, session: &Session, name: Option<&str>) -> usize {
        match &self.state {
            Persistence::Unpersisted {
                pending_annotations,
                ..
            } => match name {
                Some(name) => usize::from(pending_annotations.contains_key(name)),
                None => pending_annotations.len(),
            },
            Persistence::Persisted { guid } => session
                .backend()
                .count_annotations(*guid, name)
                .unwrap_or_else(|e| {
                    warn!("annotation count on {} failed: {}", guid, e);
                    0
                }),
        }
    }

    pub fn annotations_sum(&self, session: &Session, name: &str) -> Option<f64> {
        self.aggregate(session, name, AnnotationAggregate::Sum)
    }

    pub fn annotations_avg(&self, session: &Session, name: &str) -> Option<f64> {
        self.aggregate(session, name, AnnotationAggregate::Average)
    }

    pub fn annotations_min(&self, session: &Session, name: &str) -> Option<f64> {
        self.aggregate(session, name, AnnotationAggregate::Min)
    }

    pub fn annotations_max(&self, session: &Session, name: &str) -> Option<f64> {
        self.aggregate(session, name, AnnotationAggregate::Max)
    }

    fn aggregate(
        &self,
        session: &Session,
        name: &str,
        aggregate: AnnotationAggregate,
    ) -> Option<f64> {
        let guid = self.guid()?;
        match session.backend().aggregate_annotations(guid, name, aggregate) {
            Ok(result) => result,
            Err(e) => {
                warn!("annotation {:?} of {} on {} failed: {}", aggregate, name, guid, e);
                None
            }
        }
    }
}

pub(crate) fn write_annotation(
    session: &Session,
    guid: Guid,
    name: &str,
    pending: PendingAnnotation,
) -> bool {
    let annotation = NewAnnotation {
        entity_guid: guid,
        name: name.to_string(),
        value: pending.value,
        value_type: pending.value_type,
        owner_guid: pending.owner_guid,
        access_id: pending.access_id,
    };
    match session.backend().create_annotation(&annotation) {
        Ok(_) => true,
        Err(e) => {
            warn!("annotation {} on {} failed: {}", name, guid, e);
            false
        }
    }
}
