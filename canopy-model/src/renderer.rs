//! Presentation collaborator used by export.

use crate::entity::Entity;

/// Produces the presentation form of an entity for export.
pub trait Renderer: Send + Sync {
    fn render(&self, entity: &Entity, mode: &str) -> String;
}
