//! Export to, and import from, serialization elements.
//!
//! The wire format belongs to the caller. This module only decides which
//! elements an entity turns into and what an import is allowed to take from
//! a descriptor.

use crate::entity::Entity;
use crate::error::{ModelError, ModelResult};
use crate::session::Session;
use canopy_storage::columns;
use canopy_types::{EntityType, ExternalId, Scalar, Timestamp, Value};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Name of the trailing presentation element.
pub const RENDERED_ATTRIBUTE: &str = "renderedentity";

/// The entity itself, as seen from outside the system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    pub uuid: ExternalId,
    pub entity_type: EntityType,
    pub subtype: String,
    pub published: Option<Timestamp>,
}

/// One named value belonging to an exported entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedAttribute {
    pub entity: ExternalId,
    pub name: String,
    pub value: Value,
    /// Derived data that an importer must not treat as authoritative.
    pub volatile: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExportElement {
    Entity(EntityDescriptor),
    Attribute(ExportedAttribute),
}

const GUID_REFERENCES: [&str; 3] = [
    columns::OWNER_GUID,
    columns::CONTAINER_GUID,
    columns::SITE_GUID,
];

impl Entity {
    /// Attribute names included in an export, before renaming.
    pub fn exportable_names(&self) -> Vec<&str> {
        let mut names = vec![
            columns::GUID,
            columns::TYPE,
            columns::SUBTYPE,
            columns::TIME_CREATED,
            columns::TIME_UPDATED,
            columns::CONTAINER_GUID,
            columns::OWNER_GUID,
            columns::SITE_GUID,
        ];
        names.extend(self.schema.subclass_columns());
        names
    }

    /// Serializes a saved entity: its descriptor, then one element per
    /// exportable attribute, then the rendered form if a renderer is set.
    pub fn export(&self, session: &Session) -> ModelResult<Vec<ExportElement>> {
        let guid = self.guid().ok_or(ModelError::NotPersisted)?;
        let backend = session.backend();
        let uuid = backend.external_id(guid);

        let mut elements = vec![ExportElement::Entity(EntityDescriptor {
            uuid,
            entity_type: self.entity_type(),
            subtype: self.subtype_name(session).unwrap_or_default(),
            published: self.time_created(),
        })];

        for name in self.exportable_names() {
            if matches!(
                name,
                columns::GUID | columns::TYPE | columns::SUBTYPE | columns::TIME_CREATED
            ) {
                continue;
            }
            let value = if GUID_REFERENCES.contains(&name) {
                match self.attributes.guid(name) {
                    Some(target) => Value::from(backend.external_id(target).to_string()),
                    None => continue,
                }
            } else {
                match self.attributes.get(name) {
                    Some(value) => Value::Scalar(value.clone()),
                    None => continue,
                }
            };
            elements.push(ExportElement::Attribute(ExportedAttribute {
                entity: uuid,
                name: name.to_string(),
                value,
                volatile: false,
            }));
        }

        if let Some(renderer) = session.renderer() {
            let rendered = renderer.render(self, &session.config().render_mode);
            elements.push(ExportElement::Attribute(ExportedAttribute {
                entity: uuid,
                name: RENDERED_ATTRIBUTE.to_string(),
                value: Value::from(rendered),
                volatile: true,
            }));
        }

        debug!("exported {} as {} elements", guid, elements.len());
        Ok(elements)
    }

    /// Populates this entity from an exported descriptor.
    ///
    /// Type, subtype and creation time come from the descriptor. The update
    /// time becomes now and the owner becomes the session's actor; the
    /// exporting side's owner is never carried over.
    pub fn import(&mut self, session: &Session, element: &ExportElement) -> ModelResult<()> {
        let ExportElement::Entity(descriptor) = element else {
            return Err(ModelError::InvalidDescriptor(
                "expected an entity element".to_string(),
            ));
        };
        if descriptor.entity_type != self.schema.entity_type {
            return Err(ModelError::InvalidDescriptor(format!(
                "descriptor is a {}, entity is a {}",
                descriptor.entity_type, self.schema.entity_type
            )));
        }

        self.attributes
            .put(columns::TYPE, Scalar::from(descriptor.entity_type.as_str()));
        self.attributes
            .put(columns::SUBTYPE, Scalar::from(descriptor.subtype.as_str()));
        let created = descriptor.published.map(|t| t.secs()).unwrap_or(0);
        self.attributes
            .put(columns::TIME_CREATED, Scalar::Int(created));
        self.attributes
            .put(columns::TIME_UPDATED, Scalar::Int(Timestamp::now().secs()));
        self.set_owner_guid(session.actor());
        debug!(
            "imported {} {} from {}",
            descriptor.entity_type, descriptor.subtype, descriptor.uuid
        );
        Ok(())
    }
}
