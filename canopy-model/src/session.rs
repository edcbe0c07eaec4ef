//! The context every entity operation runs in.

use crate::cache::EntityCache;
use crate::config::ModelConfig;
use crate::entity::Entity;
use crate::error::ModelResult;
use crate::renderer::Renderer;
use crate::schema::KindSchema;
use canopy_storage::{columns, EntityBackend, EntityRow};
use canopy_types::{EntityType, Guid};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Backend, cache, configuration and acting user for entity operations.
///
/// Entities hold no reference to a session; each operation borrows one. A
/// session is cheap to share behind an `Arc` and safe to use from several
/// threads at once.
pub struct Session {
    backend: Arc<dyn EntityBackend>,
    cache: EntityCache,
    config: ModelConfig,
    actor: Option<Guid>,
    renderer: Option<Arc<dyn Renderer>>,
    schemas: HashMap<EntityType, Arc<KindSchema>>,
}

impl Session {
    pub fn new(backend: Arc<dyn EntityBackend>, config: ModelConfig) -> Self {
        let schemas = [
            EntityType::Object,
            EntityType::User,
            EntityType::Group,
            EntityType::Site,
        ]
        .into_iter()
        .map(|t| (t, Arc::new(KindSchema::for_type(t))))
        .collect();
        Self {
            backend,
            cache: EntityCache::new(config.cache_capacity),
            config,
            actor: None,
            renderer: None,
            schemas,
        }
    }

    /// Acts on behalf of `actor`: new entities are owned by it and imports
    /// are reassigned to it.
    pub fn with_actor(mut self, actor: Guid) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Replaces the schema used when hydrating rows of `schema.entity_type`.
    pub fn register_schema(&mut self, schema: KindSchema) {
        self.schemas.insert(schema.entity_type, Arc::new(schema));
    }

    pub fn backend(&self) -> &dyn EntityBackend {
        self.backend.as_ref()
    }

    pub fn cache(&self) -> &EntityCache {
        &self.cache
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn actor(&self) -> Option<Guid> {
        self.actor
    }

    pub fn renderer(&self) -> Option<&dyn Renderer> {
        self.renderer.as_deref()
    }

    pub fn schema_for(&self, entity_type: EntityType) -> Arc<KindSchema> {
        self.schemas
            .get(&entity_type)
            .cloned()
            .unwrap_or_else(|| Arc::new(KindSchema::for_type(entity_type)))
    }

    /// A fresh entity owned and contained by the actor, on the configured
    /// site, with the default access level.
    pub fn new_entity(&self, entity_type: EntityType) -> Entity {
        let mut entity = Entity::new(self.schema_for(entity_type));
        entity.set_owner_guid(self.actor);
        entity.set_container_guid(self.actor);
        entity
            .attributes
            .set_guid(columns::SITE_GUID, self.config.site_guid);
        entity.set_access_id(self.config.default_access_id);
        entity
    }

    /// Looks `guid` up in the cache, falling back to a full backend load.
    ///
    /// Disabled entities are only found when `show_hidden` is set.
    pub fn get_entity(&self, guid: Guid) -> ModelResult<Option<Entity>> {
        if let Some(entity) = self.cache.get(guid) {
            return Ok(Some(entity));
        }
        let Some(row) = self
            .backend
            .fetch_entity_row(guid, self.config.show_hidden)?
        else {
            return Ok(None);
        };
        let mut entity = self.hydrate(&row);
        let tables: Vec<String> = entity
            .schema
            .fragments
            .iter()
            .map(|f| f.table.clone())
            .collect();
        for table in tables {
            if let Some(fragment) = self.backend.fetch_fragment_row(guid, &table)? {
                entity.merge_row(&fragment);
            }
        }
        debug!(
            "loaded {} ({} of {} tables)",
            guid,
            entity.tables_loaded(),
            entity.tables_split()
        );
        self.cache.insert(&entity);
        Ok(Some(entity))
    }

    /// Builds a persisted entity from a base row using the registered schema.
    pub(crate) fn hydrate(&self, row: &EntityRow) -> Entity {
        let entity_type = row.entity_type().unwrap_or_else(|| {
            warn!("row {} has no usable type, treating as object", row.guid);
            EntityType::Object
        });
        Entity::from_row(self.schema_for(entity_type), row)
    }
}
