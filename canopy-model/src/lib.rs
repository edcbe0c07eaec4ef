//! Entity core for Canopy.
//!
//! An [`Entity`] is a row of fixed attributes declared by its [`KindSchema`],
//! extended by open-ended metadata, annotations, relationships and private
//! settings. Reads and writes by name go to the attribute set first and fall
//! back to metadata.
//!
//! # Persistence states
//!
//! A new entity is [`Persistence::Unpersisted`]: metadata and annotations
//! written to it are staged in memory. The first [`Entity::save`] obtains a
//! guid from the backend and flushes the staged data; from then on the entity
//! is [`Persistence::Persisted`] and every write goes straight to the backend.
//!
//! # Collaborators
//!
//! All I/O goes through a [`Session`], which carries the
//! [`EntityBackend`](canopy_storage::EntityBackend), an [`EntityCache`], the
//! [`ModelConfig`], the acting user and an optional [`Renderer`].
//!
//! ```ignore
//! let session = Session::new(Arc::new(MemoryBackend::new()), ModelConfig::default())
//!     .with_actor(user);
//! let mut post = session.new_entity(EntityType::Object).with_subtype("blog");
//! post.set(&session, "title", "Hello");
//! post.set(&session, "tags", vec!["intro", "news"]);
//! post.save(&session)?;
//! ```

mod annotations;
mod attributes;
mod cache;
mod config;
mod entity;
mod error;
mod export;
mod extensions;
mod lifecycle;
mod metadata;
mod private_settings;
mod relationships;
mod renderer;
mod schema;
mod session;

pub use annotations::AnnotationPage;
pub use attributes::Attributes;
pub use cache::EntityCache;
pub use config::ModelConfig;
pub use entity::{Entity, PendingAnnotation, Persistence};
pub use error::{ModelError, ModelResult};
pub use export::{EntityDescriptor, ExportElement, ExportedAttribute, RENDERED_ATTRIBUTE};
pub use extensions::DEFAULT_TAG_NAMES;
pub use lifecycle::SaveOutcome;
pub use private_settings::PrivateSettings;
pub use relationships::RelatedFilter;
pub use renderer::Renderer;
pub use schema::{Fragment, KindSchema, PROTECTED_ATTRIBUTES};
pub use session::Session;
