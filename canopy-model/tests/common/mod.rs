#![allow(dead_code)]

use canopy_model::{Entity, ModelConfig, Renderer, Session};
use canopy_storage::MemoryBackend;
use canopy_types::{EntityType, Guid};
use std::sync::{Arc, Once};

static TRACING: Once = Once::new();

/// Routes `tracing` output to the test harness; filter with `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn actor() -> Guid {
    Guid::new(900).unwrap()
}

/// A session over a fresh in-memory backend, acting as [`actor`].
pub fn session() -> (Arc<MemoryBackend>, Session) {
    session_with(ModelConfig::default())
}

pub fn session_with(config: ModelConfig) -> (Arc<MemoryBackend>, Session) {
    init_tracing();
    let backend = Arc::new(MemoryBackend::new());
    let session = Session::new(backend.clone(), config).with_actor(actor());
    (backend, session)
}

/// A saved blog post titled `title`.
pub fn saved_post(session: &Session, title: &str) -> Entity {
    let mut post = session.new_entity(EntityType::Object).with_subtype("blog");
    assert!(post.set(session, "title", title));
    post.save(session).unwrap();
    post
}

pub struct TitleRenderer;

impl Renderer for TitleRenderer {
    fn render(&self, entity: &Entity, mode: &str) -> String {
        let title = entity
            .attributes()
            .get("title")
            .map(ToString::to_string)
            .unwrap_or_default();
        format!("<{mode}>{title}</{mode}>")
    }
}
