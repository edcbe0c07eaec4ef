//! Model configuration.

use canopy_types::Guid;
use serde::{Deserialize, Serialize};

use crate::error::ModelResult;

/// Settings for one [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Access level for new entities, metadata and annotations.
    pub default_access_id: i64,
    /// Site stamped on new entities that have none.
    pub site_guid: Option<Guid>,
    /// Include disabled entities in loads and relationship queries.
    pub show_hidden: bool,
    /// Upper bound on memoized entities; 0 disables the cache.
    pub cache_capacity: usize,
    /// Presentation mode requested from the renderer during export.
    pub render_mode: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            default_access_id: 0,
            site_guid: Guid::new(1),
            show_hidden: false,
            cache_capacity: 256,
            render_mode: "default".to_string(),
        }
    }
}

impl ModelConfig {
    /// Parses a JSON config document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> ModelResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
