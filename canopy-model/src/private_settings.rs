//! Per-entity private key/value settings.

use crate::entity::Entity;
use crate::session::Session;
use canopy_types::Guid;
use tracing::warn;

/// Private settings of one persisted entity.
///
/// Only obtainable from a saved entity, so a settings call can never be
/// issued without a guid.
pub struct PrivateSettings<'a> {
    session: &'a Session,
    guid: Guid,
}

impl Entity {
    /// Settings handle, or `None` while the entity is unsaved.
    pub fn private_settings<'a>(&self, session: &'a Session) -> Option<PrivateSettings<'a>> {
        self.guid().map(|guid| PrivateSettings { session, guid })
    }
}

impl PrivateSettings<'_> {
    pub fn guid(&self) -> Guid {
        self.guid
    }

    pub fn set(&self, name: &str, value: &str) -> bool {
        self.session
            .backend()
            .set_private_setting(self.guid, name, value)
            .unwrap_or_else(|e| {
                warn!("private setting {} on {} failed: {}", name, self.guid, e);
                false
            })
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.session
            .backend()
            .get_private_setting(self.guid, name)
            .unwrap_or_else(|e| {
                warn!("private setting {} on {} unreadable: {}", name, self.guid, e);
                None
            })
    }

    pub fn remove(&self, name: &str) -> bool {
        self.session
            .backend()
            .remove_private_setting(self.guid, name)
            .unwrap_or_else(|e| {
                warn!("private setting {} on {} not removed: {}", name, self.guid, e);
                false
            })
    }
}
