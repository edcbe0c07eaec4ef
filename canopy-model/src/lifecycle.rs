//! Insert/update, loading, enable/disable, deletion and duplication.

use crate::annotations::write_annotation;
use crate::entity::{Entity, Persistence};
use crate::error::{ModelError, ModelResult};
use crate::session::Session;
use canopy_storage::{columns, EntityUpdate, NewEntityRow};
use canopy_types::{Guid, Scalar};
use std::collections::{BTreeMap, HashMap};
use std::mem;
use tracing::{debug, warn};

/// What [`Entity::save`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The entity was inserted and given this guid.
    Created(Guid),
    /// The mutable core columns were updated.
    Updated,
    /// The backend refused or failed the update.
    Rejected,
}

impl SaveOutcome {
    pub fn succeeded(&self) -> bool {
        !matches!(self, Self::Rejected)
    }
}

impl Entity {
    /// Inserts an unsaved entity or updates a saved one.
    ///
    /// On insert the staged metadata and annotations are written through and
    /// the staging buffers disappear with the unsaved state. Failing to get a
    /// guid is the one error this returns; update failures are reported as
    /// [`SaveOutcome::Rejected`].
    pub fn save(&mut self, session: &Session) -> ModelResult<SaveOutcome> {
        match self.state {
            Persistence::Unpersisted { .. } => self.insert(session).map(SaveOutcome::Created),
            Persistence::Persisted { guid } => Ok(self.update(session, guid)),
        }
    }

    fn insert(&mut self, session: &Session) -> ModelResult<Guid> {
        if self.site_guid().is_none() {
            self.attributes
                .set_guid(columns::SITE_GUID, session.config().site_guid);
        }
        let subtype = self.subtype_name(session).unwrap_or_default();
        let row = NewEntityRow {
            entity_type: self.entity_type(),
            subtype: subtype.clone(),
            owner_guid: self.owner_guid(),
            access_id: self.access_id(),
            site_guid: self.site_guid(),
            container_guid: self.container_guid(),
        };
        let guid = session
            .backend()
            .create_entity_row(&row)
            .map_err(ModelError::CreateFailed)?;
        debug!("created {} {} as {}", row.entity_type, subtype, guid);

        self.attributes.set_guid(columns::GUID, Some(guid));
        self.refresh_times(session, guid);

        let staged = mem::replace(&mut self.state, Persistence::Persisted { guid });
        if let Persistence::Unpersisted {
            pending_metadata,
            pending_annotations,
        } = staged
        {
            for (name, value) in pending_metadata {
                if !self.set(session, &name, value) {
                    warn!("staged metadata {} was not written to {}", name, guid);
                }
            }
            for (name, annotation) in pending_annotations {
                if !write_annotation(session, guid, &name, annotation) {
                    warn!("staged annotation {} was not written to {}", name, guid);
                }
            }
        }

        match session
            .backend()
            .resolve_subtype_id(row.entity_type, &subtype)
        {
            Ok(id) => {
                self.attributes.put(columns::SUBTYPE, Scalar::Int(id));
            }
            Err(e) => warn!("subtype {} of {} left unresolved: {}", subtype, guid, e),
        }

        // Everything the backend holds now came from this value.
        if self.write_fragments(session, guid) {
            self.tables_loaded = self.schema.tables_split();
        }
        session.cache().insert(self);
        Ok(guid)
    }

    fn update(&mut self, session: &Session, guid: Guid) -> SaveOutcome {
        self.remember(session, guid);
        let update = EntityUpdate {
            guid,
            owner_guid: self.owner_guid(),
            access_id: self.access_id(),
            container_guid: self.container_guid(),
        };
        let updated = match session.backend().update_entity_row(&update) {
            Ok(updated) => updated,
            Err(e) => {
                warn!("update of {} failed: {}", guid, e);
                false
            }
        };
        if !updated {
            return SaveOutcome::Rejected;
        }
        if !self.write_fragments(session, guid) {
            return SaveOutcome::Rejected;
        }
        debug!("updated {}", guid);
        SaveOutcome::Updated
    }

    /// Pulls the backend-assigned times after an insert. Best effort.
    fn refresh_times(&mut self, session: &Session, guid: Guid) {
        match session.backend().fetch_entity_row(guid, true) {
            Ok(Some(row)) => {
                for name in [
                    columns::TIME_CREATED,
                    columns::TIME_UPDATED,
                    columns::LAST_ACTION,
                ] {
                    if let Some(value) = row.get(name) {
                        self.attributes.put(name, value.clone());
                    }
                }
            }
            Ok(None) => {}
            Err(e) => debug!("could not read back times of {}: {}", guid, e),
        }
    }

    fn write_fragments(&self, session: &Session, guid: Guid) -> bool {
        let mut ok = true;
        for fragment in &self.schema.fragments {
            let values: BTreeMap<String, Scalar> = fragment
                .columns
                .iter()
                .filter_map(|(name, _)| {
                    self.attributes
                        .get(name)
                        .map(|v| (name.clone(), v.clone()))
                })
                .collect();
            match session
                .backend()
                .upsert_fragment_row(guid, &fragment.table, &values)
            {
                Ok(true) => {}
                Ok(false) => ok = false,
                Err(e) => {
                    warn!("writing {} of {} failed: {}", fragment.table, guid, e);
                    ok = false;
                }
            }
        }
        ok
    }

    /// Loads the base row of `guid` into this entity.
    ///
    /// Columns overwrite the current attributes and the row counts as one
    /// loaded table. Calling it again (or [`load_fragment`](Self::load_fragment))
    /// merges further rows until the entity is fully loaded.
    pub fn load(&mut self, session: &Session, guid: Guid) -> bool {
        let row = match session
            .backend()
            .fetch_entity_row(guid, session.config().show_hidden)
        {
            Ok(Some(row)) => row,
            Ok(None) => return false,
            Err(e) => {
                warn!("loading {} failed: {}", guid, e);
                return false;
            }
        };
        self.merge_row(&row);
        self.become_persisted(guid);
        self.remember(session, guid);
        true
    }

    /// Loads one subclass table of a saved entity.
    pub fn load_fragment(&mut self, session: &Session, table: &str) -> bool {
        let Some(guid) = self.guid() else {
            return false;
        };
        match session.backend().fetch_fragment_row(guid, table) {
            Ok(Some(row)) => {
                self.merge_row(&row);
                self.remember(session, guid);
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!("loading {} of {} failed: {}", table, guid, e);
                false
            }
        }
    }

    /// Caches a fully loaded entity; a partial one must not shadow a
    /// complete cached copy.
    fn remember(&self, session: &Session, guid: Guid) {
        if self.is_fully_loaded() {
            session.cache().insert(self);
        } else {
            session.cache().invalidate(guid);
        }
    }

    fn become_persisted(&mut self, guid: Guid) {
        if let Persistence::Unpersisted {
            pending_metadata,
            pending_annotations,
        } = &self.state
        {
            if !pending_metadata.is_empty() || !pending_annotations.is_empty() {
                debug!("discarding staged data while loading {}", guid);
            }
        }
        self.attributes.set_guid(columns::GUID, Some(guid));
        self.state = Persistence::Persisted { guid };
    }

    /// Disables the entity, and with `recursive` everything it owns or
    /// contains. The local flag only changes if the backend succeeds.
    pub fn disable(&mut self, session: &Session, reason: &str, recursive: bool) -> bool {
        let Some(guid) = self.guid() else {
            return false;
        };
        let disabled = session
            .backend()
            .disable_entity(guid, reason, recursive)
            .unwrap_or_else(|e| {
                warn!("disabling {} failed: {}", guid, e);
                false
            });
        if disabled {
            self.attributes.put(columns::ENABLED, Scalar::Bool(false));
            // Descendants may be cached too.
            if recursive {
                session.cache().clear();
            } else {
                session.cache().invalidate(guid);
            }
        }
        disabled
    }

    pub fn enable(&mut self, session: &Session) -> bool {
        let Some(guid) = self.guid() else {
            return false;
        };
        let enabled = session.backend().enable_entity(guid).unwrap_or_else(|e| {
            warn!("enabling {} failed: {}", guid, e);
            false
        });
        if enabled {
            self.attributes.put(columns::ENABLED, Scalar::Bool(true));
            session.cache().invalidate(guid);
        }
        enabled
    }

    /// Hard-deletes the entity. The value is consumed either way.
    pub fn delete(self, session: &Session) -> bool {
        let Some(guid) = self.guid() else {
            return false;
        };
        session.cache().invalidate(guid);
        session.backend().delete_entity_row(guid).unwrap_or_else(|e| {
            warn!("deleting {} failed: {}", guid, e);
            false
        })
    }

    /// A new unsaved entity with this one's attributes and metadata.
    ///
    /// Identity and backend-managed times are reset. Annotations, private
    /// settings and volatile data are not carried over.
    pub fn duplicate(&self, session: &Session) -> Entity {
        let mut attributes = self.attributes.clone();
        for name in [
            columns::GUID,
            columns::TIME_CREATED,
            columns::TIME_UPDATED,
            columns::LAST_ACTION,
        ] {
            attributes.put(name, Scalar::Int(0));
        }
        attributes.put(columns::ENABLED, Scalar::Bool(true));
        if let Some(name) = self.subtype_name(session) {
            attributes.put(columns::SUBTYPE, Scalar::Text(name));
        }

        Entity {
            schema: self.schema.clone(),
            attributes,
            state: Persistence::Unpersisted {
                pending_metadata: self.all_metadata(session),
                pending_annotations: BTreeMap::new(),
            },
            volatile: HashMap::new(),
            tables_loaded: 0,
        }
    }
}
