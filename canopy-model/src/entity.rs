use crate::attributes::Attributes;
use crate::schema::KindSchema;
use crate::session::Session;
use canopy_storage::{columns, EntityRow};
use canopy_types::{EntityType, Guid, Scalar, Timestamp, Value, ValueType};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

/// An annotation written before its entity had a guid.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAnnotation {
    pub value: Scalar,
    pub value_type: ValueType,
    pub access_id: i64,
    pub owner_guid: Option<Guid>,
}

/// Where an entity's metadata and annotations currently live.
#[derive(Debug, Clone, PartialEq)]
pub enum Persistence {
    /// Not yet inserted: writes are staged in memory until the first save.
    Unpersisted {
        pending_metadata: BTreeMap<String, Value>,
        pending_annotations: BTreeMap<String, PendingAnnotation>,
    },
    /// Inserted: writes go straight to the backend.
    Persisted { guid: Guid },
}

impl Persistence {
    pub(crate) fn fresh() -> Self {
        Self::Unpersisted {
            pending_metadata: BTreeMap::new(),
            pending_annotations: BTreeMap::new(),
        }
    }
}

/// The base persisted unit: a row of fixed attributes plus open-ended
/// metadata and annotations.
///
/// Reads and writes by name resolve against the attribute set first and fall
/// back to metadata. Which metadata store is used depends on [`Persistence`].
#[derive(Debug, Clone)]
pub struct Entity {
    pub(crate) schema: Arc<KindSchema>,
    pub(crate) attributes: Attributes,
    pub(crate) state: Persistence,
    pub(crate) volatile: HashMap<String, Value>,
    pub(crate) tables_loaded: usize,
}

impl Entity {
    /// A fresh, unsaved entity with default attributes.
    ///
    /// Use [`Session::new_entity`] to get owner, site and access defaults.
    pub fn new(schema: impl Into<Arc<KindSchema>>) -> Self {
        let schema = schema.into();
        Self {
            attributes: Attributes::for_schema(&schema),
            schema,
            state: Persistence::fresh(),
            volatile: HashMap::new(),
            tables_loaded: 0,
        }
    }

    /// Builder-style subtype for a fresh entity.
    pub fn with_subtype(mut self, subtype: &str) -> Self {
        self.attributes.put(columns::SUBTYPE, Scalar::from(subtype));
        self
    }

    /// A persisted entity built from its base row.
    pub(crate) fn from_row(schema: Arc<KindSchema>, row: &EntityRow) -> Self {
        let mut entity = Self::new(schema);
        entity.merge_row(row);
        entity.state = Persistence::Persisted { guid: row.guid };
        entity
    }

    /// Merges one backing-table row and counts the fragment as loaded.
    pub(crate) fn merge_row(&mut self, row: &EntityRow) {
        for (name, value) in &row.columns {
            if !self.attributes.put(name, value.clone()) {
                debug!("ignoring undeclared column {} for entity {}", name, row.guid);
            }
        }
        if self.tables_loaded < self.schema.tables_split() {
            self.tables_loaded += 1;
        }
    }

    // ── Identity & state ────────────────────────────────────────

    pub fn schema(&self) -> &KindSchema {
        &self.schema
    }

    pub fn persistence(&self) -> &Persistence {
        &self.state
    }

    /// The permanent identifier, once the entity has been saved.
    pub fn guid(&self) -> Option<Guid> {
        match self.state {
            Persistence::Persisted { guid } => Some(guid),
            Persistence::Unpersisted { .. } => None,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.guid().is_some()
    }

    pub fn tables_loaded(&self) -> usize {
        self.tables_loaded
    }

    pub fn tables_split(&self) -> usize {
        self.schema.tables_split()
    }

    /// True once every backing-table fragment has been merged in.
    pub fn is_fully_loaded(&self) -> bool {
        self.tables_loaded == self.schema.tables_split()
    }

    /// Staged metadata of an unsaved entity; `None` once persisted.
    pub fn pending_metadata(&self) -> Option<&BTreeMap<String, Value>> {
        match &self.state {
            Persistence::Unpersisted {
                pending_metadata, ..
            } => Some(pending_metadata),
            Persistence::Persisted { .. } => None,
        }
    }

    /// Staged annotations of an unsaved entity; `None` once persisted.
    pub fn pending_annotations(&self) -> Option<&BTreeMap<String, PendingAnnotation>> {
        match &self.state {
            Persistence::Unpersisted {
                pending_annotations,
                ..
            } => Some(pending_annotations),
            Persistence::Persisted { .. } => None,
        }
    }

    // ── Typed attribute accessors ───────────────────────────────

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn entity_type(&self) -> EntityType {
        self.attributes
            .entity_type()
            .unwrap_or(self.schema.entity_type)
    }

    /// The subtype as stored: a name before the first save, the backend's
    /// numeric id after it.
    pub fn subtype(&self) -> Option<&Scalar> {
        self.attributes.get(columns::SUBTYPE)
    }

    /// The human-readable subtype, resolving numeric ids through the backend.
    pub fn subtype_name(&self, session: &Session) -> Option<String> {
        match self.subtype()? {
            Scalar::Text(name) => Some(name.clone()),
            Scalar::Int(id) => match session.backend().resolve_subtype_name(*id) {
                Ok(name) => name,
                Err(e) => {
                    warn!("subtype lookup for id {} failed: {}", id, e);
                    None
                }
            },
            Scalar::Bool(_) => None,
        }
    }

    pub fn owner_guid(&self) -> Option<Guid> {
        self.attributes.guid(columns::OWNER_GUID)
    }

    pub fn set_owner_guid(&mut self, owner: Option<Guid>) {
        self.attributes.set_guid(columns::OWNER_GUID, owner);
    }

    pub fn container_guid(&self) -> Option<Guid> {
        self.attributes.guid(columns::CONTAINER_GUID)
    }

    pub fn set_container_guid(&mut self, container: Option<Guid>) {
        self.attributes.set_guid(columns::CONTAINER_GUID, container);
    }

    pub fn site_guid(&self) -> Option<Guid> {
        self.attributes.guid(columns::SITE_GUID)
    }

    pub fn access_id(&self) -> i64 {
        self.attributes.int(columns::ACCESS_ID).unwrap_or_default()
    }

    pub fn set_access_id(&mut self, access_id: i64) {
        self.attributes.put(columns::ACCESS_ID, Scalar::Int(access_id));
    }

    pub fn time_created(&self) -> Option<Timestamp> {
        self.timestamp(columns::TIME_CREATED)
    }

    pub fn time_updated(&self) -> Option<Timestamp> {
        self.timestamp(columns::TIME_UPDATED)
    }

    pub fn last_action(&self) -> Option<Timestamp> {
        self.timestamp(columns::LAST_ACTION)
    }

    fn timestamp(&self, name: &str) -> Option<Timestamp> {
        self.attributes
            .int(name)
            .filter(|secs| *secs > 0)
            .map(Timestamp::from_secs)
    }

    pub fn is_enabled(&self) -> bool {
        self.attributes
            .get(columns::ENABLED)
            .and_then(Scalar::as_bool)
            .unwrap_or(true)
    }

    /// The owning entity, via the session cache.
    pub fn owner_entity(&self, session: &Session) -> Option<Entity> {
        self.related_by_column(session, self.owner_guid())
    }

    /// The containing entity, via the session cache.
    pub fn container_entity(&self, session: &Session) -> Option<Entity> {
        self.related_by_column(session, self.container_guid())
    }

    fn related_by_column(&self, session: &Session, guid: Option<Guid>) -> Option<Entity> {
        match session.get_entity(guid?) {
            Ok(entity) => entity,
            Err(e) => {
                warn!("could not load entity {:?}: {}", guid, e);
                None
            }
        }
    }

    // ── Generic resolver ────────────────────────────────────────

    /// Reads `name`: an attribute if the kind declares one, metadata otherwise.
    ///
    /// Attribute values are returned as-is, empty strings included. Metadata
    /// with several values comes back as a list.
    pub fn get(&self, session: &Session, name: &str) -> Option<Value> {
        if let Some(value) = self.attributes.get(name) {
            return Some(Value::Scalar(value.clone()));
        }
        self.get_metadata(session, name)
    }

    /// Writes `name`: an attribute if the kind declares one, metadata otherwise.
    ///
    /// Protected attributes (guid and the backend-managed times) are left
    /// untouched and `false` is returned. Attributes hold single values only.
    pub fn set(&mut self, session: &Session, name: &str, value: impl Into<Value>) -> bool {
        let value = value.into();
        if self.attributes.contains(name) {
            if KindSchema::is_protected(name) {
                debug!("refusing write to protected attribute {}", name);
                return false;
            }
            return match value {
                Value::Scalar(scalar) => self.attributes.put(name, scalar),
                Value::List(_) => {
                    debug!("refusing list value for attribute {}", name);
                    false
                }
            };
        }
        self.set_metadata(session, name, value, ValueType::Auto, false)
    }

    /// True iff [`get`](Self::get) yields a value.
    pub fn has(&self, session: &Session, name: &str) -> bool {
        self.get(session, name).is_some()
    }

    /// Clears `name`. Attributes are reset to the empty string (local only
    /// until the next save); metadata is removed from its store.
    pub fn unset(&mut self, session: &Session, name: &str) -> bool {
        if self.attributes.contains(name) {
            if KindSchema::is_protected(name) {
                return false;
            }
            return self.attributes.put(name, Scalar::empty());
        }
        self.clear_metadata(session, Some(name))
    }

    // ── Volatile data ───────────────────────────────────────────

    /// Process-local value; never persisted, never copied by `duplicate`.
    pub fn volatile(&self, name: &str) -> Option<&Value> {
        self.volatile.get(name)
    }

    pub fn set_volatile(&mut self, name: &str, value: impl Into<Value>) {
        self.volatile.insert(name.to_string(), value.into());
    }

    pub fn remove_volatile(&mut self, name: &str) -> Option<Value> {
        self.volatile.remove(name)
    }
}
