//! Metadata reads and writes, staged or passed through to the backend.

use crate::entity::{Entity, Persistence};
use crate::session::Session;
use canopy_storage::NewMetadata;
use canopy_types::{Guid, Scalar, Value, ValueType};
use std::collections::BTreeMap;
use tracing::{debug, warn};

impl Entity {
    /// Reads metadata `name`, skipping the attribute set.
    ///
    /// Persisted entities query the backend: one stored value comes back as a
    /// scalar, several as an ordered list. Unsaved entities read their
    /// staging buffer and never touch the backend.
    pub fn get_metadata(&self, session: &Session, name: &str) -> Option<Value> {
        match &self.state {
            Persistence::Unpersisted {
                pending_metadata, ..
            } => pending_metadata.get(name).cloned(),
            Persistence::Persisted { guid } => {
                match session.backend().get_metadata(*guid, name) {
                    Ok(rows) => Value::collapse(rows.into_iter().map(|m| m.value).collect()),
                    Err(e) => {
                        warn!("metadata read {} on {} failed: {}", name, guid, e);
                        None
                    }
                }
            }
        }
    }

    /// Writes metadata `name`.
    ///
    /// A list replaces every stored value under `name` with its elements, in
    /// order. This is not atomic: if one insert fails the write stops and
    /// `false` is returned with the earlier elements already stored, so the
    /// caller must re-read before retrying.
    ///
    /// Unsaved entities stage the value instead. With `allow_multiple` an
    /// existing staged value is promoted to a list and appended to.
    ///
    /// Names of declared attributes are refused; metadata under such a name
    /// could never be read back.
    pub fn set_metadata(
        &mut self,
        session: &Session,
        name: &str,
        value: impl Into<Value>,
        value_type: ValueType,
        allow_multiple: bool,
    ) -> bool {
        if self.attributes.contains(name) {
            debug!("refusing metadata under attribute name {}", name);
            return false;
        }
        let value = value.into();
        let owner = self.owner_guid();
        let access_id = self.access_id();
        match &mut self.state {
            Persistence::Unpersisted {
                pending_metadata, ..
            } => {
                stage(pending_metadata, name, value, allow_multiple);
                true
            }
            Persistence::Persisted { guid } => {
                let write = MetadataWrite {
                    session,
                    guid: *guid,
                    name,
                    value_type,
                    owner,
                    access_id,
                };
                match value {
                    Value::List(items) => write.replace_all(items),
                    Value::Scalar(scalar) => write.create(scalar, allow_multiple),
                }
            }
        }
    }

    /// Removes metadata `name`, or all metadata when `name` is `None`.
    pub fn clear_metadata(&mut self, session: &Session, name: Option<&str>) -> bool {
        match &mut self.state {
            Persistence::Unpersisted {
                pending_metadata, ..
            } => match name {
                Some(name) => pending_metadata.remove(name).is_some(),
                None => {
                    pending_metadata.clear();
                    true
                }
            },
            Persistence::Persisted { guid } => {
                match session.backend().remove_metadata(*guid, name) {
                    Ok(removed) => removed,
                    Err(e) => {
                        warn!("metadata removal on {} failed: {}", guid, e);
                        false
                    }
                }
            }
        }
    }

    /// Every metadata value of the entity, grouped by name.
    pub fn all_metadata(&self, session: &Session) -> BTreeMap<String, Value> {
        match &self.state {
            Persistence::Unpersisted {
                pending_metadata, ..
            } => pending_metadata.clone(),
            Persistence::Persisted { guid } => match session.backend().all_metadata(*guid) {
                Ok(rows) => {
                    let mut grouped: BTreeMap<String, Vec<Scalar>> = BTreeMap::new();
                    for row in rows {
                        grouped.entry(row.name).or_default().push(row.value);
                    }
                    grouped
                        .into_iter()
                        .filter_map(|(name, items)| Value::collapse(items).map(|v| (name, v)))
                        .collect()
                }
                Err(e) => {
                    warn!("metadata listing on {} failed: {}", guid, e);
                    BTreeMap::new()
                }
            },
        }
    }
}

fn stage(pending: &mut BTreeMap<String, Value>, name: &str, value: Value, allow_multiple: bool) {
    if matches!(&value, Value::List(items) if items.is_empty()) {
        pending.remove(name);
        return;
    }
    let merged = match pending.remove(name) {
        Some(existing) if allow_multiple => existing.appended(value),
        _ => value,
    };
    pending.insert(name.to_string(), merged);
}

struct MetadataWrite<'a> {
    session: &'a Session,
    guid: Guid,
    name: &'a str,
    value_type: ValueType,
    owner: Option<Guid>,
    access_id: i64,
}

impl MetadataWrite<'_> {
    fn create(&self, value: Scalar, allow_multiple: bool) -> bool {
        let metadata = NewMetadata {
            entity_guid: self.guid,
            name: self.name.to_string(),
            value,
            value_type: self.value_type,
            owner_guid: self.owner,
            access_id: self.access_id,
            allow_multiple,
        };
        match self.session.backend().create_metadata(&metadata) {
            Ok(created) => created,
            Err(e) => {
                warn!("metadata write {} on {} failed: {}", self.name, self.guid, e);
                false
            }
        }
    }

    fn replace_all(&self, items: Vec<Scalar>) -> bool {
        if let Err(e) = self.session.backend().remove_metadata(self.guid, Some(self.name)) {
            warn!("metadata reset {} on {} failed: {}", self.name, self.guid, e);
            return false;
        }
        let total = items.len();
        for (written, item) in items.into_iter().enumerate() {
            if !self.create(item, true) {
                debug!(
                    "list write {} on {} stopped after {} of {} values",
                    self.name, self.guid, written, total
                );
                return false;
            }
        }
        true
    }
}
