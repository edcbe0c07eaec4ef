//! The fixed, per-kind attribute set of an entity.

use crate::schema::KindSchema;
use canopy_storage::columns;
use canopy_types::{EntityType, Guid, Scalar};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Column values keyed by name.
///
/// The key set is fixed when the attributes are built from a [`KindSchema`]:
/// writes to names outside it are refused, so the set never grows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    values: BTreeMap<String, Scalar>,
}

impl Attributes {
    /// Default attributes of a fresh, unsaved entity of `schema`'s kind.
    pub fn for_schema(schema: &KindSchema) -> Self {
        let mut values = BTreeMap::new();
        let mut put = |name: &str, value: Scalar| {
            values.insert(name.to_string(), value);
        };
        put(columns::GUID, Scalar::Int(0));
        put(columns::TYPE, Scalar::from(schema.entity_type.as_str()));
        put(columns::SUBTYPE, Scalar::empty());
        put(columns::OWNER_GUID, Scalar::Int(0));
        put(columns::CONTAINER_GUID, Scalar::Int(0));
        put(columns::SITE_GUID, Scalar::Int(0));
        put(columns::ACCESS_ID, Scalar::Int(0));
        put(columns::TIME_CREATED, Scalar::Int(0));
        put(columns::TIME_UPDATED, Scalar::Int(0));
        put(columns::LAST_ACTION, Scalar::Int(0));
        put(columns::ENABLED, Scalar::Bool(true));
        for fragment in &schema.fragments {
            for (name, default) in &fragment.columns {
                put(name, default.clone());
            }
        }
        Self { values }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.values.get(name)
    }

    /// Overwrites a declared attribute. Returns false for undeclared names.
    ///
    /// Does not check protection; callers outside the lifecycle go through
    /// `Entity::set`.
    pub(crate) fn put(&mut self, name: &str, value: Scalar) -> bool {
        match self.values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Scalar::as_int)
    }

    pub(crate) fn guid(&self, name: &str) -> Option<Guid> {
        self.int(name).and_then(Guid::from_column)
    }

    pub(crate) fn set_guid(&mut self, name: &str, guid: Option<Guid>) {
        self.put(name, Scalar::Int(guid.map(|g| g.as_column()).unwrap_or(0)));
    }

    pub(crate) fn entity_type(&self) -> Option<EntityType> {
        self.get(columns::TYPE)
            .and_then(Scalar::as_str)
            .and_then(|s| s.parse().ok())
    }
}
