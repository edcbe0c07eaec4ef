//! Per-kind attribute declarations.

use canopy_storage::columns;
use canopy_types::{EntityType, Scalar};
use serde::{Deserialize, Serialize};

/// Names that can never be written through the generic mutator.
pub const PROTECTED_ATTRIBUTES: [&str; 4] = [
    columns::GUID,
    columns::TIME_CREATED,
    columns::TIME_UPDATED,
    columns::LAST_ACTION,
];

/// Declares the attribute set of one concrete entity kind.
///
/// Every kind has the base row columns. A kind may add subclass columns,
/// grouped by the backing table ("fragment") that stores them; the number of
/// tables an entity spans is one plus the number of fragments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KindSchema {
    pub entity_type: EntityType,
    pub fragments: Vec<Fragment>,
}

/// A subclass table and the columns it contributes, with their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub table: String,
    pub columns: Vec<(String, Scalar)>,
}

impl Fragment {
    /// A fragment whose columns all default to the empty string.
    pub fn text(table: &str, names: &[&str]) -> Self {
        Self {
            table: table.into(),
            columns: names
                .iter()
                .map(|n| ((*n).to_string(), Scalar::empty()))
                .collect(),
        }
    }

    /// Adds a column with an explicit default.
    pub fn with_column(mut self, name: &str, default: impl Into<Scalar>) -> Self {
        self.columns.push((name.into(), default.into()));
        self
    }
}

impl KindSchema {
    /// A kind stored in the base row alone.
    pub fn bare(entity_type: EntityType) -> Self {
        Self {
            entity_type,
            fragments: Vec::new(),
        }
    }

    /// Content objects: title and description.
    pub fn object() -> Self {
        Self::bare(EntityType::Object)
            .with_fragment(Fragment::text("objects_entity", &["title", "description"]))
    }

    /// User accounts.
    pub fn user() -> Self {
        Self::bare(EntityType::User).with_fragment(Fragment::text(
            "users_entity",
            &["name", "username", "email", "language"],
        ))
    }

    pub fn group() -> Self {
        Self::bare(EntityType::Group)
            .with_fragment(Fragment::text("groups_entity", &["name", "description"]))
    }

    pub fn site() -> Self {
        Self::bare(EntityType::Site)
            .with_fragment(Fragment::text("sites_entity", &["name", "description", "url"]))
    }

    /// The built-in schema for a type.
    pub fn for_type(entity_type: EntityType) -> Self {
        match entity_type {
            EntityType::Object => Self::object(),
            EntityType::User => Self::user(),
            EntityType::Group => Self::group(),
            EntityType::Site => Self::site(),
        }
    }

    pub fn with_fragment(mut self, fragment: Fragment) -> Self {
        self.fragments.push(fragment);
        self
    }

    /// Number of backing tables an entity of this kind spans.
    pub fn tables_split(&self) -> usize {
        1 + self.fragments.len()
    }

    /// Subclass column names, in declaration order.
    pub fn subclass_columns(&self) -> impl Iterator<Item = &str> {
        self.fragments
            .iter()
            .flat_map(|f| f.columns.iter().map(|(n, _)| n.as_str()))
    }

    /// Whether `name` may not be written through the generic mutator.
    pub fn is_protected(name: &str) -> bool {
        PROTECTED_ATTRIBUTES.contains(&name)
    }
}
