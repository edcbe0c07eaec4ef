//! Identifier types used throughout the Canopy core.
//!
//! Internal identifiers are backend-assigned integers. External identifiers
//! are UUID v5 values derived from the internal one, so the same entity always
//! exports under the same id.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Permanent identifier of a persisted entity.
///
/// Assigned once by the backend on first insert. Zero is never a valid guid;
/// unsaved entities carry no guid at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Guid(u64);

impl Guid {
    /// Wraps a raw backend identifier. Returns `None` for zero.
    #[must_use]
    pub const fn new(raw: u64) -> Option<Self> {
        if raw == 0 { None } else { Some(Self(raw)) }
    }

    /// Returns the raw integer value.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// Interprets an attribute column value as a guid reference.
    ///
    /// Zero and negative numbers mean "no reference".
    #[must_use]
    pub fn from_column(raw: i64) -> Option<Self> {
        u64::try_from(raw).ok().and_then(Self::new)
    }

    /// Returns the value as stored in an integer attribute column.
    #[must_use]
    pub fn as_column(&self) -> i64 {
        i64::try_from(self.0).unwrap_or(i64::MAX)
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Guid {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| crate::Error::InvalidGuid(s.to_string()))
    }
}

/// Globally unique identifier used when an entity leaves the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalId(Uuid);

impl ExternalId {
    /// Derives the external id of `guid` within `namespace`.
    #[must_use]
    pub fn derive(namespace: &Uuid, guid: Guid) -> Self {
        Self(Uuid::new_v5(namespace, format!("guid:{}", guid.get()).as_bytes()))
    }

    /// Creates an external id from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "urn:uuid:{}", self.0)
    }
}

impl FromStr for ExternalId {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("urn:uuid:").unwrap_or(s);
        Ok(Self(Uuid::parse_str(raw)?))
    }
}

/// The top-level kind of an entity row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Object,
    User,
    Group,
    Site,
}

impl EntityType {
    /// Returns the canonical lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::User => "user",
            Self::Group => "group",
            Self::Site => "site",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "object" => Ok(Self::Object),
            "user" => Ok(Self::User),
            "group" => Ok(Self::Group),
            "site" => Ok(Self::Site),
            other => Err(crate::Error::UnknownEntityType(other.to_string())),
        }
    }
}
