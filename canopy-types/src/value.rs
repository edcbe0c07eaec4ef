//! Attribute and metadata values.
//!
//! Attributes always hold a single [`Scalar`]. Metadata may hold several
//! values under one name, which is why reads return a [`Value`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single column or metadata value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl Scalar {
    /// The value a cleared attribute is reset to.
    #[must_use]
    pub fn empty() -> Self {
        Self::Text(String::new())
    }

    /// Returns true for the empty string.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Text(s) if s.is_empty())
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view. Numeric strings are accepted since backends
    /// frequently hand columns back as text.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Bool(_) => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(i) => Some(*i != 0),
            Self::Text(s) => match s.as_str() {
                "yes" | "true" | "1" => Some(true),
                "no" | "false" | "0" | "" => Some(false),
                _ => None,
            },
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// The result of a metadata read, or the payload of a metadata write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Scalar(Scalar),
    List(Vec<Scalar>),
}

impl Value {
    /// Returns the scalar, if this is a single value.
    #[must_use]
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            Self::List(_) => None,
        }
    }

    /// Shorthand for the string form of a single text value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(Scalar::as_str)
    }

    /// Shorthand for the integer form of a single value.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        self.as_scalar().and_then(Scalar::as_int)
    }

    /// Flattens into an ordered list of scalars.
    #[must_use]
    pub fn into_list(self) -> Vec<Scalar> {
        match self {
            Self::Scalar(s) => vec![s],
            Self::List(items) => items,
        }
    }

    /// Builds a value from rows read back from a store: nothing, one, or many.
    #[must_use]
    pub fn collapse(mut items: Vec<Scalar>) -> Option<Self> {
        match items.len() {
            0 => None,
            1 => items.pop().map(Self::Scalar),
            _ => Some(Self::List(items)),
        }
    }

    /// Appends `other` to this value, promoting a single value to a list.
    #[must_use]
    pub fn appended(self, other: Value) -> Self {
        let mut items = self.into_list();
        items.extend(other.into_list());
        Self::List(items)
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Self::Scalar(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Scalar(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Scalar(s.into())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Scalar(i.into())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Scalar(b.into())
    }
}

impl From<Vec<Scalar>> for Value {
    fn from(items: Vec<Scalar>) -> Self {
        Self::List(items)
    }
}

impl From<Vec<&str>> for Value {
    fn from(items: Vec<&str>) -> Self {
        Self::List(items.into_iter().map(Scalar::from).collect())
    }
}

impl From<Vec<i64>> for Value {
    fn from(items: Vec<i64>) -> Self {
        Self::List(items.into_iter().map(Scalar::from).collect())
    }
}

/// How a backend should type a stored metadata or annotation value.
///
/// The entity core forwards this untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Integer,
    Text,
    #[default]
    Auto,
}

impl ValueType {
    /// Resolves `Auto` against a concrete value.
    #[must_use]
    pub fn resolve(self, value: &Scalar) -> Self {
        match self {
            Self::Auto => match value {
                Scalar::Int(_) | Scalar::Bool(_) => Self::Integer,
                Scalar::Text(_) => Self::Text,
            },
            other => other,
        }
    }
}
