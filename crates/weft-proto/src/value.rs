//! Runtime values and relation target references.

use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

/// A runtime value appearing in filter conditions.
///
/// This is the subset of scalar types a filter clause can compare against.
/// JSON values map onto it untagged: numbers become [`Value::Int`] or
/// [`Value::Float`], strings become [`Value::String`].
#[derive(Debug, Clone, PartialEq, SerdeSerialize, SerdeDeserialize)]
#[serde(untagged)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit floating point.
    Float(f64),
    /// UTF-8 string.
    String(String),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as a string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

/// A reference identifying one relation target row.
///
/// Targets are addressed either by primary key or by a stable external
/// identifier (document key). JSON numbers deserialize to [`Ref::Id`],
/// strings to [`Ref::Key`]. A polymorphic field addresses rows across
/// several collections, so its references carry the target collection as
/// well: `{"id": 5, "type": "articles"}` deserializes to [`Ref::Typed`],
/// and `articles#5` and `videos#5` are distinct references.
///
/// `Ref` is embedded in persisted join rows, so it carries rkyv derives in
/// addition to serde.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Archive, Serialize, Deserialize, SerdeSerialize,
    SerdeDeserialize,
)]
#[serde(untagged)]
pub enum Ref {
    /// Primary key reference.
    Id(i64),
    /// Stable external identifier.
    Key(String),
    /// Primary key scoped to one target collection.
    Typed {
        /// Primary key.
        id: i64,
        /// Target collection name.
        #[serde(rename = "type")]
        kind: String,
    },
}

impl Ref {
    /// A primary key reference scoped to a target collection.
    pub fn typed(id: i64, kind: impl Into<String>) -> Self {
        Ref::Typed {
            id,
            kind: kind.into(),
        }
    }
}

impl From<i64> for Ref {
    fn from(id: i64) -> Self {
        Ref::Id(id)
    }
}

impl From<&str> for Ref {
    fn from(key: &str) -> Self {
        Ref::Key(key.to_string())
    }
}

impl From<String> for Ref {
    fn from(key: String) -> Self {
        Ref::Key(key)
    }
}

impl std::fmt::Display for Ref {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ref::Id(id) => write!(f, "{id}"),
            Ref::Key(key) => write!(f, "{key}"),
            Ref::Typed { id, kind } => write!(f, "{kind}#{id}"),
        }
    }
}
