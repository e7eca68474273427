//! Component and dynamic zone payloads.
//!
//! Repeatable components and dynamic zones are submitted as ordered arrays
//! of [`ComponentEntry`] values. Entries that already exist server-side
//! carry their primary `id`; new entries carry no `id` and may carry a
//! [`ClientCorrelationId`] so the caller can match the server-assigned id
//! after persistence. The correlation id is scoped to one edit session and
//! is discarded once the row is persisted.

use crate::relation::RelationOperationSet;
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};
use std::collections::BTreeMap;

/// A client-generated token correlating a not-yet-persisted component row
/// with the server row created for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, SerdeSerialize, SerdeDeserialize)]
#[serde(transparent)]
pub struct ClientCorrelationId(pub String);

impl ClientCorrelationId {
    /// Wrap a client token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Display for ClientCorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One incoming component or dynamic zone entry.
///
/// For dynamic zones the component type is part of the entry identity:
/// matching against persisted rows is by `(id, component_type)`, never
/// across types.
#[derive(Debug, Clone, Default, PartialEq, SerdeSerialize, SerdeDeserialize)]
pub struct ComponentEntry {
    /// Primary id, present for rows that already exist server-side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Client correlation token for not-yet-persisted rows.
    #[serde(default, rename = "__temp_key", skip_serializing_if = "Option::is_none")]
    pub correlation: Option<ClientCorrelationId>,
    /// Component type identifier (e.g. `"blocks.hero"`).
    #[serde(default, rename = "__component")]
    pub component_type: String,
    /// Relation operation sets for the entry's own relation fields.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub relations: BTreeMap<String, RelationOperationSet>,
    /// Nested component fields.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub nested: BTreeMap<String, Vec<ComponentEntry>>,
}

impl ComponentEntry {
    /// An entry for an already-persisted row.
    pub fn existing(id: i64, component_type: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            component_type: component_type.into(),
            ..Default::default()
        }
    }

    /// A new entry that has not been persisted yet.
    pub fn new(component_type: impl Into<String>) -> Self {
        Self {
            component_type: component_type.into(),
            ..Default::default()
        }
    }

    /// Attach a client correlation token.
    pub fn with_correlation(mut self, token: impl Into<String>) -> Self {
        self.correlation = Some(ClientCorrelationId::new(token));
        self
    }

    /// Attach a relation operation set for one of the entry's fields.
    pub fn with_relation(mut self, field: impl Into<String>, ops: RelationOperationSet) -> Self {
        self.relations.insert(field.into(), ops);
        self
    }

    /// Attach a nested component field.
    pub fn with_nested(
        mut self,
        field: impl Into<String>,
        entries: Vec<ComponentEntry>,
    ) -> Self {
        self.nested.insert(field.into(), entries);
        self
    }

    /// Whether this entry is new (no server id yet).
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }
}
