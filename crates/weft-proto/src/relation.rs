//! Relation mutation operation sets.
//!
//! One [`RelationOperationSet`] is the unit of work a caller submits for a
//! single relation field: `connect` entries carrying optional positional
//! hints, `disconnect` entries, or a full `set` replacement. `connect` and
//! `set` are mutually exclusive; `set` is equivalent to
//! disconnect-all-then-connect-all in the given order.

use crate::error::Error;
use crate::value::Ref;
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

/// A positional hint for a `connect` entry.
///
/// JSON shape is one of `{"before": <ref>}`, `{"after": <ref>}`,
/// `{"start": true}`, `{"end": true}`.
#[derive(Debug, Clone, PartialEq, Eq, SerdeSerialize, SerdeDeserialize)]
#[serde(try_from = "PositionRepr", into = "PositionRepr")]
pub enum Position {
    /// Insert immediately before the given reference.
    Before(Ref),
    /// Insert immediately after the given reference.
    After(Ref),
    /// Insert at the start of the list.
    Start,
    /// Insert at the end of the list.
    End,
}

/// Raw JSON representation of a positional hint.
#[derive(Debug, Clone, Default, SerdeSerialize, SerdeDeserialize)]
struct PositionRepr {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    before: Option<Ref>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    after: Option<Ref>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    end: Option<bool>,
}

impl TryFrom<PositionRepr> for Position {
    type Error = Error;

    fn try_from(repr: PositionRepr) -> Result<Self, Error> {
        let mut hints = 0;
        let mut position = None;

        if let Some(anchor) = repr.before {
            hints += 1;
            position = Some(Position::Before(anchor));
        }
        if let Some(anchor) = repr.after {
            hints += 1;
            position = Some(Position::After(anchor));
        }
        if repr.start == Some(true) {
            hints += 1;
            position = Some(Position::Start);
        }
        if repr.end == Some(true) {
            hints += 1;
            position = Some(Position::End);
        }

        match (hints, position) {
            (1, Some(position)) => Ok(position),
            (0, _) => Err(Error::InvalidPosition(
                "expected one of before/after/start/end".to_string(),
            )),
            _ => Err(Error::InvalidPosition(
                "only one of before/after/start/end may be given".to_string(),
            )),
        }
    }
}

impl From<Position> for PositionRepr {
    fn from(position: Position) -> Self {
        match position {
            Position::Before(anchor) => PositionRepr {
                before: Some(anchor),
                ..Default::default()
            },
            Position::After(anchor) => PositionRepr {
                after: Some(anchor),
                ..Default::default()
            },
            Position::Start => PositionRepr {
                start: Some(true),
                ..Default::default()
            },
            Position::End => PositionRepr {
                end: Some(true),
                ..Default::default()
            },
        }
    }
}

/// A `connect` entry: a target reference plus an optional positional hint.
///
/// An absent position means append at the end. Entries aimed at a
/// polymorphic field name the target collection in `type`, flat in the
/// entry: `{"id": 5, "type": "articles", "position": {"end": true}}`.
#[derive(Debug, Clone, PartialEq, Eq, SerdeSerialize, SerdeDeserialize)]
pub struct Connect {
    /// Target reference.
    pub id: Ref,
    /// Target collection, for polymorphic fields.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Positional hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl Connect {
    /// Connect a reference with no positional hint (append).
    pub fn new(id: impl Into<Ref>) -> Self {
        Self {
            id: id.into(),
            kind: None,
            position: None,
        }
    }

    /// Connect a reference at an explicit position.
    pub fn at(id: impl Into<Ref>, position: Position) -> Self {
        Self {
            id: id.into(),
            kind: None,
            position: Some(position),
        }
    }

    /// The effective reference, folding a flat `type` into the id.
    pub fn reference(&self) -> Ref {
        merge_kind(&self.id, self.kind.as_deref())
    }
}

/// A bare target reference, as used by `disconnect` and `set` entries.
#[derive(Debug, Clone, PartialEq, Eq, SerdeSerialize, SerdeDeserialize)]
pub struct RelationRef {
    /// Target reference.
    pub id: Ref,
    /// Target collection, for polymorphic fields.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl RelationRef {
    /// Wrap a reference.
    pub fn new(id: impl Into<Ref>) -> Self {
        Self {
            id: id.into(),
            kind: None,
        }
    }

    /// The effective reference, folding a flat `type` into the id.
    pub fn reference(&self) -> Ref {
        merge_kind(&self.id, self.kind.as_deref())
    }
}

fn merge_kind(id: &Ref, kind: Option<&str>) -> Ref {
    match (id, kind) {
        (Ref::Id(id), Some(kind)) => Ref::typed(*id, kind),
        _ => id.clone(),
    }
}

/// Options modifying how an operation set is interpreted.
#[derive(Debug, Clone, PartialEq, Eq, SerdeSerialize, SerdeDeserialize)]
pub struct OperationOptions {
    /// When true (the default), disconnecting a reference that is not
    /// currently linked is a validation error. When false, missing refs are
    /// silently ignored.
    #[serde(default = "default_strict")]
    pub strict: bool,
}

fn default_strict() -> bool {
    true
}

impl Default for OperationOptions {
    fn default() -> Self {
        Self { strict: true }
    }
}

/// The unit of work submitted for one relation field.
#[derive(Debug, Clone, Default, PartialEq, SerdeSerialize, SerdeDeserialize)]
pub struct RelationOperationSet {
    /// References to add or reposition.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connect: Vec<Connect>,
    /// References to remove.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disconnect: Vec<RelationRef>,
    /// Full ordered replacement; mutually exclusive with `connect`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set: Option<Vec<RelationRef>>,
    /// Interpretation options.
    #[serde(default)]
    pub options: OperationOptions,
}

impl RelationOperationSet {
    /// Create an empty operation set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a full-replacement operation set.
    pub fn replace_with(refs: impl IntoIterator<Item = impl Into<Ref>>) -> Self {
        Self {
            set: Some(refs.into_iter().map(|r| RelationRef::new(r)).collect()),
            ..Default::default()
        }
    }

    /// Add a connect entry without a position (append).
    pub fn connect(mut self, id: impl Into<Ref>) -> Self {
        self.connect.push(Connect::new(id));
        self
    }

    /// Add a connect entry at an explicit position.
    pub fn connect_at(mut self, id: impl Into<Ref>, position: Position) -> Self {
        self.connect.push(Connect::at(id, position));
        self
    }

    /// Add a disconnect entry.
    pub fn disconnect(mut self, id: impl Into<Ref>) -> Self {
        self.disconnect.push(RelationRef::new(id));
        self
    }

    /// Disable strict mode.
    pub fn non_strict(mut self) -> Self {
        self.options.strict = false;
        self
    }

    /// Check the `connect`/`set` mutual exclusivity invariant.
    pub fn validate(&self) -> Result<(), Error> {
        if self.set.is_some() && !self.connect.is_empty() {
            return Err(Error::ConnectWithSet);
        }
        Ok(())
    }

    /// Check whether this operation set requests no changes at all.
    pub fn is_empty(&self) -> bool {
        self.connect.is_empty() && self.disconnect.is_empty() && self.set.is_none()
    }
}
