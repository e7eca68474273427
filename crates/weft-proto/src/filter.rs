//! Filter, sort, and pagination specifications.
//!
//! A [`FilterSpec`] is the normalized read-side request: a list of where
//! clauses (AND-ed together, with nested `or` composition), sort entries,
//! offset/limit pagination, and a publication state.

use crate::error::Error;
use crate::value::Value;
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};
use std::str::FromStr;

/// Comparison operators accepted in where clauses.
///
/// `contains`/`ncontains` are case-insensitive substring matches; the
/// `containss`/`ncontainss` variants are case-sensitive. `in`/`nin` accept
/// arrays (scalar values are coerced to single-element arrays).
#[derive(Debug, Clone, Copy, PartialEq, Eq, SerdeSerialize, SerdeDeserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Member of an array of values.
    In,
    /// Not a member of an array of values.
    Nin,
    /// Case-insensitive substring.
    Contains,
    /// Negated case-insensitive substring.
    Ncontains,
    /// Case-sensitive substring.
    Containss,
    /// Negated case-sensitive substring.
    Ncontainss,
    /// Null check; the value is a boolean selecting IS NULL / IS NOT NULL.
    Null,
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "eq" => Ok(Operator::Eq),
            "ne" => Ok(Operator::Ne),
            "lt" => Ok(Operator::Lt),
            "lte" => Ok(Operator::Lte),
            "gt" => Ok(Operator::Gt),
            "gte" => Ok(Operator::Gte),
            "in" => Ok(Operator::In),
            "nin" => Ok(Operator::Nin),
            "contains" => Ok(Operator::Contains),
            "ncontains" => Ok(Operator::Ncontains),
            "containss" => Ok(Operator::Containss),
            "ncontainss" => Ok(Operator::Ncontainss),
            "null" => Ok(Operator::Null),
            other => Err(Error::UnknownOperator(other.to_string())),
        }
    }
}

/// A filter clause value: either a single scalar or an array.
///
/// Array values under a non-`in`/`nin` operator are expanded by the compiler
/// into an OR across the elements with the same operator.
#[derive(Debug, Clone, PartialEq, SerdeSerialize, SerdeDeserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// An array of values.
    Many(Vec<Value>),
    /// A single value.
    One(Value),
}

impl FilterValue {
    /// View the value as an array, coercing a scalar to one element.
    pub fn as_array(&self) -> Vec<Value> {
        match self {
            FilterValue::Many(values) => values.clone(),
            FilterValue::One(value) => vec![value.clone()],
        }
    }

    /// Check if the value is an array.
    pub fn is_array(&self) -> bool {
        matches!(self, FilterValue::Many(_))
    }
}

impl<V: Into<Value>> From<V> for FilterValue {
    fn from(value: V) -> Self {
        FilterValue::One(value.into())
    }
}

/// One where clause: a plain condition on a (possibly dotted) field path, or
/// an `or` composition.
///
/// In an `or` clause the outer list is OR-ed and each inner list is AND-ed;
/// this nests to arbitrary depth.
#[derive(Debug, Clone, PartialEq, SerdeSerialize, SerdeDeserialize)]
#[serde(untagged)]
pub enum WhereClause {
    /// Boolean OR over AND-groups of sub-clauses.
    Or {
        /// Each inner vector is AND-ed; the outer list is OR-ed.
        or: Vec<Vec<WhereClause>>,
    },
    /// A single comparison on a dot-path field.
    Condition {
        /// Field dot-path, possibly traversing relations and components.
        field: String,
        /// Comparison operator.
        operator: Operator,
        /// Comparison value.
        value: FilterValue,
    },
}

impl WhereClause {
    /// Build a plain condition clause.
    pub fn condition(
        field: impl Into<String>,
        operator: Operator,
        value: impl Into<FilterValue>,
    ) -> Self {
        WhereClause::Condition {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Build an `or` clause from AND-groups.
    pub fn any_of(groups: Vec<Vec<WhereClause>>) -> Self {
        WhereClause::Or { or: groups }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, SerdeSerialize, SerdeDeserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

/// One sort entry, parsed from the `"field:direction"` string form.
#[derive(Debug, Clone, PartialEq, Eq, SerdeSerialize, SerdeDeserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SortSpec {
    /// Field dot-path to order by.
    pub field: String,
    /// Sort direction.
    pub direction: OrderDirection,
}

impl SortSpec {
    /// Ascending sort on a field.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Asc,
        }
    }

    /// Descending sort on a field.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Desc,
        }
    }
}

impl TryFrom<String> for SortSpec {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Error> {
        let (field, direction) = match s.split_once(':') {
            Some((field, "asc")) | Some((field, "ASC")) => (field, OrderDirection::Asc),
            Some((field, "desc")) | Some((field, "DESC")) => (field, OrderDirection::Desc),
            Some((_, other)) => {
                return Err(Error::InvalidSort(format!("unknown direction `{other}`")))
            }
            None => (s.as_str(), OrderDirection::Asc),
        };
        if field.is_empty() {
            return Err(Error::InvalidSort("empty field".to_string()));
        }
        Ok(SortSpec {
            field: field.to_string(),
            direction,
        })
    }
}

impl From<SortSpec> for String {
    fn from(sort: SortSpec) -> String {
        let direction = match sort.direction {
            OrderDirection::Asc => "asc",
            OrderDirection::Desc => "desc",
        };
        format!("{}:{}", sort.field, direction)
    }
}

/// Draft/publish visibility selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, SerdeSerialize, SerdeDeserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicationState {
    /// Only published entries (published-at column not null).
    #[default]
    Live,
    /// Drafts and published entries alike.
    Preview,
}

/// The normalized read-side request for one model.
#[derive(Debug, Clone, Default, PartialEq, SerdeSerialize, SerdeDeserialize)]
pub struct FilterSpec {
    /// Where clauses, AND-ed together.
    #[serde(rename = "where", default)]
    pub conditions: Vec<WhereClause>,
    /// Sort entries, applied in order.
    #[serde(default)]
    pub sort: Vec<SortSpec>,
    /// Pagination offset.
    #[serde(default)]
    pub start: Option<u64>,
    /// Pagination limit.
    #[serde(default)]
    pub limit: Option<u64>,
    /// Draft/publish visibility.
    #[serde(default, rename = "publicationState")]
    pub publication_state: PublicationState,
}

impl FilterSpec {
    /// Create an empty spec (no predicates, live publication state).
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a where clause.
    pub fn where_clause(mut self, clause: WhereClause) -> Self {
        self.conditions.push(clause);
        self
    }

    /// Add a sort entry.
    pub fn sort_by(mut self, sort: SortSpec) -> Self {
        self.sort.push(sort);
        self
    }

    /// Set the publication state.
    pub fn publication_state(mut self, state: PublicationState) -> Self {
        self.publication_state = state;
        self
    }

    /// Set pagination.
    pub fn paginate(mut self, start: u64, limit: u64) -> Self {
        self.start = Some(start);
        self.limit = Some(limit);
        self
    }
}
