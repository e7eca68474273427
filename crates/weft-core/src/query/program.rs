//! The compiled query representation.

use weft_proto::{OrderDirection, Value};

/// A column qualified by a table alias.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    /// Table alias.
    pub alias: String,
    /// Column name.
    pub column: String,
}

impl ColumnRef {
    /// Qualify a column with an alias.
    pub fn new(alias: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            column: column.into(),
        }
    }
}

/// Join flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// Row must exist on both sides.
    Inner,
    /// Missing right-hand rows yield nulls.
    Left,
}

/// One equality term of a join's `ON` clause.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinOn {
    /// `<left> = <joined alias>.<right>`.
    Columns {
        /// Column on an already-joined table.
        left: ColumnRef,
        /// Column on the table being joined.
        right: String,
    },
    /// `<joined alias>.<column> = <value>` (discriminator columns).
    Const {
        /// Column on the table being joined.
        column: String,
        /// Required value.
        value: Value,
    },
    /// `<column> = <value>` on an already-joined table; scopes a morph
    /// branch join to one target collection.
    Filter {
        /// Column on an already-joined table.
        column: ColumnRef,
        /// Required value.
        value: Value,
    },
}

/// One join step.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    /// Join flavor.
    pub kind: JoinKind,
    /// Table being joined.
    pub table: String,
    /// Alias for this join.
    pub alias: String,
    /// Conjunction of `ON` terms.
    pub on: Vec<JoinOn>,
}

/// A comparison applied to one column.
#[derive(Debug, Clone, PartialEq)]
pub enum CompareOp {
    /// Equal.
    Eq(Value),
    /// Not equal.
    Ne(Value),
    /// Less than.
    Lt(Value),
    /// Less than or equal.
    Lte(Value),
    /// Greater than.
    Gt(Value),
    /// Greater than or equal.
    Gte(Value),
    /// Member of the set.
    In(Vec<Value>),
    /// Not a member of the set.
    NotIn(Vec<Value>),
    /// Substring match.
    Contains {
        /// Needle.
        needle: String,
        /// Whether the match is case sensitive.
        case_sensitive: bool,
    },
    /// Negated substring match.
    NotContains {
        /// Needle.
        needle: String,
        /// Whether the match is case sensitive.
        case_sensitive: bool,
    },
    /// Column is null.
    IsNull,
    /// Column is not null.
    IsNotNull,
}

/// A single comparison condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Column under test.
    pub column: ColumnRef,
    /// Comparison.
    pub op: CompareOp,
}

/// Predicate tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Always true; the empty filter.
    True,
    /// All children must hold.
    And(Vec<Predicate>),
    /// At least one child must hold.
    Or(Vec<Predicate>),
    /// Leaf comparison.
    Compare(Condition),
    /// Column is not null; used for the publication gate.
    NotNull(ColumnRef),
}

impl Predicate {
    /// Conjoin a list of predicates, flattening trivial cases.
    pub fn all(mut children: Vec<Predicate>) -> Predicate {
        children.retain(|p| !matches!(p, Predicate::True));
        match children.len() {
            0 => Predicate::True,
            1 => children.pop().unwrap(),
            _ => Predicate::And(children),
        }
    }
}

/// One ordering term.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    /// Column to order by.
    pub column: ColumnRef,
    /// Direction.
    pub direction: OrderDirection,
}

/// A fully compiled query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryProgram {
    /// Root table.
    pub root_table: String,
    /// Alias of the root table.
    pub root_alias: String,
    /// Join steps, in dependency order.
    pub joins: Vec<Join>,
    /// Filter predicate (publication gate included).
    pub predicate: Predicate,
    /// Ordering terms.
    pub order_by: Vec<OrderBy>,
    /// Offset.
    pub start: Option<u64>,
    /// Page size.
    pub limit: Option<u64>,
}
