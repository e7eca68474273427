//! Query compilation.
//!
//! Turns a declarative [`FilterSpec`](weft_proto::FilterSpec) into a
//! [`QueryProgram`]: an explicit join tree plus a predicate tree, with every
//! relation traversal resolved through the registry. The program is backend
//! agnostic; an executor lowers it to its own plan representation.

mod alias;
mod compiler;
mod program;

pub use alias::AliasAllocator;
pub use compiler::compile;
pub use program::{
    ColumnRef, CompareOp, Condition, Join, JoinKind, JoinOn, OrderBy, Predicate, QueryProgram,
};
