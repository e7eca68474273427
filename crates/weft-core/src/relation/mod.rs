//! Relation reconciliation.
//!
//! Computes the minimal set of link mutations that takes a relation field
//! from its current ordered state to the state an operation set describes.
//! The reconciliation itself is pure; applying the resulting diff to the
//! join store is the store layer's concern.

mod diff;

pub use diff::{reconcile, LinkOp, RelationDiff};
