//! Component and dynamic zone cascade planning.
//!
//! An incoming component array is reconciled against the persisted rows of
//! the same field into a [`CascadePlan`]: rows to create, rows to update
//! (with their own relation diffs), rows to delete (cascading into nested
//! components), and the ordering diff for the field itself. Planning is
//! pure; the store layer executes the plan.

mod plan;

pub use plan::{
    plan_field, CascadePlan, ComponentCreate, ComponentDelete, ComponentUpdate, ExistingComponent,
};
