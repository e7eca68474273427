//! Weft core - relational reconciliation engine for structured content.
//!
//! This crate holds the model registry, the filter compiler, the relation
//! diff engine, the component cascade planner, and the persistent join
//! store that backs them.

pub mod cascade;
pub mod error;
pub mod query;
pub mod registry;
pub mod relation;
pub mod store;

pub use cascade::{
    plan_field, CascadePlan, ComponentCreate, ComponentDelete, ComponentUpdate, ExistingComponent,
};
pub use error::Error;
pub use query::{compile, ColumnRef, CompareOp, Join, JoinKind, Predicate, QueryProgram};
pub use registry::{
    AttributeDef, AttributeKind, JoinAddress, ModelDef, ModelRegistry, ModelRegistryBuilder,
    RelationDecl, RelationNature, ResolvedRelation, ResolvedTarget, ScalarType, TargetDecl,
};
pub use relation::{reconcile, LinkOp, RelationDiff};
pub use store::{
    apply_cascade_plan, apply_relation_diff, delete_many, delete_owner_links, link_address,
    BulkOutcome, JoinStore, JoinStoreConfig, JoinTransaction, LinkAddress, LinkRow,
};

/// Re-export protocol types.
pub use weft_proto as proto;
