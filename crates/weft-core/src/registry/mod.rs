//! Model registry and association metadata.
//!
//! Relation natures are a pure function of the declared shapes on both sides
//! of a relation, so resolving them requires the full set of registered
//! models. The [`ModelRegistry`] is built once from the main, plugin, and
//! component model namespaces, resolves every relation attribute at build
//! time, and is read-only afterwards.

mod addressing;
mod model;
mod nature;
#[allow(clippy::module_inception)]
mod registry;

pub use addressing::{
    component_table_name, fk_column, many_way_table_name, morph_table_name, pivot_table_name,
    PivotSide, COMPONENT_FIELD_COLUMN, COMPONENT_ID_COLUMN, COMPONENT_ORDER_COLUMN,
    COMPONENT_TYPE_COLUMN, MORPH_FIELD_COLUMN, MORPH_ORDER_COLUMN, MORPH_RELATED_ID_COLUMN,
    MORPH_RELATED_TYPE_COLUMN, PUBLISHED_AT_COLUMN,
};
pub use model::{AttributeDef, AttributeKind, ModelDef, RelationDecl, ScalarType, TargetDecl};
pub use nature::RelationNature;
pub use registry::{
    JoinAddress, ModelRegistry, ModelRegistryBuilder, RelatedEntry, ResolvedRelation,
    ResolvedTarget,
};
