//! Cascade plan computation.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;
use weft_proto::{ClientCorrelationId, ComponentEntry, Ref, RelationOperationSet};

use crate::error::Error;
use crate::registry::{AttributeKind, ModelDef, ModelRegistry};
use crate::relation::{reconcile, RelationDiff};

/// The persisted state of one component row, as loaded from the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExistingComponent {
    /// Primary id of the component row.
    pub id: i64,
    /// Component type identifier.
    pub component_type: String,
    /// Current ordered state of each relation field on the row.
    pub relations: BTreeMap<String, Vec<Ref>>,
    /// Persisted nested component fields.
    pub nested: BTreeMap<String, Vec<ExistingComponent>>,
}

impl ExistingComponent {
    /// A persisted row with no relations or nested components.
    pub fn new(id: i64, component_type: impl Into<String>) -> Self {
        Self {
            id,
            component_type: component_type.into(),
            ..Default::default()
        }
    }

    /// Record the current state of a relation field.
    pub fn with_relation(mut self, field: impl Into<String>, refs: Vec<Ref>) -> Self {
        self.relations.insert(field.into(), refs);
        self
    }

    /// Record a nested component field.
    pub fn with_nested(mut self, field: impl Into<String>, rows: Vec<ExistingComponent>) -> Self {
        self.nested.insert(field.into(), rows);
        self
    }
}

/// A component row to create.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentCreate {
    /// Component type identifier.
    pub component_type: String,
    /// Correlation token linking the row to its slot in the ordering diff
    /// (client-provided, or synthesized from the entry index).
    pub correlation: ClientCorrelationId,
    /// Relation diffs for the new row's own relation fields.
    pub relations: Vec<(String, RelationDiff)>,
    /// Plans for nested component fields.
    pub nested: Vec<CascadePlan>,
}

/// A component row to update in place.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentUpdate {
    /// Primary id of the row.
    pub id: i64,
    /// Component type identifier.
    pub component_type: String,
    /// Relation diffs for the row's relation fields.
    pub relations: Vec<(String, RelationDiff)>,
    /// Plans for nested component fields.
    pub nested: Vec<CascadePlan>,
}

/// A component row to delete, with everything hanging off it.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentDelete {
    /// Primary id of the row.
    pub id: i64,
    /// Component type identifier.
    pub component_type: String,
    /// Nested rows deleted along with this one.
    pub nested: Vec<ComponentDelete>,
}

/// The full reconciliation plan for one component or dynamic zone field.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadePlan {
    /// Attribute name on the owner.
    pub field: String,
    /// Rows to create, in payload order.
    pub creates: Vec<ComponentCreate>,
    /// Rows to update, in payload order.
    pub updates: Vec<ComponentUpdate>,
    /// Rows to delete (not claimed by any incoming entry).
    pub deletes: Vec<ComponentDelete>,
    /// Ordering diff for the field; created rows appear as
    /// [`Ref::Key`] correlation tokens until ids are assigned.
    pub ordering: RelationDiff,
}

enum AllowedTypes<'a> {
    Single(&'a str),
    Zone(&'a [String]),
}

impl AllowedTypes<'_> {
    fn resolve(&self, entry: &ComponentEntry, field: &str) -> Result<String, Error> {
        match self {
            AllowedTypes::Single(expected) => {
                if entry.component_type.is_empty() || entry.component_type == *expected {
                    Ok(expected.to_string())
                } else {
                    Err(Error::Validation(format!(
                        "component type `{}` not allowed on `{field}` (expects `{expected}`)",
                        entry.component_type
                    )))
                }
            }
            AllowedTypes::Zone(allowed) => {
                if entry.component_type.is_empty() {
                    Err(Error::Validation(format!(
                        "dynamic zone `{field}` entries must carry a component type"
                    )))
                } else if allowed.iter().any(|t| t == &entry.component_type) {
                    Ok(entry.component_type.clone())
                } else {
                    Err(Error::Validation(format!(
                        "component type `{}` not allowed in dynamic zone `{field}`",
                        entry.component_type
                    )))
                }
            }
        }
    }
}

/// Reconcile one component or dynamic zone field.
///
/// Incoming entries claim persisted rows by `(id, component_type)`; an id
/// that does not belong to the field is a validation error, never an
/// adoption. Unclaimed persisted rows are deleted together with their
/// nested components. Entry order is authoritative: the resulting ordering
/// diff rewrites whatever changed, with new rows keyed by correlation token
/// until the store assigns ids.
pub fn plan_field(
    registry: &ModelRegistry,
    owner_model: &str,
    field: &str,
    existing: &[ExistingComponent],
    incoming: &[ComponentEntry],
) -> Result<CascadePlan, Error> {
    let model = registry
        .get_model(owner_model)
        .ok_or_else(|| Error::Validation(format!("unknown model `{owner_model}`")))?;
    let attribute = model.get_attribute(field).ok_or_else(|| {
        Error::Validation(format!("unknown field `{field}` on `{owner_model}`"))
    })?;

    let allowed = match &attribute.kind {
        AttributeKind::Component {
            component,
            repeatable,
        } => {
            if !*repeatable && incoming.len() > 1 {
                return Err(Error::Validation(format!(
                    "`{field}` is not repeatable and accepts at most one entry"
                )));
            }
            AllowedTypes::Single(component)
        }
        AttributeKind::DynamicZone { components } => AllowedTypes::Zone(components),
        _ => {
            return Err(Error::Validation(format!(
                "`{field}` on `{owner_model}` is not a component field"
            )))
        }
    };

    let mut creates = Vec::new();
    let mut updates = Vec::new();
    let mut claimed: HashSet<(i64, String)> = HashSet::new();
    let mut incoming_refs = Vec::with_capacity(incoming.len());

    for (index, entry) in incoming.iter().enumerate() {
        let component_type = allowed.resolve(entry, field)?;

        match entry.id {
            Some(id) => {
                let row = existing
                    .iter()
                    .find(|e| e.id == id && e.component_type == component_type)
                    .ok_or_else(|| {
                        Error::Validation(format!(
                            "component {id} (`{component_type}`) is not part of `{field}`"
                        ))
                    })?;
                if !claimed.insert((id, component_type.clone())) {
                    return Err(Error::Validation(format!(
                        "component {id} (`{component_type}`) appears twice in `{field}`"
                    )));
                }
                incoming_refs.push(Ref::Id(id));
                updates.push(plan_update(registry, row, entry, &component_type)?);
            }
            None => {
                let correlation = entry
                    .correlation
                    .clone()
                    .unwrap_or_else(|| ClientCorrelationId::new(format!("new:{index}")));
                incoming_refs.push(Ref::Key(correlation.0.clone()));
                creates.push(plan_create(registry, entry, &component_type, correlation)?);
            }
        }
    }

    let deletes: Vec<ComponentDelete> = existing
        .iter()
        .filter(|row| !claimed.contains(&(row.id, row.component_type.clone())))
        .map(delete_row)
        .collect();

    let current_refs: Vec<Ref> = existing.iter().map(|row| Ref::Id(row.id)).collect();
    let ordering = reconcile(
        &current_refs,
        &RelationOperationSet::replace_with(incoming_refs),
    )?;

    debug!(
        field,
        creates = creates.len(),
        updates = updates.len(),
        deletes = deletes.len(),
        "planned component cascade"
    );

    Ok(CascadePlan {
        field: field.to_string(),
        creates,
        updates,
        deletes,
        ordering,
    })
}

fn component_schema<'a>(
    registry: &'a ModelRegistry,
    component_type: &str,
) -> Result<&'a ModelDef, Error> {
    registry
        .get_component(component_type)
        .ok_or_else(|| Error::Configuration(format!("unknown component type `{component_type}`")))
}

fn plan_relations(
    schema: &ModelDef,
    entry: &ComponentEntry,
    current: &BTreeMap<String, Vec<Ref>>,
) -> Result<Vec<(String, RelationDiff)>, Error> {
    let mut relations = Vec::with_capacity(entry.relations.len());
    for (rel_field, ops) in &entry.relations {
        let is_relation = schema
            .get_attribute(rel_field)
            .and_then(|a| a.as_relation())
            .is_some();
        if !is_relation {
            return Err(Error::Validation(format!(
                "unknown relation field `{rel_field}` on `{}`",
                schema.name
            )));
        }
        let state = current.get(rel_field).cloned().unwrap_or_default();
        relations.push((rel_field.clone(), reconcile(&state, ops)?));
    }
    Ok(relations)
}

fn plan_update(
    registry: &ModelRegistry,
    row: &ExistingComponent,
    entry: &ComponentEntry,
    component_type: &str,
) -> Result<ComponentUpdate, Error> {
    let schema = component_schema(registry, component_type)?;
    let relations = plan_relations(schema, entry, &row.relations)?;

    // nested fields absent from the payload are left untouched
    let mut nested = Vec::with_capacity(entry.nested.len());
    for (nested_field, entries) in &entry.nested {
        let sub_existing = row
            .nested
            .get(nested_field)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        nested.push(plan_field(
            registry,
            component_type,
            nested_field,
            sub_existing,
            entries,
        )?);
    }

    Ok(ComponentUpdate {
        id: row.id,
        component_type: component_type.to_string(),
        relations,
        nested,
    })
}

fn plan_create(
    registry: &ModelRegistry,
    entry: &ComponentEntry,
    component_type: &str,
    correlation: ClientCorrelationId,
) -> Result<ComponentCreate, Error> {
    let schema = component_schema(registry, component_type)?;
    let relations = plan_relations(schema, entry, &BTreeMap::new())?;

    let mut nested = Vec::with_capacity(entry.nested.len());
    for (nested_field, entries) in &entry.nested {
        nested.push(plan_field(
            registry,
            component_type,
            nested_field,
            &[],
            entries,
        )?);
    }

    Ok(ComponentCreate {
        component_type: component_type.to_string(),
        correlation,
        relations,
        nested,
    })
}

/// Deleting a row takes every nested component row with it.
fn delete_row(row: &ExistingComponent) -> ComponentDelete {
    ComponentDelete {
        id: row.id,
        component_type: row.component_type.clone(),
        nested: row
            .nested
            .values()
            .flat_map(|rows| rows.iter().map(delete_row))
            .collect(),
    }
}
