//! The model registry: nature resolution and cached association metadata.

use std::collections::HashMap;

use crate::error::Error;

use super::addressing::{
    fk_column, many_way_table_name, morph_table_name, pivot_table_name, PivotSide,
};
use super::model::{ModelDef, RelationDecl};
use super::nature::{classify_owner, classify_reciprocal, combine, RelationNature, ReciprocalShape};

/// One possible target of a polymorphic relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedEntry {
    /// Target model name.
    pub model: String,
    /// Target collection (table) name.
    pub collection: String,
    /// The reciprocal attribute name on the target.
    pub attribute: String,
}

/// The resolved target of a relation attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedTarget {
    /// A concrete model.
    Model(String),
    /// Any model; lists every collection declaring a `via` at this field.
    Any(Vec<RelatedEntry>),
}

/// Physical addressing for one relation attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinAddress {
    /// Foreign key column stored on the owner's table.
    OwnerColumn {
        /// Column name on the owner table.
        column: String,
    },
    /// Foreign key column stored on the target's table.
    TargetColumn {
        /// Column name on the target table.
        column: String,
    },
    /// Symmetric pivot table.
    Pivot {
        /// Pivot table name.
        table: String,
        /// Column referencing the owner row.
        owner_column: String,
        /// Column referencing the target row.
        target_column: String,
    },
    /// Rows live in the owner's shared morph table, scoped by `field`.
    Morph {
        /// Morph table name.
        table: String,
        /// Attribute name discriminator.
        field: String,
        /// Column referencing the owner row.
        owner_column: String,
    },
    /// Concrete side of a morph relation; rows live in the target's morph
    /// table under the reciprocal attribute name.
    MorphTarget {
        /// Morph table name (on the target side).
        table: String,
        /// Reciprocal attribute name discriminator.
        field: String,
        /// Column referencing the polymorphic owner row.
        owner_column: String,
    },
}

/// Fully resolved metadata for one relation attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRelation {
    /// Relation nature.
    pub nature: RelationNature,
    /// Resolved target.
    pub target: ResolvedTarget,
    /// Reciprocal attribute name, if declared.
    pub via: Option<String>,
    /// Physical addressing.
    pub address: JoinAddress,
    /// Whether this side is dominant.
    pub dominant: bool,
}

/// Namespace a model was registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Namespace {
    Main,
    Plugin,
    Component,
}

/// Immutable registry of all models with resolved association metadata.
///
/// Built once at startup; every relation attribute's nature and addressing
/// is resolved during construction, so an unresolvable declaration is a
/// [`Error::Configuration`] before any request is served.
#[derive(Debug)]
pub struct ModelRegistry {
    models: HashMap<String, (Namespace, ModelDef)>,
    resolved: HashMap<(String, String), ResolvedRelation>,
}

impl ModelRegistry {
    /// Start building a registry.
    pub fn builder() -> ModelRegistryBuilder {
        ModelRegistryBuilder::default()
    }

    /// Look up a model by name across all namespaces.
    pub fn get_model(&self, name: &str) -> Option<&ModelDef> {
        self.models.get(name).map(|(_, m)| m)
    }

    /// Look up a component schema by its type identifier.
    pub fn get_component(&self, component_type: &str) -> Option<&ModelDef> {
        match self.models.get(component_type) {
            Some((Namespace::Component, model)) => Some(model),
            _ => None,
        }
    }

    /// Resolved metadata for one relation attribute.
    pub fn relation(&self, model: &str, attribute: &str) -> Option<&ResolvedRelation> {
        self.resolved
            .get(&(model.to_string(), attribute.to_string()))
    }

    /// Iterate all registered models.
    pub fn models(&self) -> impl Iterator<Item = &ModelDef> {
        self.models.values().map(|(_, m)| m)
    }

    /// All relation attributes across the registry that point at a model.
    pub fn relations_into(&self, model: &str) -> Vec<(&str, &str, &ResolvedRelation)> {
        let mut hits: Vec<_> = self
            .resolved
            .iter()
            .filter(|(_, r)| match &r.target {
                ResolvedTarget::Model(name) => name == model,
                ResolvedTarget::Any(entries) => entries.iter().any(|e| e.model == model),
            })
            .map(|((owner, attr), r)| (owner.as_str(), attr.as_str(), r))
            .collect();
        hits.sort_by_key(|(owner, attr, _)| (owner.to_string(), attr.to_string()));
        hits
    }

    /// Every join table a model's relation attributes write into.
    ///
    /// Used by entity deletion to clear all link rows owned by a row.
    pub fn link_tables(&self, model: &str) -> Vec<String> {
        let mut tables: Vec<String> = self
            .resolved
            .iter()
            .filter(|((owner, _), _)| owner == model)
            .filter_map(|(_, r)| match &r.address {
                JoinAddress::Pivot { table, .. }
                | JoinAddress::Morph { table, .. }
                | JoinAddress::MorphTarget { table, .. } => Some(table.clone()),
                JoinAddress::OwnerColumn { .. } | JoinAddress::TargetColumn { .. } => None,
            })
            .collect();
        tables.sort();
        tables.dedup();
        tables
    }
}

/// Builder collecting model definitions for the three namespaces.
#[derive(Default)]
pub struct ModelRegistryBuilder {
    models: Vec<ModelDef>,
    plugin_models: Vec<ModelDef>,
    components: Vec<ModelDef>,
}

impl ModelRegistryBuilder {
    /// Register a main-namespace model.
    pub fn with_model(mut self, model: ModelDef) -> Self {
        self.models.push(model);
        self
    }

    /// Register a plugin-provided model.
    pub fn with_plugin_model(mut self, model: ModelDef) -> Self {
        self.plugin_models.push(model);
        self
    }

    /// Register a component schema.
    pub fn with_component(mut self, model: ModelDef) -> Self {
        self.components.push(model);
        self
    }

    /// Resolve every relation attribute and freeze the registry.
    pub fn build(self) -> Result<ModelRegistry, Error> {
        let mut models: HashMap<String, (Namespace, ModelDef)> = HashMap::new();

        let namespaced = self
            .models
            .into_iter()
            .map(|m| (Namespace::Main, m))
            .chain(self.plugin_models.into_iter().map(|m| (Namespace::Plugin, m)))
            .chain(self.components.into_iter().map(|m| (Namespace::Component, m)));

        for (namespace, model) in namespaced {
            if models.contains_key(&model.name) {
                return Err(Error::Configuration(format!(
                    "duplicate model name `{}`",
                    model.name
                )));
            }
            models.insert(model.name.clone(), (namespace, model));
        }

        let mut resolved = HashMap::new();
        let owners: Vec<String> = {
            let mut names: Vec<_> = models.keys().cloned().collect();
            names.sort();
            names
        };

        for owner_name in &owners {
            let owner = &models[owner_name].1;
            for (attr_name, decl) in owner.relation_attributes() {
                let relation = resolve_relation(owner, attr_name, decl, &models)?;
                resolved.insert((owner_name.clone(), attr_name.to_string()), relation);
            }
        }

        Ok(ModelRegistry { models, resolved })
    }
}

/// Resolve one relation attribute against the full model set.
fn resolve_relation(
    owner: &ModelDef,
    attr_name: &str,
    decl: &RelationDecl,
    models: &HashMap<String, (Namespace, ModelDef)>,
) -> Result<ResolvedRelation, Error> {
    let owner_shape = classify_owner(decl);

    // Find the reciprocal attribute. For a concrete target the declared
    // `via` wins; otherwise the whole registry is searched for an attribute
    // whose own `via` names this one and points back at the owner.
    let (reciprocal_shape, target) = if decl.target.is_wildcard() {
        let related = collect_related(owner, attr_name, models);
        let shape = related
            .first()
            .and_then(|entry| {
                models[&entry.model]
                    .1
                    .get_attribute(&entry.attribute)
                    .and_then(|a| a.as_relation())
                    .map(classify_reciprocal)
            })
            .unwrap_or(ReciprocalShape::Absent);
        (shape, ResolvedTarget::Any(related))
    } else {
        let target_name = decl.target.model_name().unwrap();
        let (_, target_model) = models.get(target_name).ok_or_else(|| {
            Error::Configuration(format!(
                "relation {}.{} targets unknown model `{}`",
                owner.name, attr_name, target_name
            ))
        })?;

        let reciprocal = match &decl.via {
            Some(via) => {
                let attr = target_model
                    .get_attribute(via)
                    .and_then(|a| a.as_relation())
                    .ok_or_else(|| {
                        Error::Configuration(format!(
                            "relation {}.{}: via `{}` is not a relation attribute on `{}`",
                            owner.name, attr_name, via, target_name
                        ))
                    })?;
                let points_back = attr.target.is_wildcard()
                    || attr.target.model_name() == Some(owner.name.as_str());
                if !points_back {
                    return Err(Error::Configuration(format!(
                        "relation {}.{}: via `{}` on `{}` does not point back",
                        owner.name, attr_name, via, target_name
                    )));
                }
                Some(attr)
            }
            None => target_model
                .relation_attributes()
                .find(|(_, d)| {
                    d.via.as_deref() == Some(attr_name)
                        && d.target.model_name() == Some(owner.name.as_str())
                })
                .map(|(_, d)| d),
        };

        let shape = reciprocal
            .map(classify_reciprocal)
            .unwrap_or(ReciprocalShape::Absent);
        (shape, ResolvedTarget::Model(target_name.to_string()))
    };

    let nature = combine(owner_shape, reciprocal_shape).ok_or_else(|| {
        Error::Configuration(format!(
            "relation {}.{} cannot be classified",
            owner.name, attr_name
        ))
    })?;

    let address = compute_address(owner, attr_name, decl, nature, &target, models)?;

    Ok(ResolvedRelation {
        nature,
        target,
        via: decl.via.clone(),
        address,
        dominant: decl.dominant,
    })
}

/// Collect every collection declaring a `via` pointing at a wildcard
/// attribute, across all namespaces.
fn collect_related(
    owner: &ModelDef,
    attr_name: &str,
    models: &HashMap<String, (Namespace, ModelDef)>,
) -> Vec<RelatedEntry> {
    let mut related: Vec<RelatedEntry> = models
        .values()
        .flat_map(|(_, model)| {
            model
                .relation_attributes()
                .filter(|(_, d)| {
                    d.via.as_deref() == Some(attr_name)
                        && d.target.model_name() == Some(owner.name.as_str())
                })
                .map(|(name, _)| RelatedEntry {
                    model: model.name.clone(),
                    collection: model.collection_name.clone(),
                    attribute: name.to_string(),
                })
        })
        .collect();
    related.sort_by(|a, b| a.model.cmp(&b.model));
    related
}

fn concrete_target<'m>(
    models: &'m HashMap<String, (Namespace, ModelDef)>,
    target: &ResolvedTarget,
    owner: &ModelDef,
    attr_name: &str,
) -> Result<&'m ModelDef, Error> {
    match target {
        ResolvedTarget::Model(name) => models.get(name).map(|(_, m)| m).ok_or_else(|| {
            Error::Configuration(format!(
                "relation {}.{}: unknown target model `{}`",
                owner.name, attr_name, name
            ))
        }),
        ResolvedTarget::Any(_) => Err(Error::Configuration(format!(
            "relation {}.{}: concrete addressing requested for wildcard target",
            owner.name, attr_name
        ))),
    }
}

fn compute_address(
    owner: &ModelDef,
    attr_name: &str,
    decl: &RelationDecl,
    nature: RelationNature,
    target: &ResolvedTarget,
    models: &HashMap<String, (Namespace, ModelDef)>,
) -> Result<JoinAddress, Error> {
    let address = match nature {
        RelationNature::OneWay | RelationNature::OneToOne | RelationNature::ManyToOne => {
            let target_model = concrete_target(models, target, owner, attr_name)?;
            JoinAddress::OwnerColumn {
                column: fk_column(&target_model.name, &target_model.primary_key),
            }
        }
        RelationNature::OneToMany => JoinAddress::TargetColumn {
            column: fk_column(&owner.name, &owner.primary_key),
        },
        RelationNature::ManyToMany => {
            let target_model = concrete_target(models, target, owner, attr_name)?;
            let reciprocal_dominant = decl
                .via
                .as_deref()
                .and_then(|via| target_model.get_attribute(via))
                .and_then(|a| a.as_relation())
                .map(|d| d.dominant)
                .unwrap_or(false);
            JoinAddress::Pivot {
                table: pivot_table_name(
                    PivotSide::new(&owner.collection_name, decl.dominant),
                    PivotSide::new(&target_model.collection_name, reciprocal_dominant),
                ),
                owner_column: fk_column(&owner.name, &owner.primary_key),
                target_column: fk_column(&target_model.name, &target_model.primary_key),
            }
        }
        RelationNature::ManyWay => {
            let target_model = concrete_target(models, target, owner, attr_name)?;
            JoinAddress::Pivot {
                table: many_way_table_name(&owner.collection_name, attr_name),
                owner_column: fk_column(&owner.name, &owner.primary_key),
                target_column: fk_column(&target_model.name, &target_model.primary_key),
            }
        }
        RelationNature::OneMorphToOne
        | RelationNature::OneMorphToMany
        | RelationNature::ManyMorphToOne
        | RelationNature::ManyMorphToMany => JoinAddress::Morph {
            table: morph_table_name(&owner.collection_name),
            field: attr_name.to_string(),
            owner_column: fk_column(&owner.name, &owner.primary_key),
        },
        RelationNature::OneToOneMorph
        | RelationNature::OneToManyMorph
        | RelationNature::ManyToOneMorph
        | RelationNature::ManyToManyMorph => {
            let target_model = concrete_target(models, target, owner, attr_name)?;
            let via = decl.via.clone().ok_or_else(|| {
                Error::Configuration(format!(
                    "relation {}.{}: morph relation requires `via`",
                    owner.name, attr_name
                ))
            })?;
            JoinAddress::MorphTarget {
                table: morph_table_name(&target_model.collection_name),
                field: via,
                owner_column: fk_column(&target_model.name, &target_model.primary_key),
            }
        }
    };

    Ok(address)
}
