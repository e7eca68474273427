//! Filter compilation against the model registry.

use std::collections::HashMap;

use tracing::debug;
use weft_proto::{
    FilterSpec, FilterValue, Operator, OrderDirection, PublicationState, Value, WhereClause,
};

use crate::error::Error;
use crate::registry::{
    component_table_name, fk_column, AttributeKind, JoinAddress, ModelDef, ModelRegistry,
    RelatedEntry, ResolvedTarget, COMPONENT_FIELD_COLUMN, COMPONENT_ID_COLUMN,
    COMPONENT_TYPE_COLUMN, MORPH_FIELD_COLUMN, MORPH_RELATED_ID_COLUMN,
    MORPH_RELATED_TYPE_COLUMN, PUBLISHED_AT_COLUMN,
};

use super::alias::AliasAllocator;
use super::program::{
    ColumnRef, CompareOp, Condition, Join, JoinKind, JoinOn, OrderBy, Predicate, QueryProgram,
};

/// Compile a filter against a model into a [`QueryProgram`].
///
/// Dot paths in conditions and sort entries traverse relations and
/// components; each traversed segment becomes a join (reused when several
/// paths share a prefix). A segment crossing the polymorphic side of a
/// morph relation fans out into one left-joined branch per possible target
/// collection, and the condition is OR-ed across the branches. The
/// publication gate is appended last: with [`PublicationState::Live`],
/// every draft-enabled model touched by the program must have a non-null
/// published-at column.
pub fn compile(
    registry: &ModelRegistry,
    model: &str,
    spec: &FilterSpec,
) -> Result<QueryProgram, Error> {
    let root = registry
        .get_model(model)
        .ok_or_else(|| Error::Validation(format!("unknown model `{model}`")))?;

    debug!(
        model,
        clauses = spec.conditions.len(),
        sorts = spec.sort.len(),
        "compiling filter"
    );

    let mut compiler = Compiler {
        registry,
        root,
        root_alias: root.collection_name.clone(),
        aliases: AliasAllocator::new(),
        joins: Vec::new(),
        join_cache: HashMap::new(),
        joined_models: vec![(
            root.collection_name.clone(),
            root.name.clone(),
            JoinKind::Inner,
        )],
    };

    let mut predicates = Vec::with_capacity(spec.conditions.len() + 1);
    for clause in &spec.conditions {
        predicates.push(compiler.compile_clause(clause)?);
    }

    let mut order_by = Vec::with_capacity(spec.sort.len());
    for sort in &spec.sort {
        let mut columns = compiler.resolve_columns(&sort.field, JoinKind::Left)?;
        if columns.len() != 1 {
            return Err(Error::Validation(format!(
                "cannot sort by `{}`: the path matches multiple target collections",
                sort.field
            )));
        }
        order_by.push(OrderBy {
            column: columns.remove(0),
            direction: sort.direction,
        });
    }
    if order_by.is_empty() {
        order_by.push(OrderBy {
            column: ColumnRef::new(&compiler.root_alias, &root.primary_key),
            direction: OrderDirection::Asc,
        });
    }

    // Publication gate over every draft-enabled model the program touches.
    // Left-joined tables may legitimately come up empty, so their gate
    // tolerates an unmatched row.
    if spec.publication_state == PublicationState::Live {
        for (alias, model_name, kind) in &compiler.joined_models {
            let Some(model) = registry.get_model(model_name) else {
                continue;
            };
            if !model.draft_and_publish {
                continue;
            }
            let gate = Predicate::NotNull(ColumnRef::new(alias, PUBLISHED_AT_COLUMN));
            predicates.push(match kind {
                JoinKind::Inner => gate,
                JoinKind::Left => Predicate::Or(vec![
                    Predicate::Compare(Condition {
                        column: ColumnRef::new(alias, &model.primary_key),
                        op: CompareOp::IsNull,
                    }),
                    gate,
                ]),
            });
        }
    }

    Ok(QueryProgram {
        root_table: root.collection_name.clone(),
        root_alias: compiler.root_alias,
        joins: compiler.joins,
        predicate: Predicate::all(predicates),
        order_by,
        start: spec.start,
        limit: spec.limit,
    })
}

struct Compiler<'a> {
    registry: &'a ModelRegistry,
    root: &'a ModelDef,
    root_alias: String,
    aliases: AliasAllocator,
    joins: Vec<Join>,
    // dot-path prefix -> landing (alias, model name) branches; polymorphic
    // segments land on several
    join_cache: HashMap<String, Vec<(String, String)>>,
    // model tables in the program with their join kind, root included
    joined_models: Vec<(String, String, JoinKind)>,
}

impl<'a> Compiler<'a> {
    fn compile_clause(&mut self, clause: &WhereClause) -> Result<Predicate, Error> {
        match clause {
            WhereClause::Or { or } => {
                let mut branches = Vec::with_capacity(or.len());
                for group in or {
                    let mut children = Vec::with_capacity(group.len());
                    for inner in group {
                        children.push(self.compile_clause(inner)?);
                    }
                    branches.push(Predicate::all(children));
                }
                match branches.len() {
                    0 => Ok(Predicate::True),
                    1 => Ok(branches.pop().unwrap_or(Predicate::True)),
                    _ => Ok(Predicate::Or(branches)),
                }
            }
            WhereClause::Condition {
                field,
                operator,
                value,
            } => {
                let columns = self.resolve_columns(field, JoinKind::Inner)?;
                let mut branches = Vec::with_capacity(columns.len());
                for column in columns {
                    branches.push(compile_condition(column, *operator, value)?);
                }
                match branches.len() {
                    1 => Ok(branches.pop().unwrap_or(Predicate::True)),
                    _ => Ok(Predicate::Or(branches)),
                }
            }
        }
    }

    /// Resolve a dot path to qualified columns, joining along the way.
    ///
    /// A path that stays on concrete relations yields one column; crossing
    /// a polymorphic segment yields one column per target collection.
    fn resolve_columns(&mut self, field: &str, kind: JoinKind) -> Result<Vec<ColumnRef>, Error> {
        let registry = self.registry;
        let segments: Vec<&str> = field.split('.').collect();
        let (prefix, last) = match segments.split_last() {
            Some((last, prefix)) if !last.is_empty() => (prefix, *last),
            _ => return Err(Error::Validation(format!("invalid field path `{field}`"))),
        };

        let landings = self.ensure_path(prefix, kind)?;
        let mut columns = Vec::with_capacity(landings.len());
        let mut relation_terminal = false;

        for (alias, model_name) in &landings {
            let model = registry
                .get_model(model_name)
                .ok_or_else(|| Error::Validation(format!("unknown model `{model_name}`")))?;

            if *last == model.primary_key {
                columns.push(ColumnRef::new(alias, last));
                continue;
            }

            let attribute = model.get_attribute(last).ok_or_else(|| {
                Error::Validation(format!("unknown field `{last}` on `{}`", model.name))
            })?;

            match &attribute.kind {
                AttributeKind::Scalar(_) => columns.push(ColumnRef::new(alias, last)),
                AttributeKind::Relation(_) => relation_terminal = true,
                AttributeKind::Component { .. } | AttributeKind::DynamicZone { .. } => {
                    return Err(Error::Validation(format!(
                        "field `{field}` ends on a component; compare one of its attributes"
                    )))
                }
            }
        }

        // A bare relation segment compares the linked row's primary key.
        if relation_terminal {
            if !columns.is_empty() {
                return Err(Error::Validation(format!(
                    "field `{field}` is a relation on some target collections and a column on others"
                )));
            }
            for (alias, target_name) in self.ensure_path(&segments, kind)? {
                let target = registry
                    .get_model(&target_name)
                    .ok_or_else(|| Error::Validation(format!("unknown model `{target_name}`")))?;
                columns.push(ColumnRef::new(&alias, &target.primary_key));
            }
        }

        Ok(columns)
    }

    /// Walk a path of relation/component segments, creating or reusing joins.
    fn ensure_path(
        &mut self,
        segments: &[&str],
        kind: JoinKind,
    ) -> Result<Vec<(String, String)>, Error> {
        let registry = self.registry;
        let mut branches = vec![(self.root_alias.clone(), self.root.name.clone())];
        let mut key = String::new();

        for segment in segments {
            if key.is_empty() {
                key.push_str(segment);
            } else {
                key.push('.');
                key.push_str(segment);
            }

            if let Some(cached) = self.join_cache.get(&key) {
                branches = cached.clone();
                continue;
            }

            let mut next = Vec::with_capacity(branches.len());
            for (alias, model_name) in &branches {
                let model = registry
                    .get_model(model_name)
                    .ok_or_else(|| Error::Validation(format!("unknown model `{model_name}`")))?;
                next.extend(self.join_segment(alias, model, segment, kind)?);
            }
            self.join_cache.insert(key.clone(), next.clone());
            branches = next;
        }

        Ok(branches)
    }

    /// Emit the join(s) for one path segment; returns the landing table(s).
    fn join_segment(
        &mut self,
        owner_alias: &str,
        owner: &ModelDef,
        segment: &str,
        kind: JoinKind,
    ) -> Result<Vec<(String, String)>, Error> {
        let registry = self.registry;
        let attribute = owner.get_attribute(segment).ok_or_else(|| {
            Error::Validation(format!("unknown field `{segment}` on `{}`", owner.name))
        })?;

        match &attribute.kind {
            AttributeKind::Relation(_) => {
                let relation = registry.relation(&owner.name, segment).ok_or_else(|| {
                    Error::Validation(format!(
                        "unresolved relation `{}.{segment}`",
                        owner.name
                    ))
                })?;
                let target_name = match (&relation.target, &relation.address) {
                    (
                        ResolvedTarget::Any(related),
                        JoinAddress::Morph {
                            table,
                            field,
                            owner_column,
                        },
                    ) => {
                        return self.join_morph_branches(
                            owner_alias,
                            owner,
                            table,
                            field,
                            owner_column,
                            related,
                            kind,
                        );
                    }
                    (ResolvedTarget::Model(name), _) => name.clone(),
                    (ResolvedTarget::Any(_), _) => {
                        return Err(Error::Configuration(format!(
                            "relation `{}.{segment}`: wildcard target without a morph table",
                            owner.name
                        )))
                    }
                };
                let target = registry
                    .get_model(&target_name)
                    .ok_or_else(|| Error::Validation(format!("unknown model `{target_name}`")))?;

                let target_alias = match &relation.address {
                    JoinAddress::OwnerColumn { column } => self.push_model_join(
                        kind,
                        target,
                        vec![JoinOn::Columns {
                            left: ColumnRef::new(owner_alias, column),
                            right: target.primary_key.clone(),
                        }],
                    ),
                    JoinAddress::TargetColumn { column } => self.push_model_join(
                        kind,
                        target,
                        vec![JoinOn::Columns {
                            left: ColumnRef::new(owner_alias, &owner.primary_key),
                            right: column.clone(),
                        }],
                    ),
                    JoinAddress::Pivot {
                        table,
                        owner_column,
                        target_column,
                    } => {
                        let pivot_alias = self.aliases.alloc(table);
                        self.joins.push(Join {
                            kind,
                            table: table.clone(),
                            alias: pivot_alias.clone(),
                            on: vec![JoinOn::Columns {
                                left: ColumnRef::new(owner_alias, &owner.primary_key),
                                right: owner_column.clone(),
                            }],
                        });
                        self.push_model_join(
                            kind,
                            target,
                            vec![JoinOn::Columns {
                                left: ColumnRef::new(&pivot_alias, target_column),
                                right: target.primary_key.clone(),
                            }],
                        )
                    }
                    JoinAddress::MorphTarget {
                        table,
                        field,
                        owner_column,
                    } => {
                        let morph_alias = self.aliases.alloc(table);
                        self.joins.push(Join {
                            kind,
                            table: table.clone(),
                            alias: morph_alias.clone(),
                            on: vec![
                                JoinOn::Columns {
                                    left: ColumnRef::new(owner_alias, &owner.primary_key),
                                    right: MORPH_RELATED_ID_COLUMN.to_string(),
                                },
                                JoinOn::Const {
                                    column: MORPH_RELATED_TYPE_COLUMN.to_string(),
                                    value: Value::from(owner.collection_name.as_str()),
                                },
                                JoinOn::Const {
                                    column: MORPH_FIELD_COLUMN.to_string(),
                                    value: Value::from(field.as_str()),
                                },
                            ],
                        });
                        self.push_model_join(
                            kind,
                            target,
                            vec![JoinOn::Columns {
                                left: ColumnRef::new(&morph_alias, owner_column),
                                right: target.primary_key.clone(),
                            }],
                        )
                    }
                    JoinAddress::Morph { .. } => {
                        // unreachable for a concrete target, kept as a guard
                        return Err(Error::Configuration(format!(
                            "relation `{}.{segment}`: concrete target with a morph address",
                            owner.name
                        )));
                    }
                };

                Ok(vec![(target_alias, target_name)])
            }
            AttributeKind::Component { component, .. } => {
                let schema = registry.get_component(component).ok_or_else(|| {
                    Error::Configuration(format!("unknown component type `{component}`"))
                })?;

                let join_table = component_table_name(&owner.collection_name);
                let join_alias = self.aliases.alloc(&join_table);
                self.joins.push(Join {
                    kind,
                    table: join_table,
                    alias: join_alias.clone(),
                    on: vec![
                        JoinOn::Columns {
                            left: ColumnRef::new(owner_alias, &owner.primary_key),
                            right: fk_column(&owner.name, &owner.primary_key),
                        },
                        JoinOn::Const {
                            column: COMPONENT_FIELD_COLUMN.to_string(),
                            value: Value::from(segment),
                        },
                        JoinOn::Const {
                            column: COMPONENT_TYPE_COLUMN.to_string(),
                            value: Value::from(component.as_str()),
                        },
                    ],
                });

                let alias = self.push_model_join(
                    kind,
                    schema,
                    vec![JoinOn::Columns {
                        left: ColumnRef::new(&join_alias, COMPONENT_ID_COLUMN),
                        right: schema.primary_key.clone(),
                    }],
                );
                Ok(vec![(alias, schema.name.clone())])
            }
            AttributeKind::DynamicZone { .. } => Err(Error::Validation(format!(
                "cannot traverse dynamic zone `{}.{segment}` in a filter path",
                owner.name
            ))),
            AttributeKind::Scalar(_) => Err(Error::Validation(format!(
                "field `{segment}` on `{}` is not a relation",
                owner.name
            ))),
        }
    }

    /// Fan a polymorphic segment out into one branch per target collection.
    ///
    /// The morph table is joined once, scoped to the attribute's field
    /// discriminator; each entry of the `related` list then left-joins its
    /// own collection table against `related_id`, guarded by a
    /// `related_type` filter so equal primary keys across collections never
    /// cross-match.
    #[allow(clippy::too_many_arguments)]
    fn join_morph_branches(
        &mut self,
        owner_alias: &str,
        owner: &ModelDef,
        table: &str,
        field: &str,
        owner_column: &str,
        related: &[RelatedEntry],
        kind: JoinKind,
    ) -> Result<Vec<(String, String)>, Error> {
        let registry = self.registry;
        let morph_alias = self.aliases.alloc(table);
        self.joins.push(Join {
            kind,
            table: table.to_string(),
            alias: morph_alias.clone(),
            on: vec![
                JoinOn::Columns {
                    left: ColumnRef::new(owner_alias, &owner.primary_key),
                    right: owner_column.to_string(),
                },
                JoinOn::Const {
                    column: MORPH_FIELD_COLUMN.to_string(),
                    value: Value::from(field),
                },
            ],
        });

        let mut branches = Vec::with_capacity(related.len());
        for entry in related {
            let target = registry
                .get_model(&entry.model)
                .ok_or_else(|| Error::Validation(format!("unknown model `{}`", entry.model)))?;
            let alias = self.push_model_join(
                // a morph row matches exactly one branch, so the others
                // must be allowed to come up empty
                JoinKind::Left,
                target,
                vec![
                    JoinOn::Columns {
                        left: ColumnRef::new(&morph_alias, MORPH_RELATED_ID_COLUMN),
                        right: target.primary_key.clone(),
                    },
                    JoinOn::Filter {
                        column: ColumnRef::new(&morph_alias, MORPH_RELATED_TYPE_COLUMN),
                        value: Value::from(entry.collection.as_str()),
                    },
                ],
            );
            branches.push((alias, entry.model.clone()));
        }

        Ok(branches)
    }

    /// Join a model's own table and record it for the publication gate.
    fn push_model_join(&mut self, kind: JoinKind, model: &ModelDef, on: Vec<JoinOn>) -> String {
        let alias = self.aliases.alloc(&model.collection_name);
        self.joins.push(Join {
            kind,
            table: model.collection_name.clone(),
            alias: alias.clone(),
            on,
        });
        self.joined_models
            .push((alias.clone(), model.name.clone(), kind));
        alias
    }
}

/// Lower one operator/value pair onto a resolved column.
fn compile_condition(
    column: ColumnRef,
    operator: Operator,
    value: &FilterValue,
) -> Result<Predicate, Error> {
    let leaf = |op: CompareOp| {
        Predicate::Compare(Condition {
            column: column.clone(),
            op,
        })
    };

    match operator {
        Operator::In => Ok(leaf(CompareOp::In(value.as_array()))),
        Operator::Nin => Ok(leaf(CompareOp::NotIn(value.as_array()))),
        Operator::Eq if value.is_array() => Ok(leaf(CompareOp::In(value.as_array()))),
        Operator::Null => match value {
            FilterValue::One(Value::Bool(true)) => Ok(leaf(CompareOp::IsNull)),
            FilterValue::One(Value::Bool(false)) => Ok(leaf(CompareOp::IsNotNull)),
            _ => Err(Error::Validation(
                "null operator expects a boolean value".to_string(),
            )),
        },
        // Array values under scalar operators expand into an OR.
        _ => {
            let values = value.as_array();
            if values.is_empty() {
                return Err(Error::Validation(format!(
                    "empty value for operator on `{}`",
                    column.column
                )));
            }
            let mut branches = Vec::with_capacity(values.len());
            for v in values {
                branches.push(leaf(scalar_op(operator, v, &column)?));
            }
            if branches.len() == 1 {
                Ok(branches.pop().unwrap_or(Predicate::True))
            } else {
                Ok(Predicate::Or(branches))
            }
        }
    }
}

fn scalar_op(operator: Operator, value: Value, column: &ColumnRef) -> Result<CompareOp, Error> {
    let needle = |value: &Value| {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                Error::Validation(format!(
                    "substring operator on `{}` expects a string",
                    column.column
                ))
            })
    };

    Ok(match operator {
        Operator::Eq => CompareOp::Eq(value),
        Operator::Ne => CompareOp::Ne(value),
        Operator::Lt => CompareOp::Lt(value),
        Operator::Lte => CompareOp::Lte(value),
        Operator::Gt => CompareOp::Gt(value),
        Operator::Gte => CompareOp::Gte(value),
        Operator::Contains => CompareOp::Contains {
            needle: needle(&value)?,
            case_sensitive: false,
        },
        Operator::Ncontains => CompareOp::NotContains {
            needle: needle(&value)?,
            case_sensitive: false,
        },
        Operator::Containss => CompareOp::Contains {
            needle: needle(&value)?,
            case_sensitive: true,
        },
        Operator::Ncontainss => CompareOp::NotContains {
            needle: needle(&value)?,
            case_sensitive: true,
        },
        Operator::In | Operator::Nin | Operator::Null => {
            return Err(Error::Validation(format!(
                "operator cannot be expanded on `{}`",
                column.column
            )))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{
        AttributeDef, ModelRegistry, RelationDecl, ScalarType,
    };
    use weft_proto::{PublicationState, SortSpec};

    fn registry() -> ModelRegistry {
        let article = ModelDef::new("article", "articles")
            .with_attribute(AttributeDef::scalar("title", ScalarType::String))
            .with_attribute(AttributeDef::relation(
                "category",
                RelationDecl::model("category").via("articles"),
            ))
            .with_attribute(AttributeDef::relation(
                "tags",
                RelationDecl::collection("tag").via("articles").dominant(),
            ))
            .with_attribute(AttributeDef::repeatable_component("blocks", "blocks.hero"))
            .with_attribute(AttributeDef::relation(
                "images",
                RelationDecl::collection("image").via("related"),
            ))
            .with_draft_and_publish();

        let category = ModelDef::new("category", "categories")
            .with_attribute(AttributeDef::scalar("name", ScalarType::String))
            .with_attribute(AttributeDef::relation(
                "articles",
                RelationDecl::collection("article").via("category"),
            ));

        let tag = ModelDef::new("tag", "tags")
            .with_attribute(AttributeDef::scalar("name", ScalarType::String))
            .with_attribute(AttributeDef::relation(
                "articles",
                RelationDecl::collection("article").via("tags"),
            ));

        let hero = ModelDef::new("blocks.hero", "components_blocks_heroes")
            .with_attribute(AttributeDef::scalar("headline", ScalarType::String));

        let image = ModelDef::new("image", "images").with_attribute(AttributeDef::relation(
            "related",
            RelationDecl::any_collection(),
        ));

        let video = ModelDef::new("video", "videos")
            .with_attribute(AttributeDef::scalar("title", ScalarType::String))
            .with_attribute(AttributeDef::relation(
                "images",
                RelationDecl::collection("image").via("related"),
            ));

        ModelRegistry::builder()
            .with_model(article)
            .with_model(category)
            .with_model(tag)
            .with_model(image)
            .with_model(video)
            .with_component(hero)
            .build()
            .unwrap()
    }

    fn preview(spec: FilterSpec) -> FilterSpec {
        spec.publication_state(PublicationState::Preview)
    }

    #[test]
    fn test_compile_simple_condition() {
        let registry = registry();
        let spec = preview(FilterSpec::new().where_clause(WhereClause::condition(
            "title",
            Operator::Eq,
            "hello",
        )));

        let program = compile(&registry, "article", &spec).unwrap();
        assert_eq!(program.root_table, "articles");
        assert!(program.joins.is_empty());
        assert_eq!(
            program.predicate,
            Predicate::Compare(Condition {
                column: ColumnRef::new("articles", "title"),
                op: CompareOp::Eq(Value::from("hello")),
            })
        );
        // stable default ordering on the primary key
        assert_eq!(
            program.order_by,
            vec![OrderBy {
                column: ColumnRef::new("articles", "id"),
                direction: OrderDirection::Asc,
            }]
        );
    }

    #[test]
    fn test_compile_deep_path_joins_once() {
        let registry = registry();
        let spec = preview(
            FilterSpec::new()
                .where_clause(WhereClause::condition(
                    "category.name",
                    Operator::Eq,
                    "news",
                ))
                .where_clause(WhereClause::condition("category.id", Operator::Gt, 10i64)),
        );

        let program = compile(&registry, "article", &spec).unwrap();
        assert_eq!(program.joins.len(), 1);
        assert_eq!(
            program.joins[0],
            Join {
                kind: JoinKind::Inner,
                table: "categories".to_string(),
                alias: "categories_1".to_string(),
                on: vec![JoinOn::Columns {
                    left: ColumnRef::new("articles", "category_id"),
                    right: "id".to_string(),
                }],
            }
        );
    }

    #[test]
    fn test_compile_pivot_path() {
        let registry = registry();
        let spec = preview(FilterSpec::new().where_clause(WhereClause::condition(
            "tags.name",
            Operator::Containss,
            "rust",
        )));

        let program = compile(&registry, "article", &spec).unwrap();
        assert_eq!(program.joins.len(), 2);
        assert_eq!(program.joins[0].table, "tags__articles");
        assert_eq!(
            program.joins[0].on,
            vec![JoinOn::Columns {
                left: ColumnRef::new("articles", "id"),
                right: "article_id".to_string(),
            }]
        );
        assert_eq!(program.joins[1].table, "tags");
        assert_eq!(
            program.joins[1].on,
            vec![JoinOn::Columns {
                left: ColumnRef::new("tags__articles_1", "tag_id"),
                right: "id".to_string(),
            }]
        );
        assert_eq!(
            program.predicate,
            Predicate::Compare(Condition {
                column: ColumnRef::new("tags_1", "name"),
                op: CompareOp::Contains {
                    needle: "rust".to_string(),
                    case_sensitive: true,
                },
            })
        );
    }

    #[test]
    fn test_compile_component_path() {
        let registry = registry();
        let spec = preview(FilterSpec::new().where_clause(WhereClause::condition(
            "blocks.headline",
            Operator::Contains,
            "launch",
        )));

        let program = compile(&registry, "article", &spec).unwrap();
        assert_eq!(program.joins.len(), 2);
        assert_eq!(program.joins[0].table, "articles_components");
        assert!(program.joins[0].on.contains(&JoinOn::Const {
            column: COMPONENT_FIELD_COLUMN.to_string(),
            value: Value::from("blocks"),
        }));
        assert_eq!(program.joins[1].table, "components_blocks_heroes");
    }

    #[test]
    fn test_publication_gate_live_only() {
        let registry = registry();

        let live = compile(&registry, "article", &FilterSpec::new()).unwrap();
        assert_eq!(
            live.predicate,
            Predicate::NotNull(ColumnRef::new("articles", "published_at"))
        );

        let preview = compile(
            &registry,
            "article",
            &FilterSpec::new().publication_state(PublicationState::Preview),
        )
        .unwrap();
        assert_eq!(preview.predicate, Predicate::True);
    }

    #[test]
    fn test_or_composition() {
        let registry = registry();
        let spec = preview(FilterSpec::new().where_clause(WhereClause::any_of(vec![
            vec![WhereClause::condition("title", Operator::Eq, "a")],
            vec![
                WhereClause::condition("title", Operator::Eq, "b"),
                WhereClause::condition("title", Operator::Null, false),
            ],
        ])));

        let program = compile(&registry, "article", &spec).unwrap();
        match program.predicate {
            Predicate::Or(branches) => {
                assert_eq!(branches.len(), 2);
                assert!(matches!(branches[1], Predicate::And(_)));
            }
            other => panic!("unexpected predicate: {other:?}"),
        }
    }

    #[test]
    fn test_array_value_expansion() {
        let registry = registry();

        let spec = preview(FilterSpec::new().where_clause(WhereClause::condition(
            "title",
            Operator::Contains,
            FilterValue::Many(vec![Value::from("a"), Value::from("b")]),
        )));
        let program = compile(&registry, "article", &spec).unwrap();
        assert!(matches!(program.predicate, Predicate::Or(ref b) if b.len() == 2));

        // eq with an array collapses to a membership test
        let spec = preview(FilterSpec::new().where_clause(WhereClause::condition(
            "title",
            Operator::Eq,
            FilterValue::Many(vec![Value::from("a"), Value::from("b")]),
        )));
        let program = compile(&registry, "article", &spec).unwrap();
        assert_eq!(
            program.predicate,
            Predicate::Compare(Condition {
                column: ColumnRef::new("articles", "title"),
                op: CompareOp::In(vec![Value::from("a"), Value::from("b")]),
            })
        );
    }

    #[test]
    fn test_sort_path_and_pagination() {
        let registry = registry();
        let spec = preview(
            FilterSpec::new()
                .sort_by(SortSpec::desc("category.name"))
                .paginate(20, 10),
        );

        let program = compile(&registry, "article", &spec).unwrap();
        assert_eq!(program.joins.len(), 1);
        assert_eq!(program.joins[0].kind, JoinKind::Left);
        assert_eq!(
            program.order_by,
            vec![OrderBy {
                column: ColumnRef::new("categories_1", "name"),
                direction: OrderDirection::Desc,
            }]
        );
        assert_eq!(program.start, Some(20));
        assert_eq!(program.limit, Some(10));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let registry = registry();
        let spec = preview(FilterSpec::new().where_clause(WhereClause::condition(
            "nonexistent",
            Operator::Eq,
            1i64,
        )));

        let err = compile(&registry, "article", &spec).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_null_operator_requires_bool() {
        let registry = registry();
        let spec = preview(FilterSpec::new().where_clause(WhereClause::condition(
            "title",
            Operator::Null,
            "yes",
        )));

        let err = compile(&registry, "article", &spec).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_polymorphic_path_fans_out_per_collection() {
        let registry = registry();
        let spec = preview(FilterSpec::new().where_clause(WhereClause::condition(
            "related.id",
            Operator::Eq,
            1i64,
        )));

        let program = compile(&registry, "image", &spec).unwrap();

        // one morph join, then one left-joined branch per target collection
        assert_eq!(program.joins.len(), 3);
        assert_eq!(program.joins[0].table, "images_morph");
        assert_eq!(program.joins[0].kind, JoinKind::Inner);
        assert_eq!(
            program.joins[0].on,
            vec![
                JoinOn::Columns {
                    left: ColumnRef::new("images", "id"),
                    right: "image_id".to_string(),
                },
                JoinOn::Const {
                    column: MORPH_FIELD_COLUMN.to_string(),
                    value: Value::from("related"),
                },
            ]
        );

        assert_eq!(program.joins[1].table, "articles");
        assert_eq!(program.joins[1].kind, JoinKind::Left);
        assert_eq!(
            program.joins[1].on,
            vec![
                JoinOn::Columns {
                    left: ColumnRef::new("images_morph_1", "related_id"),
                    right: "id".to_string(),
                },
                JoinOn::Filter {
                    column: ColumnRef::new("images_morph_1", "related_type"),
                    value: Value::from("articles"),
                },
            ]
        );
        assert_eq!(program.joins[2].table, "videos");
        assert_eq!(program.joins[2].kind, JoinKind::Left);

        // the condition holds on whichever branch matched
        assert_eq!(
            program.predicate,
            Predicate::Or(vec![
                Predicate::Compare(Condition {
                    column: ColumnRef::new("articles_1", "id"),
                    op: CompareOp::Eq(Value::from(1i64)),
                }),
                Predicate::Compare(Condition {
                    column: ColumnRef::new("videos_1", "id"),
                    op: CompareOp::Eq(Value::from(1i64)),
                }),
            ])
        );
    }

    #[test]
    fn test_polymorphic_branch_gate_tolerates_unmatched_branch() {
        let registry = registry();
        // article is draft-enabled, video is not; under the live state the
        // article branch gate must not erase rows linked to videos
        let spec = FilterSpec::new().where_clause(WhereClause::condition(
            "related.id",
            Operator::Eq,
            1i64,
        ));

        let program = compile(&registry, "image", &spec).unwrap();
        let gate = Predicate::Or(vec![
            Predicate::Compare(Condition {
                column: ColumnRef::new("articles_1", "id"),
                op: CompareOp::IsNull,
            }),
            Predicate::NotNull(ColumnRef::new("articles_1", "published_at")),
        ]);
        match &program.predicate {
            Predicate::And(children) => assert!(children.contains(&gate)),
            other => panic!("unexpected predicate: {other:?}"),
        }
    }

    #[test]
    fn test_sort_through_polymorphic_is_rejected() {
        let registry = registry();
        let spec = preview(FilterSpec::new().sort_by(SortSpec::asc("related.id")));

        let err = compile(&registry, "image", &spec).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_bare_relation_segment_compares_pk() {
        let registry = registry();
        let spec = preview(FilterSpec::new().where_clause(WhereClause::condition(
            "category",
            Operator::Eq,
            7i64,
        )));

        let program = compile(&registry, "article", &spec).unwrap();
        assert_eq!(
            program.predicate,
            Predicate::Compare(Condition {
                column: ColumnRef::new("categories_1", "id"),
                op: CompareOp::Eq(Value::from(7i64)),
            })
        );
    }
}
