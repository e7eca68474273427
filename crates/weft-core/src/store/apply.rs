//! Applying computed diffs and cascade plans to the join store.
//!
//! The store is directional: each relation side owns the keyspace under its
//! own `(table, owner, field)` triple. Reconciling the reciprocal side is
//! the caller's job, through its own operation set.

use std::collections::HashMap;

use tracing::{debug, trace};
use weft_proto::{ClientCorrelationId, Ref};

use crate::cascade::{CascadePlan, ComponentDelete};
use crate::error::Error;
use crate::registry::{component_table_name, JoinAddress, ModelRegistry, ResolvedRelation, ResolvedTarget};
use crate::relation::RelationDiff;

use super::engine::JoinStore;
use super::row::LinkRow;
use super::transaction::JoinTransaction;

/// Where one relation attribute's link rows live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkAddress {
    /// Logical join table.
    pub table: String,
    /// Field segment in the link key.
    pub field: String,
    /// Collection discriminator recorded on rows. `None` for a polymorphic
    /// field, whose references carry the collection themselves.
    pub target_type: Option<String>,
}

/// Compute the link address for one relation attribute.
///
/// Foreign-key natures keep their link in an entity column rather than the
/// join store; those return `None`.
pub fn link_address(
    registry: &ModelRegistry,
    relation: &ResolvedRelation,
    attribute: &str,
) -> Option<LinkAddress> {
    let table = match &relation.address {
        JoinAddress::Pivot { table, .. }
        | JoinAddress::Morph { table, .. }
        | JoinAddress::MorphTarget { table, .. } => table.clone(),
        JoinAddress::OwnerColumn { .. } | JoinAddress::TargetColumn { .. } => return None,
    };

    let target_type = match &relation.target {
        ResolvedTarget::Model(name) => registry.get_model(name).map(|m| m.collection_name.clone()),
        ResolvedTarget::Any(_) => None,
    };

    Some(LinkAddress {
        table,
        field: attribute.to_string(),
        target_type,
    })
}

/// Queue the mutations for one reconciled relation field.
///
/// Unlinked targets lose their rows; every row in `to_link` is written at
/// its new order value, with the target's stale row (if it moved) removed
/// first. Every stored row carries a `{target, type}` pair: concrete
/// fields stamp the resolved collection, polymorphic fields take it from
/// the reference and reject references without one.
pub fn apply_relation_diff(
    tx: &mut JoinTransaction<'_>,
    address: &LinkAddress,
    owner: &Ref,
    diff: &RelationDiff,
) -> Result<(), Error> {
    for target in &diff.to_unlink {
        tx.delete_link_by_target(&address.table, owner, &address.field, target)?;
    }
    for op in &diff.to_link {
        tx.delete_link_by_target(&address.table, owner, &address.field, &op.reference)?;
        let row = link_row(address, &op.reference)?;
        tx.insert_link(&address.table, owner, &address.field, op.order, row);
    }
    Ok(())
}

fn link_row(address: &LinkAddress, reference: &Ref) -> Result<LinkRow, Error> {
    match (&address.target_type, reference) {
        (Some(target_type), _) => Ok(LinkRow::typed(reference.clone(), target_type.clone())),
        (None, Ref::Typed { kind, .. }) => Ok(LinkRow::typed(reference.clone(), kind.clone())),
        (None, _) => Err(Error::Validation(format!(
            "field `{}` targets multiple collections; reference `{reference}` must carry a type",
            address.field
        ))),
    }
}

/// Queue removal of every join store row a model row owns: all of its link
/// tables plus its component join table.
pub fn delete_owner_links(
    tx: &mut JoinTransaction<'_>,
    registry: &ModelRegistry,
    model: &str,
    owner: &Ref,
) -> Result<(), Error> {
    for table in registry.link_tables(model) {
        tx.clear_owner(&table, owner)?;
    }
    if let Some(def) = registry.get_model(model) {
        tx.clear_owner(&component_table_name(&def.collection_name), owner)?;
    }
    Ok(())
}

/// Queue the mutations for one component cascade plan.
///
/// New rows get store-assigned ids; the returned pairs map each creation's
/// correlation token to its id so the caller can answer the client. The
/// field's ordering rows are rewritten with correlation tokens translated
/// to the assigned ids.
pub fn apply_cascade_plan(
    store: &JoinStore,
    tx: &mut JoinTransaction<'_>,
    registry: &ModelRegistry,
    owner_model: &str,
    owner: &Ref,
    plan: &CascadePlan,
) -> Result<Vec<(ClientCorrelationId, i64)>, Error> {
    let model = registry
        .get_model(owner_model)
        .ok_or_else(|| Error::Validation(format!("unknown model `{owner_model}`")))?;
    let table = component_table_name(&model.collection_name);

    let mut assigned = Vec::new();
    // this level's correlation -> id and entry ref -> component type
    let mut local_ids: HashMap<String, i64> = HashMap::new();
    let mut entry_types: HashMap<Ref, String> = HashMap::new();

    for create in &plan.creates {
        let id = store.generate_id()?;
        tx.put_component_row(&create.component_type, id);
        local_ids.insert(create.correlation.0.clone(), id);
        entry_types.insert(Ref::Id(id), create.component_type.clone());
        assigned.push((create.correlation.clone(), id));

        let row_ref = Ref::Id(id);
        apply_component_relations(tx, registry, &create.component_type, &row_ref, &create.relations)?;
        for nested in &create.nested {
            assigned.extend(apply_cascade_plan(
                store,
                tx,
                registry,
                &create.component_type,
                &row_ref,
                nested,
            )?);
        }
    }

    for update in &plan.updates {
        entry_types.insert(Ref::Id(update.id), update.component_type.clone());
        let row_ref = Ref::Id(update.id);
        apply_component_relations(tx, registry, &update.component_type, &row_ref, &update.relations)?;
        for nested in &update.nested {
            assigned.extend(apply_cascade_plan(
                store,
                tx,
                registry,
                &update.component_type,
                &row_ref,
                nested,
            )?);
        }
    }

    for delete in &plan.deletes {
        delete_component_rows(tx, registry, delete)?;
    }

    // Rewrite the field ordering, translating correlation tokens to ids.
    let translate = |reference: &Ref| -> Ref {
        match reference {
            Ref::Key(token) => local_ids
                .get(token)
                .map(|id| Ref::Id(*id))
                .unwrap_or_else(|| reference.clone()),
            Ref::Id(_) | Ref::Typed { .. } => reference.clone(),
        }
    };
    for target in &plan.ordering.to_unlink {
        tx.delete_link_by_target(&table, owner, &plan.field, target)?;
    }
    for op in &plan.ordering.to_link {
        let target = translate(&op.reference);
        tx.delete_link_by_target(&table, owner, &plan.field, &target)?;
        let row = match entry_types.get(&target) {
            Some(component_type) => LinkRow::typed(target, component_type.clone()),
            None => LinkRow::new(target),
        };
        tx.insert_link(&table, owner, &plan.field, op.order, row);
    }

    debug!(
        field = %plan.field,
        created = plan.creates.len(),
        deleted = plan.deletes.len(),
        "applied component cascade"
    );

    Ok(assigned)
}

fn apply_component_relations(
    tx: &mut JoinTransaction<'_>,
    registry: &ModelRegistry,
    component_type: &str,
    owner: &Ref,
    relations: &[(String, RelationDiff)],
) -> Result<(), Error> {
    for (field, diff) in relations {
        let relation = registry.relation(component_type, field).ok_or_else(|| {
            Error::Validation(format!(
                "unresolved relation `{component_type}.{field}`"
            ))
        })?;
        match link_address(registry, relation, field) {
            Some(address) => apply_relation_diff(tx, &address, owner, diff)?,
            // foreign-key natures are column writes, outside the join store
            None => trace!(component_type, field, "skipping column-backed relation"),
        }
    }
    Ok(())
}

/// Delete a component row, its link rows, and everything nested under it.
fn delete_component_rows(
    tx: &mut JoinTransaction<'_>,
    registry: &ModelRegistry,
    delete: &ComponentDelete,
) -> Result<(), Error> {
    tx.delete_component_row(&delete.component_type, delete.id);
    delete_owner_links(tx, registry, &delete.component_type, &Ref::Id(delete.id))?;
    for nested in &delete.nested {
        delete_component_rows(tx, registry, nested)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::{plan_field, ExistingComponent};
    use crate::registry::{AttributeDef, ModelDef, RelationDecl, ScalarType};
    use crate::relation::reconcile;
    use weft_proto::{ComponentEntry, Position, RelationOperationSet};

    fn registry() -> ModelRegistry {
        let article = ModelDef::new("article", "articles")
            .with_attribute(AttributeDef::relation(
                "tags",
                RelationDecl::collection("tag").via("articles").dominant(),
            ))
            .with_attribute(AttributeDef::repeatable_component("blocks", "blocks.hero"));

        let tag = ModelDef::new("tag", "tags").with_attribute(AttributeDef::relation(
            "articles",
            RelationDecl::collection("article").via("tags"),
        ));

        let hero = ModelDef::new("blocks.hero", "components_blocks_heroes")
            .with_attribute(AttributeDef::scalar("headline", ScalarType::String))
            .with_attribute(AttributeDef::relation(
                "mentions",
                RelationDecl::collection("tag"),
            ));

        ModelRegistry::builder()
            .with_model(article)
            .with_model(tag)
            .with_component(hero)
            .build()
            .unwrap()
    }

    fn tags_address(registry: &ModelRegistry) -> LinkAddress {
        let relation = registry.relation("article", "tags").unwrap();
        link_address(registry, relation, "tags").unwrap()
    }

    fn media_registry() -> ModelRegistry {
        let image = ModelDef::new("image", "images").with_attribute(AttributeDef::relation(
            "related",
            RelationDecl::any_collection(),
        ));

        let article = ModelDef::new("article", "articles").with_attribute(
            AttributeDef::relation("images", RelationDecl::collection("image").via("related")),
        );

        let video = ModelDef::new("video", "videos").with_attribute(AttributeDef::relation(
            "images",
            RelationDecl::collection("image").via("related"),
        ));

        ModelRegistry::builder()
            .with_model(image)
            .with_model(article)
            .with_model(video)
            .build()
            .unwrap()
    }

    fn related_address(registry: &ModelRegistry) -> LinkAddress {
        let relation = registry.relation("image", "related").unwrap();
        link_address(registry, relation, "related").unwrap()
    }

    #[test]
    fn test_diff_round_trip_through_store() {
        let registry = registry();
        let store = JoinStore::temporary().unwrap();
        let address = tags_address(&registry);
        let owner = Ref::Id(1);

        // seed [p1, p2]
        let seed = reconcile(&[], &RelationOperationSet::replace_with([10i64, 20])).unwrap();
        let mut tx = store.begin();
        apply_relation_diff(&mut tx, &address, &owner, &seed).unwrap();
        tx.commit().unwrap();

        let current = store.refs_for(&address.table, &owner, &address.field).unwrap();
        assert_eq!(current, vec![Ref::Id(10), Ref::Id(20)]);

        // move the first row to the end
        let ops = RelationOperationSet::new().connect_at(10i64, Position::End);
        let diff = reconcile(&current, &ops).unwrap();
        let mut tx = store.begin();
        apply_relation_diff(&mut tx, &address, &owner, &diff).unwrap();
        tx.commit().unwrap();

        let current = store.refs_for(&address.table, &owner, &address.field).unwrap();
        assert_eq!(current, vec![Ref::Id(20), Ref::Id(10)]);
        // no stale rows left behind
        assert_eq!(store.count_links(&address.table, &owner, &address.field).unwrap(), 2);
    }

    #[test]
    fn test_rows_carry_target_collection() {
        let registry = registry();
        let store = JoinStore::temporary().unwrap();
        let address = tags_address(&registry);
        let owner = Ref::Id(1);

        let diff = reconcile(&[], &RelationOperationSet::new().connect(5i64)).unwrap();
        let mut tx = store.begin();
        apply_relation_diff(&mut tx, &address, &owner, &diff).unwrap();
        tx.commit().unwrap();

        let rows = store.links_for(&address.table, &owner, &address.field).unwrap();
        assert_eq!(rows[0].1.target_type.as_deref(), Some("tags"));
    }

    #[test]
    fn test_morph_rows_keep_equal_ids_apart() {
        let registry = media_registry();
        let store = JoinStore::temporary().unwrap();
        let address = related_address(&registry);
        let owner = Ref::Id(1);

        assert_eq!(address.table, "images_morph");
        assert_eq!(address.target_type, None);

        // the same primary key in two collections links as two rows
        let ops = RelationOperationSet::new()
            .connect(Ref::typed(5, "articles"))
            .connect(Ref::typed(5, "videos"));
        let diff = reconcile(&[], &ops).unwrap();
        let mut tx = store.begin();
        apply_relation_diff(&mut tx, &address, &owner, &diff).unwrap();
        tx.commit().unwrap();

        let rows = store.links_for(&address.table, &owner, &address.field).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].1.target_type.as_deref(), Some("articles"));
        assert_eq!(rows[1].1.target_type.as_deref(), Some("videos"));

        // unlinking names the collection, so only that row goes
        let current = store.refs_for(&address.table, &owner, &address.field).unwrap();
        let ops = RelationOperationSet::new().disconnect(Ref::typed(5, "articles"));
        let diff = reconcile(&current, &ops).unwrap();
        let mut tx = store.begin();
        apply_relation_diff(&mut tx, &address, &owner, &diff).unwrap();
        tx.commit().unwrap();

        assert_eq!(
            store.refs_for(&address.table, &owner, &address.field).unwrap(),
            vec![Ref::typed(5, "videos")]
        );
    }

    #[test]
    fn test_morph_link_requires_a_typed_reference() {
        let registry = media_registry();
        let store = JoinStore::temporary().unwrap();
        let address = related_address(&registry);
        let owner = Ref::Id(1);

        let diff = reconcile(&[], &RelationOperationSet::new().connect(5i64)).unwrap();
        let mut tx = store.begin();
        let err = apply_relation_diff(&mut tx, &address, &owner, &diff).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_cascade_create_then_delete_leaves_nothing() {
        let registry = registry();
        let store = JoinStore::temporary().unwrap();
        let owner = Ref::Id(1);

        // create two component rows, the first with relation links
        let incoming = vec![
            ComponentEntry::new("blocks.hero")
                .with_correlation("tmp-a")
                .with_relation("mentions", RelationOperationSet::new().connect(7i64)),
            ComponentEntry::new("blocks.hero").with_correlation("tmp-b"),
        ];
        let plan = plan_field(&registry, "article", "blocks", &[], &incoming).unwrap();

        let mut tx = store.begin();
        let assigned = apply_cascade_plan(&store, &mut tx, &registry, "article", &owner, &plan).unwrap();
        tx.commit().unwrap();

        assert_eq!(assigned.len(), 2);
        let id_a = assigned[0].1;
        let id_b = assigned[1].1;
        assert!(store.component_exists("blocks.hero", id_a).unwrap());

        // ordering rows point at the assigned ids, in payload order
        let ordering = store.refs_for("articles_components", &owner, "blocks").unwrap();
        assert_eq!(ordering, vec![Ref::Id(id_a), Ref::Id(id_b)]);

        // the first row's own relation links landed under the component
        let mentions_table = "components_blocks_heroes__mentions";
        assert_eq!(
            store.refs_for(mentions_table, &Ref::Id(id_a), "mentions").unwrap(),
            vec![Ref::Id(7)]
        );

        // now drop the first row
        let existing = vec![
            ExistingComponent::new(id_a, "blocks.hero")
                .with_relation("mentions", vec![Ref::Id(7)]),
            ExistingComponent::new(id_b, "blocks.hero"),
        ];
        let keep = vec![ComponentEntry::existing(id_b, "blocks.hero")];
        let plan = plan_field(&registry, "article", "blocks", &existing, &keep).unwrap();

        let mut tx = store.begin();
        apply_cascade_plan(&store, &mut tx, &registry, "article", &owner, &plan).unwrap();
        tx.commit().unwrap();

        // marker, relation links, and ordering row of the deleted component
        // are all gone
        assert!(!store.component_exists("blocks.hero", id_a).unwrap());
        assert!(store
            .refs_for(mentions_table, &Ref::Id(id_a), "mentions")
            .unwrap()
            .is_empty());
        let ordering = store.refs_for("articles_components", &owner, "blocks").unwrap();
        assert_eq!(ordering, vec![Ref::Id(id_b)]);
    }

    #[test]
    fn test_delete_owner_links_clears_everything() {
        let registry = registry();
        let store = JoinStore::temporary().unwrap();
        let owner = Ref::Id(1);
        let address = tags_address(&registry);

        let diff = reconcile(&[], &RelationOperationSet::replace_with([1i64, 2])).unwrap();
        let mut tx = store.begin();
        apply_relation_diff(&mut tx, &address, &owner, &diff).unwrap();
        tx.insert_link("articles_components", &owner, "blocks", 1, LinkRow::new(9i64));
        tx.commit().unwrap();

        let mut tx = store.begin();
        delete_owner_links(&mut tx, &registry, "article", &owner).unwrap();
        tx.commit().unwrap();

        assert!(store.refs_for(&address.table, &owner, &address.field).unwrap().is_empty());
        assert!(store.refs_for("articles_components", &owner, "blocks").unwrap().is_empty());
    }
}
