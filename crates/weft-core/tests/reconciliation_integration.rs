//! Integration tests for relation reconciliation through the join store.

use weft_core::cascade::{plan_field, ExistingComponent};
use weft_core::registry::{AttributeDef, ModelDef, ModelRegistry, RelationDecl};
use weft_core::relation::reconcile;
use weft_core::store::{
    apply_cascade_plan, apply_relation_diff, link_address, JoinStore, JoinStoreConfig, LinkAddress,
};
use weft_proto::{ComponentEntry, Ref, RelationOperationSet};

struct TestContext {
    store: JoinStore,
    registry: ModelRegistry,
    _store_dir: tempfile::TempDir,
}

impl TestContext {
    fn new() -> Self {
        let store_dir = tempfile::tempdir().unwrap();
        let store = JoinStore::open(JoinStoreConfig {
            path: store_dir.path().to_path_buf(),
            temporary: false,
            ..Default::default()
        })
        .unwrap();

        Self {
            store,
            registry: blog_registry(),
            _store_dir: store_dir,
        }
    }

    fn tags_address(&self) -> LinkAddress {
        let relation = self.registry.relation("article", "tags").unwrap();
        link_address(&self.registry, relation, "tags").unwrap()
    }

    fn current_tags(&self, owner: &Ref) -> Vec<Ref> {
        let address = self.tags_address();
        self.store
            .refs_for(&address.table, owner, &address.field)
            .unwrap()
    }

    fn apply_tags(&self, owner: &Ref, ops: &RelationOperationSet) -> Result<(), weft_core::Error> {
        let address = self.tags_address();
        let current = self.current_tags(owner);
        let diff = reconcile(&current, ops)?;
        let mut tx = self.store.begin();
        apply_relation_diff(&mut tx, &address, owner, &diff)?;
        tx.commit()
    }
}

fn blog_registry() -> ModelRegistry {
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

    let hero = ModelDef::new("blocks.hero", "components_blocks_heroes").with_attribute(
        AttributeDef::relation("mentions", RelationDecl::collection("tag")),
    );

    ModelRegistry::builder()
        .with_model(article)
        .with_model(tag)
        .with_component(hero)
        .build()
        .unwrap()
}

#[test]
fn test_reorder_via_json_payload() {
    let ctx = TestContext::new();
    let owner = Ref::Id(1);

    // seed [10, 20]
    ctx.apply_tags(&owner, &RelationOperationSet::replace_with([10i64, 20]))
        .unwrap();
    assert_eq!(ctx.current_tags(&owner), vec![Ref::Id(10), Ref::Id(20)]);

    // the documented reorder body: move 10 to the end
    let ops: RelationOperationSet =
        serde_json::from_str(r#"{"connect": [{"id": 10, "position": {"end": true}}]}"#).unwrap();
    ctx.apply_tags(&owner, &ops).unwrap();

    assert_eq!(ctx.current_tags(&owner), vec![Ref::Id(20), Ref::Id(10)]);

    // and back to the front
    let ops: RelationOperationSet =
        serde_json::from_str(r#"{"connect": [{"id": 10, "position": {"before": 20}}]}"#).unwrap();
    ctx.apply_tags(&owner, &ops).unwrap();

    assert_eq!(ctx.current_tags(&owner), vec![Ref::Id(10), Ref::Id(20)]);
}

#[test]
fn test_strict_failure_leaves_store_untouched() {
    let ctx = TestContext::new();
    let owner = Ref::Id(1);

    ctx.apply_tags(&owner, &RelationOperationSet::replace_with([10i64]))
        .unwrap();

    // strict disconnect of an unlinked ref fails before anything is queued
    let ops: RelationOperationSet =
        serde_json::from_str(r#"{"connect": [{"id": 30}], "disconnect": [{"id": 99}]}"#).unwrap();
    assert!(ctx.apply_tags(&owner, &ops).is_err());

    assert_eq!(ctx.current_tags(&owner), vec![Ref::Id(10)]);
}

#[test]
fn test_relation_and_cascade_commit_together() {
    let ctx = TestContext::new();
    let owner = Ref::Id(1);
    let address = ctx.tags_address();

    // one transaction carries the relation diff and the component cascade
    let relation_diff =
        reconcile(&[], &RelationOperationSet::replace_with([5i64, 6])).unwrap();
    let incoming = vec![ComponentEntry::new("blocks.hero")
        .with_correlation("tmp-1")
        .with_relation("mentions", RelationOperationSet::new().connect(5i64))];
    let plan = plan_field(&ctx.registry, "article", "blocks", &[], &incoming).unwrap();

    let mut tx = ctx.store.begin();
    apply_relation_diff(&mut tx, &address, &owner, &relation_diff).unwrap();
    let assigned =
        apply_cascade_plan(&ctx.store, &mut tx, &ctx.registry, "article", &owner, &plan).unwrap();
    tx.commit().unwrap();

    let hero_id = assigned[0].1;
    assert_eq!(ctx.current_tags(&owner), vec![Ref::Id(5), Ref::Id(6)]);
    assert!(ctx.store.component_exists("blocks.hero", hero_id).unwrap());
    assert_eq!(
        ctx.store
            .refs_for("articles_components", &owner, "blocks")
            .unwrap(),
        vec![Ref::Id(hero_id)]
    );
    assert_eq!(
        ctx.store
            .refs_for(
                "components_blocks_heroes__mentions",
                &Ref::Id(hero_id),
                "mentions"
            )
            .unwrap(),
        vec![Ref::Id(5)]
    );
}

#[test]
fn test_cascade_replacement_cleans_up_previous_rows() {
    let ctx = TestContext::new();
    let owner = Ref::Id(1);

    let incoming = vec![
        ComponentEntry::new("blocks.hero").with_correlation("a"),
        ComponentEntry::new("blocks.hero").with_correlation("b"),
    ];
    let plan = plan_field(&ctx.registry, "article", "blocks", &[], &incoming).unwrap();
    let mut tx = ctx.store.begin();
    let assigned =
        apply_cascade_plan(&ctx.store, &mut tx, &ctx.registry, "article", &owner, &plan).unwrap();
    tx.commit().unwrap();

    let (id_a, id_b) = (assigned[0].1, assigned[1].1);

    // keep only the second row, reversed to first place by the payload order
    let existing = vec![
        ExistingComponent::new(id_a, "blocks.hero"),
        ExistingComponent::new(id_b, "blocks.hero"),
    ];
    let keep = vec![ComponentEntry::existing(id_b, "blocks.hero")];
    let plan = plan_field(&ctx.registry, "article", "blocks", &existing, &keep).unwrap();
    let mut tx = ctx.store.begin();
    apply_cascade_plan(&ctx.store, &mut tx, &ctx.registry, "article", &owner, &plan).unwrap();
    tx.commit().unwrap();

    assert!(!ctx.store.component_exists("blocks.hero", id_a).unwrap());
    assert!(ctx.store.component_exists("blocks.hero", id_b).unwrap());
    assert_eq!(
        ctx.store
            .refs_for("articles_components", &owner, "blocks")
            .unwrap(),
        vec![Ref::Id(id_b)]
    );
}
