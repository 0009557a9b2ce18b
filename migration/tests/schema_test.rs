mod common;

use common::{fresh_store, node, rel, FaultyWriter};
use graphport_core::config::MigrationOptions;
use graphport_core::metrics::MigrationCounters;
use graphport_core::model::{
    ClassKind, ConstraintKind, DestType, IndexKind, SchemaScope, SourceConstraint, SourceIndex,
    SourceValue,
};
use migration::Migration;
use source::MemorySourceGraph;
use storage::GraphStore;
use tempfile::tempdir;

fn unique(label: &str, key: &str) -> SourceConstraint {
    SourceConstraint {
        kind: ConstraintKind::Uniqueness,
        scope: SchemaScope::Label(label.to_string()),
        property_keys: vec![key.to_string()],
    }
}

fn plain_index(label: &str, key: &str) -> SourceIndex {
    SourceIndex {
        label: label.to_string(),
        property_keys: vec![key.to_string()],
        constraint_index: false,
    }
}

async fn index_kind(store: &GraphStore, class_name: &str, property: &str) -> Option<IndexKind> {
    store
        .class(class_name)
        .await?
        .indexes
        .into_iter()
        .find(|index| index.property == property)
        .map(|index| index.kind)
}

fn migration() -> Migration {
    Migration::new(MigrationOptions::default())
}

#[tokio::test]
async fn test_sampled_types_drive_property_declarations() {
    let dir = tempdir().unwrap();
    let store = fresh_store(dir.path()).await;
    let source = MemorySourceGraph::new()
        .with_node(node(1, &["Person"]))
        .with_node(node(2, &["Person"]).with_property("age", SourceValue::Integer(32)))
        .with_constraint(unique("Person", "age"))
        .with_index(plain_index("Person", "score"));

    let result = migration()
        .run_with(&source, &store, MigrationCounters::new())
        .await;
    assert!(result.success);

    let person = store.class("Person").await.unwrap();
    assert_eq!(person.properties["age"], DestType::Integer);
    assert_eq!(person.properties["score"], DestType::String);
    assert_eq!(result.counters.inferred_default_types, 1);
    assert_eq!(result.counters.properties_created, 2);
    assert_eq!(index_kind(&store, "Person", "age").await, Some(IndexKind::Unique));
    assert_eq!(index_kind(&store, "Person", "score").await, Some(IndexKind::NotUnique));
}

#[tokio::test]
async fn test_duplicate_values_fall_back_to_not_unique_index() {
    let dir = tempdir().unwrap();
    let store = fresh_store(dir.path()).await;
    let source = MemorySourceGraph::new()
        .with_node(node(1, &["Person"]).with_property("email", "a@example.com"))
        .with_node(node(2, &["Person"]).with_property("email", "a@example.com"))
        .with_constraint(unique("Person", "email"));

    let result = migration()
        .run_with(&source, &store, MigrationCounters::new())
        .await;
    assert!(result.success);
    assert_eq!(result.counters.not_unique_fallbacks, 1);
    assert_eq!(result.counters.constraints_created, 0);
    assert_eq!(index_kind(&store, "Person", "email").await, Some(IndexKind::NotUnique));
}

#[tokio::test]
async fn test_failing_unique_index_falls_back_once() {
    let dir = tempdir().unwrap();
    let mut writer = FaultyWriter::new(fresh_store(dir.path()).await);
    writer.fail_unique_on = Some("email".to_string());
    let source = MemorySourceGraph::new()
        .with_node(node(1, &["Person"]).with_property("email", "a@example.com"))
        .with_constraint(unique("Person", "email"));

    let result = migration()
        .run_with(&source, &writer, MigrationCounters::new())
        .await;
    assert!(result.success);
    assert_eq!(result.counters.not_unique_fallbacks, 1);
    assert_eq!(
        index_kind(&writer.inner, "Person", "email").await,
        Some(IndexKind::NotUnique)
    );
}

#[tokio::test]
async fn test_repeated_schema_elements_are_no_ops() {
    let dir = tempdir().unwrap();
    let store = fresh_store(dir.path()).await;
    let source = MemorySourceGraph::new()
        .with_node(node(1, &["Person"]).with_property("name", "Ada"))
        .with_constraint(unique("Person", "name"))
        .with_constraint(unique("Person", "name"))
        .with_index(plain_index("City", "zip"))
        .with_index(plain_index("City", "zip"));

    let result = migration()
        .run_with(&source, &store, MigrationCounters::new())
        .await;
    assert!(result.success);
    assert_eq!(result.counters.constraints_found, 2);
    assert_eq!(result.counters.unique_indices_created, 1);
    assert_eq!(result.counters.not_unique_fallbacks, 0);
    assert_eq!(result.counters.indices_created, 1);

    let person = store.class("Person").await.unwrap();
    assert_eq!(
        person
            .indexes
            .iter()
            .filter(|index| index.property == "name")
            .count(),
        1
    );

    // schema classes are created even when no node carries the label
    let city = store.class("City").await.unwrap();
    assert_eq!(city.kind, ClassKind::Vertex);
    assert_eq!(city.record_count, 0);
}

#[tokio::test]
async fn test_existence_constraints_are_not_enforced() {
    let dir = tempdir().unwrap();
    let store = fresh_store(dir.path()).await;
    let source = MemorySourceGraph::new()
        .with_node(node(1, &["Person"]).with_property("name", "Ada"))
        .with_node(node(2, &["Person"]))
        .with_relationship(rel(1, "KNOWS", 1, 2).with_property("since", 2001))
        .with_constraint(SourceConstraint {
            kind: ConstraintKind::NodePropertyExistence,
            scope: SchemaScope::Label("Person".into()),
            property_keys: vec!["name".into()],
        })
        .with_constraint(SourceConstraint {
            kind: ConstraintKind::RelationshipPropertyExistence,
            scope: SchemaScope::RelationshipType("KNOWS".into()),
            property_keys: vec!["since".into()],
        });

    let result = migration()
        .run_with(&source, &store, MigrationCounters::new())
        .await;
    assert!(result.success);
    assert_eq!(result.counters.existence_constraints_skipped, 2);
    assert_eq!(result.counters.constraints_created, 0);

    assert_eq!(store.class("Person").await.unwrap().properties["name"], DestType::String);
    let knows = store.class("KNOWS").await.unwrap();
    assert_eq!(knows.properties["since"], DestType::Integer);
    assert_eq!(index_kind(&store, "KNOWS", "since").await, None);
}

#[tokio::test]
async fn test_uniqueness_on_edge_class_is_skipped() {
    let dir = tempdir().unwrap();
    let store = fresh_store(dir.path()).await;
    let source = MemorySourceGraph::new()
        .with_node(node(1, &["Person"]))
        .with_node(node(2, &["Person"]))
        .with_relationship(rel(1, "KNOWS", 1, 2).with_property("token", "t-1"))
        .with_constraint(SourceConstraint {
            kind: ConstraintKind::Uniqueness,
            scope: SchemaScope::RelationshipType("KNOWS".into()),
            property_keys: vec!["token".into()],
        });

    let result = migration()
        .run_with(&source, &store, MigrationCounters::new())
        .await;
    assert!(result.success);
    assert_eq!(result.counters.constraints_created, 0);
    assert_eq!(result.counters.not_unique_fallbacks, 0);
    assert_eq!(store.class("KNOWS").await.unwrap().properties["token"], DestType::String);
    assert_eq!(index_kind(&store, "KNOWS", "token").await, None);
}

#[tokio::test]
async fn test_relationship_constraint_reuses_renamed_edge_class() {
    let dir = tempdir().unwrap();
    let store = fresh_store(dir.path()).await;
    let source = MemorySourceGraph::new()
        .with_node(node(1, &["OWNS"]))
        .with_node(node(2, &["Car"]))
        .with_relationship(rel(1, "OWNS", 1, 2).with_property("since", 2010))
        .with_constraint(SourceConstraint {
            kind: ConstraintKind::RelationshipPropertyExistence,
            scope: SchemaScope::RelationshipType("OWNS".into()),
            property_keys: vec!["since".into()],
        });

    let result = migration()
        .run_with(&source, &store, MigrationCounters::new())
        .await;
    assert!(result.success);

    let renamed = store.class("E_OWNS").await.unwrap();
    assert_eq!(renamed.properties["since"], DestType::Integer);
    assert!(!store
        .class("OWNS")
        .await
        .unwrap()
        .properties
        .contains_key("since"));
}

#[tokio::test]
async fn test_constraint_indices_and_keyless_entries_are_skipped() {
    let dir = tempdir().unwrap();
    let store = fresh_store(dir.path()).await;
    let source = MemorySourceGraph::new()
        .with_node(node(1, &["Person"]).with_property("email", "a@example.com"))
        .with_constraint(unique("Person", "email"))
        .with_constraint(SourceConstraint {
            kind: ConstraintKind::Uniqueness,
            scope: SchemaScope::Label("Person".into()),
            property_keys: Vec::new(),
        })
        .with_index(SourceIndex {
            label: "Person".into(),
            property_keys: vec!["email".into()],
            constraint_index: true,
        })
        .with_index(SourceIndex {
            label: "Person".into(),
            property_keys: Vec::new(),
            constraint_index: false,
        });

    let result = migration()
        .run_with(&source, &store, MigrationCounters::new())
        .await;
    assert!(result.success);
    assert_eq!(result.counters.constraints_found, 2);
    assert_eq!(result.counters.constraints_created, 1);
    assert_eq!(result.counters.indices_found, 2);
    assert_eq!(result.counters.constraint_indices_skipped, 1);
    assert_eq!(result.counters.indices_created, 0);
    assert_eq!(index_kind(&store, "Person", "email").await, Some(IndexKind::Unique));
}
