use graphport_core::model::{DestType, IndexKind, PropertyMap, PropertyValue};
use storage::store::WAL_FILE_NAME;
use storage::wal::WalError;
use storage::{GraphStore, StoreError, VertexScope};
use tempfile::tempdir;

fn identity(id: i64) -> PropertyMap {
    let mut map = PropertyMap::new();
    map.insert("Neo4jNodeID".to_string(), PropertyValue::Long(id));
    map
}

#[tokio::test]
async fn store_survives_restart_with_lookup_index() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("graph");

    {
        let store = GraphStore::create(&path, false).await.unwrap();
        store.create_vertex_class("City").await.unwrap();
        for id in 0..50 {
            store.create_vertex("City", identity(id)).await.unwrap();
        }
        store
            .create_property("City", "Neo4jNodeID", DestType::Long)
            .await
            .unwrap();
        store
            .create_index("City", "Neo4jNodeID", IndexKind::Unique)
            .await
            .unwrap();
        store.close().await.unwrap();
    }

    let store = GraphStore::open(&path).await.unwrap();
    assert_eq!(store.count("city").await, Some(50));
    let hits = store
        .find_vertices_by_property(&VertexScope::Any, "Neo4jNodeID", &PropertyValue::Long(42))
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    let vertex = store.vertex(hits[0]).await.unwrap();
    assert_eq!(vertex.properties.get("Neo4jNodeID"), Some(&PropertyValue::Long(42)));
}

#[tokio::test]
async fn corrupted_payload_is_detected_on_open() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("graph");

    {
        let store = GraphStore::create(&path, false).await.unwrap();
        store.create_vertex_class("City").await.unwrap();
        store.close().await.unwrap();
    }

    let wal_path = path.join(WAL_FILE_NAME);
    let mut bytes = std::fs::read(&wal_path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    std::fs::write(&wal_path, bytes).unwrap();

    let result = GraphStore::open(&path).await;
    assert!(matches!(
        result,
        Err(StoreError::Wal(WalError::CrcMismatch))
    ));
}
