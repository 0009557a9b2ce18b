use async_trait::async_trait;
use graphport_core::model::{ClassKind, DestType, IndexKind, PropertyMap, PropertyValue, RecordId};
use storage::{GraphStore, StoreError, VertexScope};

/// Write access to the destination graph.
///
/// Class lookups are case-insensitive. `create_property` and `create_index`
/// return `Ok(false)` when an identical definition already exists.
#[async_trait]
pub trait DestinationGraphWriter: Send + Sync {
    async fn class_kind(&self, name: &str) -> Option<ClassKind>;

    async fn class_exists(&self, name: &str) -> bool {
        self.class_kind(name).await.is_some()
    }

    async fn create_vertex_class(&self, name: &str) -> Result<(), StoreError>;

    async fn create_edge_class(&self, name: &str) -> Result<(), StoreError>;

    async fn create_property(
        &self,
        class_name: &str,
        key: &str,
        dest_type: DestType,
    ) -> Result<bool, StoreError>;

    async fn create_index(
        &self,
        class_name: &str,
        property: &str,
        kind: IndexKind,
    ) -> Result<bool, StoreError>;

    async fn create_vertex(
        &self,
        class_name: &str,
        properties: PropertyMap,
    ) -> Result<RecordId, StoreError>;

    async fn create_edge(
        &self,
        class_name: &str,
        out_vertex: RecordId,
        in_vertex: RecordId,
        properties: PropertyMap,
    ) -> Result<RecordId, StoreError>;

    async fn find_vertices_by_property(
        &self,
        scope: &VertexScope,
        key: &str,
        value: &PropertyValue,
    ) -> Result<Vec<RecordId>, StoreError>;

    async fn close(&self) -> Result<(), StoreError>;
}

#[async_trait]
impl DestinationGraphWriter for GraphStore {
    async fn class_kind(&self, name: &str) -> Option<ClassKind> {
        GraphStore::class_kind(self, name).await
    }

    async fn create_vertex_class(&self, name: &str) -> Result<(), StoreError> {
        GraphStore::create_vertex_class(self, name).await.map(|_| ())
    }

    async fn create_edge_class(&self, name: &str) -> Result<(), StoreError> {
        GraphStore::create_edge_class(self, name).await.map(|_| ())
    }

    async fn create_property(
        &self,
        class_name: &str,
        key: &str,
        dest_type: DestType,
    ) -> Result<bool, StoreError> {
        GraphStore::create_property(self, class_name, key, dest_type).await
    }

    async fn create_index(
        &self,
        class_name: &str,
        property: &str,
        kind: IndexKind,
    ) -> Result<bool, StoreError> {
        GraphStore::create_index(self, class_name, property, kind).await
    }

    async fn create_vertex(
        &self,
        class_name: &str,
        properties: PropertyMap,
    ) -> Result<RecordId, StoreError> {
        GraphStore::create_vertex(self, class_name, properties).await
    }

    async fn create_edge(
        &self,
        class_name: &str,
        out_vertex: RecordId,
        in_vertex: RecordId,
        properties: PropertyMap,
    ) -> Result<RecordId, StoreError> {
        GraphStore::create_edge(self, class_name, out_vertex, in_vertex, properties).await
    }

    async fn find_vertices_by_property(
        &self,
        scope: &VertexScope,
        key: &str,
        value: &PropertyValue,
    ) -> Result<Vec<RecordId>, StoreError> {
        GraphStore::find_vertices_by_property(self, scope, key, value).await
    }

    async fn close(&self) -> Result<(), StoreError> {
        GraphStore::close(self).await
    }
}
