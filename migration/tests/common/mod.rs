#![allow(dead_code)]

use async_trait::async_trait;
use graphport_core::model::{
    ClassKind, DestType, IndexKind, PropertyMap, PropertyValue, RecordId, SourceConstraint,
    SourceIndex, SourceNode, SourceRelationship,
};
use migration::resolver::NODE_ID_KEY;
use migration::DestinationGraphWriter;
use source::reader::{NodeIter, RelationshipIter};
use source::{MemorySourceGraph, SourceError, SourceGraphReader};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use storage::{GraphStore, StoreError, VertexScope};

pub async fn fresh_store(dir: &Path) -> GraphStore {
    GraphStore::create(dir.join("db"), false).await.unwrap()
}

/// Delegates to a real store, failing the operations it is told to fail.
pub struct FaultyWriter {
    pub inner: GraphStore,
    /// Node ids whose vertex creation fails.
    pub fail_nodes: Vec<i64>,
    /// Property whose unique index creation fails.
    pub fail_unique_on: Option<String>,
    /// Node id at which the destination stops accepting writes altogether.
    pub lost_at_node: Option<i64>,
}

impl FaultyWriter {
    pub fn new(inner: GraphStore) -> Self {
        Self {
            inner,
            fail_nodes: Vec::new(),
            fail_unique_on: None,
            lost_at_node: None,
        }
    }
}

#[async_trait]
impl DestinationGraphWriter for FaultyWriter {
    async fn class_kind(&self, name: &str) -> Option<ClassKind> {
        self.inner.class_kind(name).await
    }

    async fn create_vertex_class(&self, name: &str) -> Result<(), StoreError> {
        self.inner.create_vertex_class(name).await.map(|_| ())
    }

    async fn create_edge_class(&self, name: &str) -> Result<(), StoreError> {
        self.inner.create_edge_class(name).await.map(|_| ())
    }

    async fn create_property(
        &self,
        class_name: &str,
        key: &str,
        dest_type: DestType,
    ) -> Result<bool, StoreError> {
        self.inner.create_property(class_name, key, dest_type).await
    }

    async fn create_index(
        &self,
        class_name: &str,
        property: &str,
        kind: IndexKind,
    ) -> Result<bool, StoreError> {
        if kind == IndexKind::Unique && self.fail_unique_on.as_deref() == Some(property) {
            return Err(StoreError::Serialization);
        }
        self.inner.create_index(class_name, property, kind).await
    }

    async fn create_vertex(
        &self,
        class_name: &str,
        properties: PropertyMap,
    ) -> Result<RecordId, StoreError> {
        if let Some(PropertyValue::Long(id)) = properties.get(NODE_ID_KEY) {
            if self.fail_nodes.contains(id) {
                return Err(StoreError::Serialization);
            }
            if self.lost_at_node == Some(*id) {
                return Err(StoreError::Io(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "destination volume went away",
                )));
            }
        }
        self.inner.create_vertex(class_name, properties).await
    }

    async fn create_edge(
        &self,
        class_name: &str,
        out_vertex: RecordId,
        in_vertex: RecordId,
        properties: PropertyMap,
    ) -> Result<RecordId, StoreError> {
        self.inner
            .create_edge(class_name, out_vertex, in_vertex, properties)
            .await
    }

    async fn find_vertices_by_property(
        &self,
        scope: &VertexScope,
        key: &str,
        value: &PropertyValue,
    ) -> Result<Vec<RecordId>, StoreError> {
        self.inner.find_vertices_by_property(scope, key, value).await
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.inner.close().await
    }
}

/// Wraps an in-memory graph, injecting unreadable records or a lost
/// connection on the relationship pass.
pub struct FlakySource {
    pub inner: MemorySourceGraph,
    pub unreadable_nodes: Vec<i64>,
    pub relationships_unavailable: bool,
    closed: AtomicBool,
}

impl FlakySource {
    pub fn new(inner: MemorySourceGraph) -> Self {
        Self {
            inner,
            unreadable_nodes: Vec::new(),
            relationships_unavailable: false,
            closed: AtomicBool::new(false),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl SourceGraphReader for FlakySource {
    fn nodes(&self) -> Result<NodeIter<'_>, SourceError> {
        let unreadable = self.unreadable_nodes.clone();
        Ok(Box::new(self.inner.nodes()?.map(move |item| match item {
            Ok(node) if unreadable.contains(&node.id) => Err(SourceError::UnreadableNode {
                id: node.id,
                reason: "corrupt record".into(),
            }),
            other => other,
        })))
    }

    fn relationships(&self) -> Result<RelationshipIter<'_>, SourceError> {
        if self.relationships_unavailable {
            return Err(SourceError::Open {
                path: "bolt://source".into(),
                reason: "connection reset".into(),
            });
        }
        self.inner.relationships()
    }

    fn constraints(&self) -> Result<Vec<SourceConstraint>, SourceError> {
        self.inner.constraints()
    }

    fn indexes(&self) -> Result<Vec<SourceIndex>, SourceError> {
        self.inner.indexes()
    }

    fn close(&self) -> Result<(), SourceError> {
        self.closed.store(true, Ordering::SeqCst);
        self.inner.close()
    }
}

pub fn node(id: i64, labels: &[&str]) -> SourceNode {
    SourceNode::new(id).with_labels(labels.iter().copied())
}

pub fn rel(id: i64, rel_type: &str, start: i64, end: i64) -> SourceRelationship {
    SourceRelationship::new(id, rel_type, start, end)
}
