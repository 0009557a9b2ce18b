use crate::reader::{NodeIter, RelationshipIter, SourceError, SourceGraphReader};
use graphport_core::model::{SourceConstraint, SourceIndex, SourceNode, SourceRelationship};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// In-memory source graph, iterated in ascending id order.
#[derive(Default)]
pub struct MemorySourceGraph {
    nodes: BTreeMap<i64, SourceNode>,
    relationships: BTreeMap<i64, SourceRelationship>,
    constraints: Vec<SourceConstraint>,
    indexes: Vec<SourceIndex>,
    closed: AtomicBool,
}

impl MemorySourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(mut self, node: SourceNode) -> Self {
        self.insert_node(node);
        self
    }

    pub fn with_relationship(mut self, relationship: SourceRelationship) -> Self {
        self.insert_relationship(relationship);
        self
    }

    pub fn with_constraint(mut self, constraint: SourceConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn with_index(mut self, index: SourceIndex) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn insert_node(&mut self, node: SourceNode) {
        self.nodes.insert(node.id, node);
    }

    pub fn insert_relationship(&mut self, relationship: SourceRelationship) {
        self.relationships.insert(relationship.id, relationship);
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), SourceError> {
        if self.is_closed() {
            return Err(SourceError::Closed);
        }
        Ok(())
    }
}

impl SourceGraphReader for MemorySourceGraph {
    fn nodes(&self) -> Result<NodeIter<'_>, SourceError> {
        self.ensure_open()?;
        Ok(Box::new(self.nodes.values().cloned().map(Ok)))
    }

    fn relationships(&self) -> Result<RelationshipIter<'_>, SourceError> {
        self.ensure_open()?;
        Ok(Box::new(self.relationships.values().cloned().map(Ok)))
    }

    fn constraints(&self) -> Result<Vec<SourceConstraint>, SourceError> {
        self.ensure_open()?;
        Ok(self.constraints.clone())
    }

    fn indexes(&self) -> Result<Vec<SourceIndex>, SourceError> {
        self.ensure_open()?;
        Ok(self.indexes.clone())
    }

    fn close(&self) -> Result<(), SourceError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
