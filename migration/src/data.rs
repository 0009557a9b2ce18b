use crate::context::MigrationContext;
use crate::error::MigrationError;
use crate::resolver::{
    resolve_vertex_class, EdgeClassResolver, LABEL_LIST_KEY, NODE_ID_KEY, REL_ID_KEY,
};
use crate::writer::DestinationGraphWriter;
use graphport_core::metrics::Phase;
use graphport_core::model::{
    ClassKind, DestType, IndexKind, PropertyMap, PropertyValue, RecordId, SourceNode,
    SourceRelationship,
};
use source::SourceGraphReader;
use std::collections::HashSet;
use storage::{StoreError, VertexScope};
use tracing::{debug, info, warn};

/// What the data pass leaves behind for the schema pass.
#[derive(Debug, Default)]
pub struct DataMigrationOutcome {
    pub vertex_classes: Vec<String>,
    pub edge_classes: Vec<String>,
    pub edge_class_resolver: EdgeClassResolver,
}

/// Copies nodes into vertices, then relationships into edges.
///
/// Phases run strictly in order: count nodes, create vertices, index
/// vertices, count relationships, create edges (and optionally index them).
/// Endpoints are resolved through the destination's `Neo4jNodeID` index, so
/// no node map is kept in memory.
pub struct DataMigrator<'a> {
    reader: &'a dyn SourceGraphReader,
    writer: &'a dyn DestinationGraphWriter,
    ctx: &'a mut MigrationContext,
    vertex_classes: Vec<String>,
    edge_classes: Vec<String>,
    known_classes: HashSet<String>,
    edge_class_resolver: EdgeClassResolver,
}

impl<'a> DataMigrator<'a> {
    pub fn new(
        reader: &'a dyn SourceGraphReader,
        writer: &'a dyn DestinationGraphWriter,
        ctx: &'a mut MigrationContext,
    ) -> Self {
        Self {
            reader,
            writer,
            ctx,
            vertex_classes: Vec::new(),
            edge_classes: Vec::new(),
            known_classes: HashSet::new(),
            edge_class_resolver: EdgeClassResolver::new(),
        }
    }

    pub async fn run(mut self) -> Result<DataMigrationOutcome, MigrationError> {
        let total_nodes = self.count_nodes()?;
        self.create_vertices(total_nodes).await?;
        self.index_vertices().await;

        let total_relationships = self.count_relationships()?;
        self.create_edges(total_relationships).await?;
        if self.ctx.options.index_relationship_ids {
            self.index_edges().await;
        }

        Ok(DataMigrationOutcome {
            vertex_classes: self.vertex_classes,
            edge_classes: self.edge_classes,
            edge_class_resolver: self.edge_class_resolver,
        })
    }

    fn count_nodes(&mut self) -> Result<u64, MigrationError> {
        self.ctx.counters.mark_start(Phase::CountNodes);
        let total = self.reader.nodes()?.count() as u64;
        self.ctx.counters.nodes_found += total;
        self.ctx.counters.mark_stop(Phase::CountNodes);
        self.ctx.emit(Phase::CountNodes, total, total);
        info!("Found {} nodes", total);
        Ok(total)
    }

    async fn create_vertices(&mut self, total: u64) -> Result<(), MigrationError> {
        self.ctx.counters.mark_start(Phase::CreateVertices);
        let reader = self.reader;
        let mut processed = 0;
        for item in reader.nodes()? {
            processed += 1;
            match item {
                Ok(node) => self.migrate_node(node).await?,
                Err(err) => {
                    warn!("Skipping unreadable node: {}", err);
                    self.ctx.counters.vertex_failures += 1;
                }
            }
            self.ctx.emit(Phase::CreateVertices, processed, total);
        }
        self.ctx.counters.mark_stop(Phase::CreateVertices);
        info!(
            "Created {} of {} vertices in {} classes",
            self.ctx.counters.vertices_created,
            total,
            self.vertex_classes.len()
        );
        Ok(())
    }

    async fn migrate_node(&mut self, node: SourceNode) -> Result<(), MigrationError> {
        let resolution = resolve_vertex_class(&node.labels);
        if resolution.generic_fallback {
            self.ctx.counters.nodes_without_label += 1;
        }
        if resolution.multi_label {
            self.ctx.counters.nodes_with_multiple_labels += 1;
        }

        let class_name = resolution.class_name;
        if let Err(err) = self.ensure_vertex_class(&class_name).await {
            let err = entity_failure(err)?;
            warn!(
                "Node {}: cannot create vertex class {}: {}",
                node.id, class_name, err
            );
            self.ctx.counters.vertex_failures += 1;
            return Ok(());
        }

        let properties = vertex_properties(&node, resolution.multi_label);
        match self.writer.create_vertex(&class_name, properties).await {
            Ok(rid) => {
                debug!("Node {} -> {} {}", node.id, class_name, rid);
                self.ctx.counters.vertices_created += 1;
            }
            Err(err) => {
                let err = entity_failure(err)?;
                warn!(
                    "Node {}: cannot create vertex in class {}: {}",
                    node.id, class_name, err
                );
                self.ctx.counters.vertex_failures += 1;
            }
        }
        Ok(())
    }

    async fn ensure_vertex_class(&mut self, class_name: &str) -> Result<(), MigrationError> {
        let key = class_name.to_lowercase();
        if self.known_classes.contains(&key) {
            return Ok(());
        }
        match self.writer.class_kind(class_name).await {
            Some(ClassKind::Vertex) => {}
            Some(ClassKind::Edge) => {
                return Err(StoreError::WrongClassKind {
                    class: class_name.to_string(),
                    expected: ClassKind::Vertex,
                }
                .into());
            }
            None => {
                self.writer.create_vertex_class(class_name).await?;
                self.ctx.counters.vertex_classes_created += 1;
                info!("Created vertex class {}", class_name);
            }
        }
        self.known_classes.insert(key);
        self.vertex_classes.push(class_name.to_string());
        Ok(())
    }

    async fn index_vertices(&mut self) {
        self.ctx.counters.mark_start(Phase::IndexVertices);
        let classes = self.vertex_classes.clone();
        let total = classes.len() as u64;
        for (i, class_name) in classes.iter().enumerate() {
            self.create_internal_index(class_name, NODE_ID_KEY, DestType::Long, IndexKind::Unique)
                .await;
            self.create_internal_index(
                class_name,
                LABEL_LIST_KEY,
                DestType::EmbeddedList,
                IndexKind::NotUnique,
            )
            .await;
            self.ctx.emit(Phase::IndexVertices, i as u64 + 1, total);
        }
        self.ctx.counters.mark_stop(Phase::IndexVertices);
    }

    async fn create_internal_index(
        &mut self,
        class_name: &str,
        key: &str,
        dest_type: DestType,
        kind: IndexKind,
    ) {
        if let Err(err) = self.writer.create_property(class_name, key, dest_type).await {
            warn!("Cannot declare {}.{}: {}", class_name, key, err);
            return;
        }
        match self.writer.create_index(class_name, key, kind).await {
            Ok(true) => {
                self.ctx.counters.internal_indices_created += 1;
                debug!("Created {} index {}.{}", kind, class_name, key);
            }
            Ok(false) => {}
            Err(err) => warn!("Cannot create {} index {}.{}: {}", kind, class_name, key, err),
        }
    }

    fn count_relationships(&mut self) -> Result<u64, MigrationError> {
        self.ctx.counters.mark_start(Phase::CountRelationships);
        let total = self.reader.relationships()?.count() as u64;
        self.ctx.counters.relationships_found += total;
        self.ctx.counters.mark_stop(Phase::CountRelationships);
        self.ctx.emit(Phase::CountRelationships, total, total);
        info!("Found {} relationships", total);
        Ok(total)
    }

    async fn create_edges(&mut self, total: u64) -> Result<(), MigrationError> {
        self.ctx.counters.mark_start(Phase::CreateEdges);
        let reader = self.reader;
        let mut processed = 0;
        for item in reader.relationships()? {
            processed += 1;
            match item {
                Ok(rel) => self.migrate_relationship(rel).await?,
                Err(err) => {
                    warn!("Skipping unreadable relationship: {}", err);
                    self.ctx.counters.edge_failures += 1;
                }
            }
            self.ctx.emit(Phase::CreateEdges, processed, total);
        }
        self.ctx.counters.mark_stop(Phase::CreateEdges);
        info!(
            "Created {} edges for {} of {} relationships",
            self.ctx.counters.edges_created, self.ctx.counters.relationships_migrated, total
        );
        Ok(())
    }

    async fn migrate_relationship(
        &mut self,
        rel: SourceRelationship,
    ) -> Result<(), MigrationError> {
        let decision = self
            .edge_class_resolver
            .resolve(&rel.rel_type, self.writer)
            .await;
        let class_name = decision.class_name;
        if decision.first_seen {
            if decision.renamed {
                self.ctx.counters.relationship_types_renamed += 1;
            }
            self.ensure_edge_class(&class_name).await;
        }

        let Some(out_vertices) = self.endpoint(&rel, rel.start).await? else {
            return Ok(());
        };
        let Some(in_vertices) = self.endpoint(&rel, rel.end).await? else {
            return Ok(());
        };

        let properties = edge_properties(&rel);
        let mut migrated = false;
        for out_vertex in &out_vertices {
            for in_vertex in &in_vertices {
                match self
                    .writer
                    .create_edge(&class_name, *out_vertex, *in_vertex, properties.clone())
                    .await
                {
                    Ok(rid) => {
                        debug!("Relationship {} -> {} {}", rel.id, class_name, rid);
                        self.ctx.counters.edges_created += 1;
                        migrated = true;
                    }
                    Err(err) => {
                        let err = entity_failure(err)?;
                        warn!(
                            "Relationship {}: cannot create edge {} -> {} in class {}: {}",
                            rel.id, out_vertex, in_vertex, class_name, err
                        );
                        self.ctx.counters.edge_failures += 1;
                    }
                }
            }
        }
        if migrated {
            self.ctx.counters.relationships_migrated += 1;
        }
        Ok(())
    }

    /// Vertices carrying the node id, or `None` when the relationship has to
    /// be skipped.
    async fn endpoint(
        &mut self,
        rel: &SourceRelationship,
        node_id: i64,
    ) -> Result<Option<Vec<RecordId>>, MigrationError> {
        let lookup = self
            .writer
            .find_vertices_by_property(&VertexScope::Any, NODE_ID_KEY, &PropertyValue::Long(node_id))
            .await;
        match lookup {
            Ok(found) if found.is_empty() => {
                warn!(
                    "Relationship {} ({}): no vertex for node {}, skipped",
                    rel.id, rel.rel_type, node_id
                );
                self.ctx.counters.relationships_missing_endpoint += 1;
                Ok(None)
            }
            Ok(found) => Ok(Some(found)),
            Err(err) => {
                let err = entity_failure(err)?;
                warn!(
                    "Relationship {} ({}): lookup of node {} failed: {}",
                    rel.id, rel.rel_type, node_id, err
                );
                self.ctx.counters.edge_failures += 1;
                Ok(None)
            }
        }
    }

    async fn ensure_edge_class(&mut self, class_name: &str) {
        match self.writer.class_kind(class_name).await {
            Some(ClassKind::Edge) => {}
            Some(ClassKind::Vertex) => {
                warn!("{} already exists as a vertex class", class_name);
                return;
            }
            None => match self.writer.create_edge_class(class_name).await {
                Ok(()) => {
                    self.ctx.counters.edge_classes_created += 1;
                    info!("Created edge class {}", class_name);
                }
                Err(err) => {
                    warn!("Cannot create edge class {}: {}", class_name, err);
                    return;
                }
            },
        }
        self.edge_classes.push(class_name.to_string());
    }

    async fn index_edges(&mut self) {
        self.ctx.counters.mark_start(Phase::IndexEdges);
        let classes = self.edge_classes.clone();
        let total = classes.len() as u64;
        for (i, class_name) in classes.iter().enumerate() {
            self.create_internal_index(class_name, REL_ID_KEY, DestType::Long, IndexKind::NotUnique)
                .await;
            self.ctx.emit(Phase::IndexEdges, i as u64 + 1, total);
        }
        self.ctx.counters.mark_stop(Phase::IndexEdges);
    }
}

/// Hands back a per-entity failure for counting, or ends the run when the
/// destination itself is gone.
fn entity_failure(err: impl Into<MigrationError>) -> Result<MigrationError, MigrationError> {
    let err = err.into();
    if err.is_fatal() {
        Err(err)
    } else {
        Ok(err)
    }
}

fn vertex_properties(node: &SourceNode, multi_label: bool) -> PropertyMap {
    let mut properties: PropertyMap = node
        .properties
        .iter()
        .map(|(key, value)| (key.clone(), PropertyValue::from(value)))
        .collect();

    if properties
        .insert(NODE_ID_KEY.to_string(), PropertyValue::Long(node.id))
        .is_some()
    {
        warn!("Node {}: source property {} replaced by the node id", node.id, NODE_ID_KEY);
    }
    if multi_label {
        properties.insert(
            LABEL_LIST_KEY.to_string(),
            PropertyValue::string_list(node.labels.iter().cloned()),
        );
    }
    properties
}

fn edge_properties(rel: &SourceRelationship) -> PropertyMap {
    let mut properties: PropertyMap = rel
        .properties
        .iter()
        .map(|(key, value)| (key.clone(), PropertyValue::from(value)))
        .collect();
    properties.insert(REL_ID_KEY.to_string(), PropertyValue::Long(rel.id));
    properties
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphport_core::model::ScalarValue;

    #[test]
    fn multi_label_vertices_keep_label_order() {
        let node = SourceNode::new(7)
            .with_labels(["Person", "Employee"])
            .with_property("name", "Ada");
        let properties = vertex_properties(&node, true);

        assert_eq!(properties[NODE_ID_KEY], PropertyValue::Long(7));
        assert_eq!(
            properties[LABEL_LIST_KEY],
            PropertyValue::List(vec![
                ScalarValue::String("Person".into()),
                ScalarValue::String("Employee".into()),
            ])
        );
        assert_eq!(properties["name"], PropertyValue::String("Ada".into()));
    }

    #[test]
    fn single_label_vertices_have_no_label_list() {
        let node = SourceNode::new(1).with_labels(["Person"]);
        let properties = vertex_properties(&node, false);
        assert!(!properties.contains_key(LABEL_LIST_KEY));
        assert_eq!(properties.len(), 1);
    }

    #[test]
    fn edges_carry_relationship_id() {
        let rel = SourceRelationship::new(12, "KNOWS", 1, 2).with_property("since", 2019);
        let properties = edge_properties(&rel);
        assert_eq!(properties[REL_ID_KEY], PropertyValue::Long(12));
        assert_eq!(properties["since"], PropertyValue::Integer(2019));
    }
}
