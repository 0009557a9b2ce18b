use crate::writer::DestinationGraphWriter;
use graphport_core::model::ClassKind;
use std::collections::BTreeMap;
use tracing::warn;

/// Identity property injected into every vertex.
pub const NODE_ID_KEY: &str = "Neo4jNodeID";
/// Identity property injected into every edge.
pub const REL_ID_KEY: &str = "Neo4jRelID";
/// Ordered labels of a node collapsed into the multi-label class.
pub const LABEL_LIST_KEY: &str = "Neo4jLabelList";

pub const GENERIC_CLASS: &str = "GenericClassNeo4jConversion";
pub const MULTIPLE_LABEL_CLASS: &str = "MultipleLabelNeo4jConversion";

/// Prefix of an edge class whose relationship type collides with a vertex class.
pub const EDGE_CLASS_PREFIX: &str = "E_";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassResolution {
    pub class_name: String,
    pub generic_fallback: bool,
    pub multi_label: bool,
}

/// Destination vertex class for a node's label set. Labels are taken
/// literally; case merging is left to the destination.
pub fn resolve_vertex_class(labels: &[String]) -> ClassResolution {
    match labels {
        [] => ClassResolution {
            class_name: GENERIC_CLASS.to_string(),
            generic_fallback: true,
            multi_label: false,
        },
        [label] => ClassResolution {
            class_name: label.clone(),
            generic_fallback: false,
            multi_label: false,
        },
        _ => ClassResolution {
            class_name: MULTIPLE_LABEL_CLASS.to_string(),
            generic_fallback: false,
            multi_label: true,
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeClassDecision {
    pub class_name: String,
    /// The relationship type collided with a vertex class.
    pub renamed: bool,
    /// First time this type was seen in the run.
    pub first_seen: bool,
}

/// Caches the edge-class name chosen for each relationship type, so the
/// collision lookup and its warning happen once per type.
#[derive(Debug, Default, Clone)]
pub struct EdgeClassResolver {
    decisions: BTreeMap<String, String>,
}

impl EdgeClassResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn resolve(
        &mut self,
        rel_type: &str,
        writer: &dyn DestinationGraphWriter,
    ) -> EdgeClassDecision {
        if let Some(class_name) = self.decisions.get(rel_type) {
            return EdgeClassDecision {
                class_name: class_name.clone(),
                renamed: class_name != rel_type,
                first_seen: false,
            };
        }

        let renamed = writer.class_kind(rel_type).await == Some(ClassKind::Vertex);
        let class_name = if renamed {
            let prefixed = format!("{}{}", EDGE_CLASS_PREFIX, rel_type);
            warn!(
                "Relationship type {} collides with a vertex class; migrating it as {}",
                rel_type, prefixed
            );
            prefixed
        } else {
            rel_type.to_string()
        };

        self.decisions
            .insert(rel_type.to_string(), class_name.clone());
        EdgeClassDecision {
            class_name,
            renamed,
            first_seen: true,
        }
    }

    pub fn cached(&self, rel_type: &str) -> Option<&str> {
        self.decisions.get(rel_type).map(String::as_str)
    }

    /// Relationship type to edge class, for every type resolved so far.
    pub fn decisions(&self) -> &BTreeMap<String, String> {
        &self.decisions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::GraphStore;
    use tempfile::tempdir;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_label_resolves_to_generic_class() {
        let resolution = resolve_vertex_class(&[]);
        assert_eq!(resolution.class_name, GENERIC_CLASS);
        assert!(resolution.generic_fallback);
        assert!(!resolution.multi_label);
    }

    #[test]
    fn single_label_is_taken_literally() {
        let resolution = resolve_vertex_class(&labels(&["person"]));
        assert_eq!(resolution.class_name, "person");
        assert!(!resolution.generic_fallback);
        assert!(!resolution.multi_label);
    }

    #[test]
    fn several_labels_resolve_to_multi_label_class() {
        let resolution = resolve_vertex_class(&labels(&["Person", "Employee"]));
        assert_eq!(resolution.class_name, MULTIPLE_LABEL_CLASS);
        assert!(resolution.multi_label);
    }

    #[tokio::test]
    async fn colliding_relationship_type_is_prefixed_once() {
        let dir = tempdir().unwrap();
        let store = GraphStore::create(dir.path().join("db"), false).await.unwrap();
        store.create_vertex_class("works_at").await.unwrap();

        let mut resolver = EdgeClassResolver::new();
        let first = resolver.resolve("WORKS_AT", &store).await;
        assert_eq!(first.class_name, "E_WORKS_AT");
        assert!(first.renamed);
        assert!(first.first_seen);

        let second = resolver.resolve("WORKS_AT", &store).await;
        assert_eq!(second.class_name, "E_WORKS_AT");
        assert!(!second.first_seen);
        assert_eq!(resolver.cached("WORKS_AT"), Some("E_WORKS_AT"));
    }

    #[tokio::test]
    async fn existing_edge_class_is_not_a_collision() {
        let dir = tempdir().unwrap();
        let store = GraphStore::create(dir.path().join("db"), false).await.unwrap();
        store.create_edge_class("KNOWS").await.unwrap();

        let mut resolver = EdgeClassResolver::new();
        let decision = resolver.resolve("KNOWS", &store).await;
        assert_eq!(decision.class_name, "KNOWS");
        assert!(!decision.renamed);
    }
}
