use crate::type_mapper::map_sampled;
use graphport_core::model::{DestType, SchemaScope, SourceKind};
use source::{SourceError, SourceGraphReader};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampledType {
    pub dest_type: DestType,
    /// No entity carried the property; `dest_type` is the String default.
    pub inferred_default: bool,
}

impl SampledType {
    fn from_kind(kind: Option<SourceKind>) -> Self {
        Self {
            dest_type: map_sampled(kind),
            inferred_default: kind.is_none(),
        }
    }
}

/// Infers destination property types from the first source entity carrying
/// the property. Unreadable entities are skipped.
pub struct PropertySampler<'a> {
    reader: &'a dyn SourceGraphReader,
}

impl<'a> PropertySampler<'a> {
    pub fn new(reader: &'a dyn SourceGraphReader) -> Self {
        Self { reader }
    }

    pub fn sample(&self, scope: &SchemaScope, key: &str) -> Result<SampledType, SourceError> {
        match scope {
            SchemaScope::Label(label) => self.sample_label(label, key),
            SchemaScope::RelationshipType(rel_type) => self.sample_relationship_type(rel_type, key),
        }
    }

    pub fn sample_label(&self, label: &str, key: &str) -> Result<SampledType, SourceError> {
        let mut kind = None;
        for item in self.reader.nodes_with_label(label)? {
            match item {
                Ok(node) => {
                    if let Some(value) = node.properties.get(key) {
                        kind = Some(value.kind());
                        break;
                    }
                }
                Err(err) => warn!("Sampling {}.{}: skipping unreadable node: {}", label, key, err),
            }
        }
        debug!("Sampled {}.{} as {:?}", label, key, kind);
        Ok(SampledType::from_kind(kind))
    }

    pub fn sample_relationship_type(
        &self,
        rel_type: &str,
        key: &str,
    ) -> Result<SampledType, SourceError> {
        let mut kind = None;
        for item in self.reader.relationships_with_type(rel_type)? {
            match item {
                Ok(rel) => {
                    if let Some(value) = rel.properties.get(key) {
                        kind = Some(value.kind());
                        break;
                    }
                }
                Err(err) => warn!(
                    "Sampling {}.{}: skipping unreadable relationship: {}",
                    rel_type, key, err
                ),
            }
        }
        debug!("Sampled {}.{} as {:?}", rel_type, key, kind);
        Ok(SampledType::from_kind(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphport_core::model::{
        SourceConstraint, SourceIndex, SourceNode, SourceRelationship, SourceValue,
    };
    use source::reader::{NodeIter, RelationshipIter};
    use source::MemorySourceGraph;

    #[test]
    fn first_carrier_decides_the_type() {
        let graph = MemorySourceGraph::new()
            .with_node(SourceNode::new(1).with_labels(["Person"]))
            .with_node(
                SourceNode::new(2)
                    .with_labels(["Person"])
                    .with_property("age", SourceValue::Integer(41)),
            )
            .with_node(
                SourceNode::new(3)
                    .with_labels(["Person"])
                    .with_property("age", "forty"),
            );

        let sampled = PropertySampler::new(&graph).sample_label("Person", "age").unwrap();
        assert_eq!(sampled.dest_type, DestType::Integer);
        assert!(!sampled.inferred_default);
    }

    #[test]
    fn missing_property_defaults_to_string() {
        let graph = MemorySourceGraph::new()
            .with_node(SourceNode::new(1).with_labels(["Person"]).with_property("age", 3));

        let sampled = PropertySampler::new(&graph).sample_label("Person", "score").unwrap();
        assert_eq!(sampled.dest_type, DestType::String);
        assert!(sampled.inferred_default);
    }

    #[test]
    fn relationship_scope_samples_relationships() {
        let graph = MemorySourceGraph::new().with_relationship(
            SourceRelationship::new(1, "RATED", 1, 2).with_property("stars", 4.5),
        );

        let sampled = PropertySampler::new(&graph)
            .sample(&SchemaScope::RelationshipType("RATED".into()), "stars")
            .unwrap();
        assert_eq!(sampled.dest_type, DestType::Double);
    }

    /// Yields an unreadable node ahead of a readable one.
    struct FlakySource;

    impl SourceGraphReader for FlakySource {
        fn nodes(&self) -> Result<NodeIter<'_>, SourceError> {
            let items = vec![
                Err(SourceError::UnreadableNode {
                    id: 1,
                    reason: "page checksum".into(),
                }),
                Ok(SourceNode::new(2)
                    .with_labels(["Person"])
                    .with_property("active", true)),
            ];
            Ok(Box::new(items.into_iter()))
        }

        fn relationships(&self) -> Result<RelationshipIter<'_>, SourceError> {
            Ok(Box::new(std::iter::empty()))
        }

        fn constraints(&self) -> Result<Vec<SourceConstraint>, SourceError> {
            Ok(Vec::new())
        }

        fn indexes(&self) -> Result<Vec<SourceIndex>, SourceError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn unreadable_nodes_do_not_stop_the_scan() {
        let sampled = PropertySampler::new(&FlakySource)
            .sample_label("Person", "active")
            .unwrap();
        assert_eq!(sampled.dest_type, DestType::Boolean);
    }
}
