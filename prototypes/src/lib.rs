use graphport_core::model::{SourceNode, SourceRelationship, SourceValue};
use source::MemorySourceGraph;

const LABELS: [&str; 3] = ["Person", "Company", "City"];

/// Deterministic source graph for benchmarks: `node_count` nodes spread over
/// three labels (every tenth node unlabelled, every seventh multi-labelled)
/// and `fanout` outgoing relationships per node.
pub fn synthetic_graph(node_count: i64, fanout: i64) -> MemorySourceGraph {
    let mut graph = MemorySourceGraph::new();
    for id in 0..node_count {
        let labels: Vec<&str> = if id % 10 == 0 {
            Vec::new()
        } else if id % 7 == 0 {
            vec![LABELS[0], LABELS[1]]
        } else {
            vec![LABELS[(id % 3) as usize]]
        };
        graph.insert_node(
            SourceNode::new(id)
                .with_labels(labels)
                .with_property("name", format!("node-{id}"))
                .with_property("rank", SourceValue::Integer((id % 100) as i32)),
        );
    }

    let mut rel_id = 0;
    for start in 0..node_count {
        for step in 1..=fanout {
            let end = (start + step * 13) % node_count;
            let rel_type = if step % 2 == 0 { "KNOWS" } else { "WORKS_AT" };
            graph.insert_relationship(
                SourceRelationship::new(rel_id, rel_type, start, end)
                    .with_property("weight", step as f64 / fanout as f64),
            );
            rel_id += 1;
        }
    }
    graph
}
