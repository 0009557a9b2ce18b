use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Initialize,
    CountNodes,
    CreateVertices,
    IndexVertices,
    CountRelationships,
    CreateEdges,
    IndexEdges,
    CountConstraints,
    Constraints,
    CountIndices,
    Indices,
    Finalize,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Phase::Initialize => "initialize",
            Phase::CountNodes => "count_nodes",
            Phase::CreateVertices => "create_vertices",
            Phase::IndexVertices => "index_vertices",
            Phase::CountRelationships => "count_relationships",
            Phase::CreateEdges => "create_edges",
            Phase::IndexEdges => "index_edges",
            Phase::CountConstraints => "count_constraints",
            Phase::Constraints => "constraints",
            Phase::CountIndices => "count_indices",
            Phase::Indices => "indices",
            Phase::Finalize => "finalize",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseTiming {
    pub phase: Phase,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl PhaseTiming {
    pub fn elapsed_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }
}

/// Every counter of a run. Fields only ever grow; the struct is allocated once
/// per run and read at the end for the summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MigrationCounters {
    // nodes
    pub nodes_found: u64,
    pub nodes_without_label: u64,
    pub nodes_with_multiple_labels: u64,
    pub vertices_created: u64,
    pub vertex_failures: u64,
    pub vertex_classes_created: u64,
    pub internal_indices_created: u64,

    // relationships
    pub relationships_found: u64,
    /// Relationships that produced at least one edge. `edges_created` can be
    /// larger when an endpoint id matches several vertices.
    pub relationships_migrated: u64,
    pub edges_created: u64,
    pub edge_failures: u64,
    pub relationships_missing_endpoint: u64,
    pub edge_classes_created: u64,
    pub relationship_types_renamed: u64,

    // constraints
    pub constraints_found: u64,
    pub unique_constraints_found: u64,
    pub constraints_created: u64,
    pub unique_indices_created: u64,
    pub not_unique_fallbacks: u64,
    pub existence_constraints_skipped: u64,

    // indices
    pub indices_found: u64,
    pub constraint_indices_skipped: u64,
    pub indices_created: u64,

    // schema properties
    pub properties_created: u64,
    pub inferred_default_types: u64,

    pub timings: Vec<PhaseTiming>,
}

impl MigrationCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_start(&mut self, phase: Phase) {
        self.timings.push(PhaseTiming {
            phase,
            started_at: Utc::now(),
            finished_at: None,
        });
    }

    pub fn mark_stop(&mut self, phase: Phase) {
        if let Some(timing) = self
            .timings
            .iter_mut()
            .rev()
            .find(|t| t.phase == phase && t.finished_at.is_none())
        {
            timing.finished_at = Some(Utc::now());
        }
    }

    pub fn timing(&self, phase: Phase) -> Option<&PhaseTiming> {
        self.timings.iter().rev().find(|t| t.phase == phase)
    }

    pub fn vertices_per_second(&self) -> f64 {
        throughput(self.vertices_created, self.timing(Phase::CreateVertices))
    }

    pub fn edges_per_second(&self) -> f64 {
        throughput(self.edges_created, self.timing(Phase::CreateEdges))
    }

    pub fn is_complete_copy(&self) -> bool {
        self.vertices_created == self.nodes_found
            && self.relationships_migrated == self.relationships_found
    }
}

fn throughput(count: u64, timing: Option<&PhaseTiming>) -> f64 {
    match timing.and_then(PhaseTiming::elapsed_ms) {
        Some(ms) if ms > 0 => count as f64 * 1000.0 / ms as f64,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_marks_are_paired() {
        let mut counters = MigrationCounters::new();
        counters.mark_start(Phase::CountNodes);
        assert!(counters.timing(Phase::CountNodes).unwrap().finished_at.is_none());

        counters.mark_stop(Phase::CountNodes);
        let timing = counters.timing(Phase::CountNodes).unwrap();
        assert!(timing.finished_at.is_some());
        assert!(timing.elapsed_ms().unwrap() >= 0);
    }

    #[test]
    fn stop_without_start_is_ignored() {
        let mut counters = MigrationCounters::new();
        counters.mark_stop(Phase::Indices);
        assert!(counters.timings.is_empty());
    }

    #[test]
    fn complete_copy_requires_equal_counts() {
        let mut counters = MigrationCounters::new();
        counters.nodes_found = 2;
        counters.vertices_created = 2;
        assert!(counters.is_complete_copy());

        counters.relationships_found = 1;
        assert!(!counters.is_complete_copy());

        counters.relationships_migrated = 1;
        assert!(counters.is_complete_copy());
    }

    #[test]
    fn extra_edges_do_not_cover_a_dropped_relationship() {
        let mut counters = MigrationCounters::new();
        counters.relationships_found = 2;
        counters.relationships_migrated = 1;
        counters.edges_created = 2;
        assert!(!counters.is_complete_copy());
    }
}
