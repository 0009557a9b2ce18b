use chrono::{DateTime, Utc};
use graphport_core::metrics::MigrationCounters;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("report serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    pub category: &'static str,
    pub found: u64,
    pub imported: u64,
}

impl SummaryRow {
    pub fn is_complete(&self) -> bool {
        self.imported == self.found
    }
}

/// Found-versus-imported view of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationSummary {
    pub success: bool,
    pub generated_at: DateTime<Utc>,
    pub rows: Vec<SummaryRow>,
    pub vertices_per_second: f64,
    pub edges_per_second: f64,
    pub counters: MigrationCounters,
}

impl MigrationSummary {
    pub fn new(success: bool, counters: &MigrationCounters) -> Self {
        let rows = vec![
            SummaryRow {
                category: "nodes",
                found: counters.nodes_found,
                imported: counters.vertices_created,
            },
            SummaryRow {
                category: "relationships",
                found: counters.relationships_found,
                imported: counters.relationships_migrated,
            },
            SummaryRow {
                category: "unique constraints",
                found: counters.unique_constraints_found,
                imported: counters.constraints_created,
            },
            SummaryRow {
                category: "indices",
                found: counters
                    .indices_found
                    .saturating_sub(counters.constraint_indices_skipped),
                imported: counters.indices_created,
            },
        ];

        Self {
            success,
            generated_at: Utc::now(),
            rows,
            vertices_per_second: counters.vertices_per_second(),
            edges_per_second: counters.edges_per_second(),
            counters: counters.clone(),
        }
    }

    pub fn row(&self, category: &str) -> Option<&SummaryRow> {
        self.rows.iter().find(|row| row.category == category)
    }

    pub fn log(&self) {
        info!("Migration {}", if self.success { "finished" } else { "failed" });
        info!("  {:<20} {:>12} {:>12}", "", "found", "imported");
        for row in &self.rows {
            info!("  {:<20} {:>12} {:>12}", row.category, row.found, row.imported);
        }

        let c = &self.counters;
        info!(
            "  nodes without label: {}, with multiple labels: {}",
            c.nodes_without_label, c.nodes_with_multiple_labels
        );
        info!(
            "  classes created: {} vertex, {} edge; internal indices: {}",
            c.vertex_classes_created, c.edge_classes_created, c.internal_indices_created
        );
        info!(
            "  throughput: {:.1} vertices/s, {:.1} edges/s",
            self.vertices_per_second, self.edges_per_second
        );

        if c.vertex_failures + c.edge_failures + c.relationships_missing_endpoint > 0 {
            warn!(
                "  {} vertex failures, {} edge failures, {} relationships without endpoint",
                c.vertex_failures, c.edge_failures, c.relationships_missing_endpoint
            );
        }
        if c.not_unique_fallbacks > 0 {
            warn!(
                "  {} unique constraints fell back to not-unique indices",
                c.not_unique_fallbacks
            );
        }
        if c.existence_constraints_skipped > 0 {
            info!(
                "  {} existence constraints not enforced",
                c.existence_constraints_skipped
            );
        }
        if c.inferred_default_types > 0 {
            info!(
                "  {} property types defaulted to STRING",
                c.inferred_default_types
            );
        }
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ReportError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}
