use graphport_core::config::MigrationOptions;
use graphport_core::metrics::{MigrationCounters, Phase};
use graphport_core::progress::{ProgressEvent, ProgressSink};
use std::sync::Arc;

/// State threaded through every migrator of one run.
pub struct MigrationContext {
    pub counters: MigrationCounters,
    pub options: MigrationOptions,
    progress: Arc<dyn ProgressSink>,
}

impl MigrationContext {
    pub fn new(
        counters: MigrationCounters,
        options: MigrationOptions,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            counters,
            options,
            progress,
        }
    }

    pub fn emit(&self, phase: Phase, current: u64, total: u64) {
        self.progress.emit(ProgressEvent::new(phase, current, total));
    }

    pub fn into_counters(self) -> MigrationCounters {
        self.counters
    }
}
