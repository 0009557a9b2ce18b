use crate::context::MigrationContext;
use crate::data::DataMigrator;
use crate::error::MigrationError;
use crate::schema::SchemaMigrator;
use crate::summary::MigrationSummary;
use crate::writer::DestinationGraphWriter;
use graphport_core::config::MigrationOptions;
use graphport_core::error::ClassifiedError;
use graphport_core::metrics::{MigrationCounters, Phase};
use graphport_core::progress::{LoggingProgressSink, ProgressSink};
use source::{DumpSourceGraph, SourceGraphReader};
use std::path::Path;
use std::sync::Arc;
use storage::GraphStore;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct MigrationResult {
    pub success: bool,
    pub counters: MigrationCounters,
    /// Message of the failure that ended the run, if any.
    pub error: Option<String>,
}

/// One-shot copy of a dump file into a fresh store, with default options.
pub async fn run_migration(
    source_location: impl AsRef<Path>,
    destination_location: impl AsRef<Path>,
    overwrite_if_exists: bool,
) -> MigrationResult {
    Migration::new(MigrationOptions::default())
        .run(source_location, destination_location, overwrite_if_exists)
        .await
}

/// Sequences a run: initialize, data pass, schema pass, finalize.
pub struct Migration {
    options: MigrationOptions,
    progress: Arc<dyn ProgressSink>,
}

impl Migration {
    pub fn new(options: MigrationOptions) -> Self {
        let progress: Arc<dyn ProgressSink> =
            Arc::new(LoggingProgressSink::new(options.progress_log_interval));
        Self { options, progress }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub async fn run(
        &self,
        source_location: impl AsRef<Path>,
        destination_location: impl AsRef<Path>,
        overwrite_if_exists: bool,
    ) -> MigrationResult {
        let source_location = source_location.as_ref();
        let destination_location = destination_location.as_ref();
        let mut counters = MigrationCounters::new();
        counters.mark_start(Phase::Initialize);

        info!("Opening source {}", source_location.display());
        let reader = match DumpSourceGraph::open(source_location) {
            Ok(reader) => reader,
            Err(err) => return abort(counters, err.into()),
        };

        info!("Creating destination {}", destination_location.display());
        let writer = match GraphStore::create(destination_location, overwrite_if_exists).await {
            Ok(writer) => writer,
            Err(err) => {
                if let Err(close_err) = reader.close() {
                    warn!("Closing source failed: {}", close_err);
                }
                return abort(counters, err.into());
            }
        };
        counters.mark_stop(Phase::Initialize);

        self.run_with(&reader, &writer, counters).await
    }

    /// Migrates between already opened collaborators and closes both of
    /// them, whatever the outcome.
    pub async fn run_with(
        &self,
        reader: &dyn SourceGraphReader,
        writer: &dyn DestinationGraphWriter,
        counters: MigrationCounters,
    ) -> MigrationResult {
        let mut ctx = MigrationContext::new(counters, self.options.clone(), self.progress.clone());
        let mut failure = migrate(reader, writer, &mut ctx).await.err();
        if let Some(err) = &failure {
            error!("Migration aborted [{}]: {}", err.error_code(), err);
        }

        ctx.counters.mark_start(Phase::Finalize);
        if let Err(err) = writer.close().await {
            error!("Closing destination failed: {}", err);
            failure.get_or_insert(err.into());
        }
        if let Err(err) = reader.close() {
            warn!("Closing source failed: {}", err);
        }
        ctx.counters.mark_stop(Phase::Finalize);

        let counters = ctx.into_counters();
        let success = failure.is_none();
        MigrationSummary::new(success, &counters).log();
        MigrationResult {
            success,
            counters,
            error: failure.map(|err| err.to_string()),
        }
    }
}

async fn migrate(
    reader: &dyn SourceGraphReader,
    writer: &dyn DestinationGraphWriter,
    ctx: &mut MigrationContext,
) -> Result<(), MigrationError> {
    let mut outcome = DataMigrator::new(reader, writer, ctx).run().await?;
    SchemaMigrator::new(reader, writer, ctx, &mut outcome.edge_class_resolver)
        .run()
        .await
}

fn abort(mut counters: MigrationCounters, err: MigrationError) -> MigrationResult {
    error!("Migration cannot start [{}]: {}", err.error_code(), err);
    counters.mark_stop(Phase::Initialize);
    MigrationResult {
        success: false,
        counters,
        error: Some(err.to_string()),
    }
}
