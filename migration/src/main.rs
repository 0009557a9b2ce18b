use anyhow::{bail, Context, Result};
use graphport_core::config::AppConfig;
use migration::{Migration, MigrationSummary};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    graphport_core::init_tracing();

    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::load_from(&path),
        None => AppConfig::load(),
    }
    .context("failed to load configuration")?;

    info!(
        "Migrating {} into {}",
        config.source.path, config.destination.path
    );
    let result = Migration::new(config.migration.clone())
        .run(
            &config.source.path,
            &config.destination.path,
            config.destination.overwrite,
        )
        .await;

    if let Some(path) = &config.report.path {
        MigrationSummary::new(result.success, &result.counters)
            .write_json(path)
            .with_context(|| format!("failed to write report to {}", path))?;
        info!("Report written to {}", path);
    }

    if !result.success {
        bail!(
            "migration failed: {}",
            result.error.unwrap_or_else(|| "unknown error".to_string())
        );
    }
    Ok(())
}
