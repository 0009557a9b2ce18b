use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    /// JSON-lines export of the source graph.
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DestinationConfig {
    pub path: String,
    #[serde(default)]
    pub overwrite: bool,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct MigrationOptions {
    #[serde(default)]
    pub index_relationship_ids: bool,
    #[serde(default = "default_progress_log_interval")]
    pub progress_log_interval: u64,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            index_relationship_ids: false,
            progress_log_interval: default_progress_log_interval(),
        }
    }
}

fn default_progress_log_interval() -> u64 {
    10_000
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ReportConfig {
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub destination: DestinationConfig,
    #[serde(default)]
    pub migration: MigrationOptions,
    #[serde(default)]
    pub report: ReportConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(Environment::with_prefix("GRAPHPORT").separator("__"));

        builder.build()?.try_deserialize()
    }

    /// Load from one explicit file, still honouring environment overrides.
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("GRAPHPORT").separator("__"))
            .build()?
            .try_deserialize()
    }
}
