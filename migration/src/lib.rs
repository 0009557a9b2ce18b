pub mod context;
pub mod data;
pub mod error;
pub mod orchestrator;
pub mod resolver;
pub mod sampler;
pub mod schema;
pub mod summary;
pub mod type_mapper;
pub mod writer;

pub use error::MigrationError;
pub use orchestrator::{run_migration, Migration, MigrationResult};
pub use summary::MigrationSummary;
pub use writer::DestinationGraphWriter;
