pub mod dump;
pub mod memory;
pub mod reader;

pub use dump::DumpSourceGraph;
pub use memory::MemorySourceGraph;
pub use reader::{SourceError, SourceGraphReader};
