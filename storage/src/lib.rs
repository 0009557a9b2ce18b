pub mod schema;
pub mod store;
pub mod wal;

pub use schema::{ClassInfo, IndexInfo};
pub use store::{Edge, GraphStore, StoreError, Vertex, VertexScope};
