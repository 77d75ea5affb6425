pub mod graph;
pub mod store;
pub mod time_serde;
pub mod vectors;

mod error;

pub use error::{Error, Result};
pub use graph::{GraphBuilder, GraphDelta, GraphEdge, GraphNode, GraphSnapshot};
pub use store::{FileGraphStore, GraphStore, MemoryGraphStore};
pub use vectors::{ScoredId, VectorEntry, VectorIndex, cosine_similarity};
