//! Storage abstraction for vector databases

pub mod mock;
pub mod qdrant;
pub mod traits;

pub use mock::MockVectorStore;
pub use qdrant::QdrantStore;
pub use traits::{SearchHit, VectorStore};
