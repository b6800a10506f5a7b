//! Vector data storage for documents and the semantic cache
//!
//! This crate provides the document/chunk models, the [`VectorStore`]
//! contract, and the Qdrant backend used for both the document collection
//! and the semantic answer cache. A mock backend supports tests.

pub mod chunk;
pub mod error;
pub mod storage;

pub use chunk::{DocChunk, DocType, Document};
pub use error::{VectorDataError, VectorDataResult};
pub use storage::{MockVectorStore, QdrantStore, SearchHit, VectorStore};
