//! Error types for document ingestion

use thiserror::Error;

/// Result type alias for ingestion operations
pub type IngestResult<T> = Result<T, IngestError>;

/// Errors that can occur while ingesting a document
#[derive(Error, Debug)]
pub enum IngestError {
    /// The file extension maps to no supported format
    #[error("unsupported content type: {0}")]
    Unsupported(String),

    /// The document could not be opened or parsed
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// Embedding a chunk batch failed
    #[error("embedding batch failed: {0}")]
    Embedding(#[from] ragline_embeddings::EmbeddingError),

    /// Upserting a chunk batch failed
    #[error("vector upsert failed: {0}")]
    Storage(#[from] ragline_vector_data::VectorDataError),

    /// Reading the spooled upload failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
