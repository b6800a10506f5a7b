//! Error types for vector data storage operations

use thiserror::Error;

/// Result type alias for vector data operations
pub type VectorDataResult<T> = Result<T, VectorDataError>;

/// Errors that can occur during vector storage operations
#[derive(Error, Debug)]
pub enum VectorDataError {
    /// Collection/index operations failed
    #[error("collection operation failed: {0}")]
    Collection(String),

    /// Storage backend specific error
    #[error("storage error: {0}")]
    Storage(String),

    /// A batch arrived with mismatched chunk and vector counts
    #[error("batch mismatch: got {chunks} chunks but {vectors} vectors")]
    BatchMismatch { chunks: usize, vectors: usize },

    /// Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The enclosing request context was cancelled
    #[error("vector store call cancelled")]
    Cancelled,
}
