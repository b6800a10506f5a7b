//! Error types for embedding operations

use thiserror::Error;

/// Result type alias for embedding operations
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// Errors that can occur while generating embeddings
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Provider returned a non-success response
    #[error("embedding provider error: {0}")]
    Provider(String),

    /// Provider rejected the call for quota reasons (retried once already)
    #[error("embedding provider rate limited: {0}")]
    RateLimited(String),

    /// Transport failure talking to the provider
    #[error("embedding transport error: {0}")]
    Transport(String),

    /// Long-poll batch job failed terminally
    #[error("batch embedding job failed: {0}")]
    BatchJob(String),

    /// The enclosing request context was cancelled
    #[error("embedding call cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for EmbeddingError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}
