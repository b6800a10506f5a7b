//! Error types for LLM generation

use thiserror::Error;

/// Result type alias for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;

/// Errors that can occur while generating an answer
#[derive(Error, Debug)]
pub enum LlmError {
    /// Provider returned a non-success response
    #[error("llm provider error: {0}")]
    Provider(String),

    /// Transport failure talking to the provider
    #[error("llm transport error: {0}")]
    Transport(String),

    /// The response carried no usable candidate text
    #[error("llm returned an empty response")]
    EmptyResponse,

    /// The enclosing request context was cancelled
    #[error("llm call cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}
