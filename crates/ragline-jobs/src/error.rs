//! Error types for job and message store operations

use thiserror::Error;

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur against the job and message stores
///
/// A missing key is not an error: lookups return `Ok(None)`. `StoreError`
/// always means the backend itself misbehaved.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend unreachable or the command failed in transit
    #[error("store transport error: {0}")]
    Transport(String),

    /// The stored value could not be (de)serialized
    #[error("store serialization error: {0}")]
    Serialization(String),

    /// Chat id was never initialized (persistent message store only)
    #[error("unknown chat id: {0}")]
    UnknownChat(String),

    /// The admission queue was closed while submitting
    #[error("admission queue closed")]
    QueueClosed,

    /// The surrounding request context was cancelled mid-call
    #[error("store call cancelled")]
    Cancelled,
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        Self::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
