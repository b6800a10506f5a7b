//! Error types for configuration loading and validation

use thiserror::Error;

/// Result type alias for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while assembling the application configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An environment override was present but unparseable
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    /// The assembled configuration violates a structural invariant
    #[error("configuration validation failed: {0}")]
    Validation(String),
}
