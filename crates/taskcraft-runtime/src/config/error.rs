//! Errors raised while loading or validating the engine's own configuration
//! (as opposed to a job document — see [`crate::document`]).

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading or validating [`super::schema::EngineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    ParseError(#[from] figment::Error),

    #[error("invalid configuration: {0}")]
    Validation(String),

    #[error("missing required configuration field: {0}")]
    MissingField(String),
}

impl ConfigError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField(field.into())
    }
}

/// Result type for engine configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
