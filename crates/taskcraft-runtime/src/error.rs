//! Top-level runtime error, wrapping the engine, config, and document
//! errors a CLI invocation can surface.

use thiserror::Error;

use crate::config::ConfigError;
use taskcraft_core::EngineError;

/// Errors that can occur while running the engine end-to-end: loading the
/// job document, loading the engine's own configuration, or executing jobs.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("scheduler error: {0}")]
    Scheduler(String),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
