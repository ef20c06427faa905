//! Engine configuration: logging, cache directory, default retry policy,
//! and runtime sizing. See [`crate::document`] for the separate job-document
//! format.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use schema::{EngineConfig, LogFormat, LoggingConfig, RetryConfig, RuntimeConfig};
pub use validation::validate_config;
