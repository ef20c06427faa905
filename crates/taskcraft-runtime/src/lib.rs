//! Orchestration layer for the task engine: engine configuration, job
//! document loading and validation, structured logging setup, scheduling,
//! and the top-level `Runtime` that ties them together.
//!
//! ```ignore
//! use taskcraft_runtime::Runtime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut runtime = Runtime::new(None)?;
//!     runtime.run_document("jobs.yaml".as_ref()).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod scheduler;

pub use config::{ConfigError, ConfigLoader, ConfigResult, EngineConfig, LogFormat, LoggingConfig};
pub use document::{load_document, validate_document, Document};
pub use error::{RuntimeError, RuntimeResult};
pub use runtime::Runtime;
pub use scheduler::Scheduler;

// Re-export tracing for use by binaries built on this crate.
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use tracing::{debug, error, info, instrument, span, trace, warn, Level};
}
