//! # taskcraft
//!
//! A lightweight, dependency-driven task and job orchestration engine:
//! jobs run plugins (in-process, external processes, or containers) on a
//! one-shot or cron schedule, fan out to dependants on success/failure, and
//! can be composed with `BEFORE_ALL`/`AFTER_ALL`/`BEFORE_JOB`/`AFTER_JOB`/
//! `ON_ERROR` lifecycle hooks.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use taskcraft::Runtime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = Runtime::new(None)?;
//!     runtime.run_document("jobs.yaml".as_ref()).await?;
//!     Ok(())
//! }
//! ```

pub use taskcraft_core::*;
pub use taskcraft_runtime::Runtime;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use taskcraft_core::{
        ContainerRunner, EngineError, EngineResult, Hook, HookType, Job, JobResult, JobStatus,
        Plugin, PluginError, PluginOutput,
    };
    pub use taskcraft_framework::{HookManager, JobManager, Outcome, PluginRegistry};
    pub use taskcraft_runtime::{Document, EngineConfig, Runtime, Scheduler};
}
