//! # TaskCraft Core
//!
//! Data model and error taxonomy for the TaskCraft declarative task-orchestration
//! engine. This crate has no knowledge of scheduling, templating, or caching — it
//! only defines the shapes that those layers operate on.
//!
//! - [`model`]: `Job`, `Hook`, and their supporting types.
//! - [`plugin`]: the `Plugin` trait implemented by in-process job executors.
//! - [`error`]: the `EngineError` taxonomy shared across the workspace.

pub mod container;
pub mod error;
pub mod model;
pub mod plugin;

pub use container::ContainerRunner;
pub use error::{EngineError, EngineResult};
pub use model::{
    ContainerEngine, Hook, HookType, Job, JobContainer, JobResult, JobRetry, JobStatus,
};
pub use plugin::{Plugin, PluginError, PluginOutput};

/// Common imports for crates consuming `taskcraft-core`.
pub mod prelude {
    pub use super::container::ContainerRunner;
    pub use super::error::{EngineError, EngineResult};
    pub use super::model::{
        ContainerEngine, Hook, HookType, Job, JobContainer, JobResult, JobRetry, JobStatus,
    };
    pub use super::plugin::{Plugin, PluginError, PluginOutput};
}
