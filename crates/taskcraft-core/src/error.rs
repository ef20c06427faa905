//! The `EngineError` taxonomy.
//!
//! One variant per error kind the engine surfaces: document loading,
//! validation, plugin execution, container execution, job lifecycle, and
//! hook lookup. Component-level operations return `Result<T, EngineError>`;
//! only the CLI boundary wraps these in `anyhow`.

use thiserror::Error;

/// Result alias used throughout the engine.
pub type EngineResult<T> = Result<T, EngineError>;

/// Unified error type for the TaskCraft execution engine.
#[derive(Debug, Error)]
pub enum EngineError {
    // ── Document ────────────────────────────────────────────────────────
    /// The job document could not be parsed as YAML.
    #[error("failed to parse job document: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// The parsed document violates the top-level schema (`jobs` / `hooks`).
    #[error("document schema error: {0}")]
    Schema(String),

    /// The document file was empty or contained no recognizable data.
    #[error("no data found in job document")]
    NoData,

    // ── Validation ──────────────────────────────────────────────────────
    /// A job-level validation rule was violated.
    #[error("job validation failed: {0}")]
    JobValidation(String),

    /// A hook-level validation rule was violated.
    #[error("hook validation failed: {0}")]
    HookValidation(String),

    // ── Plugin ──────────────────────────────────────────────────────────
    /// No plugin is registered under the requested name.
    #[error("plugin '{0}' not found")]
    PluginNotFound(String),

    /// A plugin was registered but does not satisfy the plugin contract.
    #[error("plugin '{0}' does not implement the plugin contract: {1}")]
    PluginWrongInterface(String, String),

    /// A plugin's `run` returned an application-level error.
    #[error("plugin '{plugin}' failed: {reason}")]
    PluginExecution {
        /// Name of the failing plugin.
        plugin: String,
        /// Human-readable failure reason.
        reason: String,
    },

    /// A plugin dispatch exceeded its job's configured timeout.
    #[error("plugin '{plugin}' timed out after {seconds}s")]
    PluginTimeout {
        /// Name of the plugin that timed out.
        plugin: String,
        /// Configured timeout, in seconds.
        seconds: u64,
    },

    /// An external (`file:`) plugin process failed outside the plugin contract
    /// (failed to spawn, non-JSON output, non-zero exit with no structured error).
    #[error("external plugin '{0}' failed: {1}")]
    PluginExternal(String, String),

    // ── Container ───────────────────────────────────────────────────────
    /// The container driver itself failed (connection, spawn, API error).
    #[error("container driver error: {0}")]
    Container(String),

    /// The container ran but exited with a non-zero status.
    #[error("container exited with status {0}")]
    ContainerExec(i64),

    // ── Job ─────────────────────────────────────────────────────────────
    /// A referenced job id does not exist in the loaded document.
    #[error("job '{0}' not found")]
    JobNotFound(String),

    /// A job reached `ERROR` after exhausting its retries.
    #[error("job '{0}' failed")]
    JobFailed(String),

    /// The `exit` poison-pill plugin was invoked; propagates up to the Scheduler.
    #[error("job '{0}' requested engine termination")]
    JobKill(String),

    // ── Hook ────────────────────────────────────────────────────────────
    /// No hook of the requested type is registered.
    #[error("hook '{0}' not found")]
    HookNotFound(String),
}

impl EngineError {
    /// Shorthand for constructing a [`EngineError::JobValidation`].
    pub fn job_validation(msg: impl Into<String>) -> Self {
        Self::JobValidation(msg.into())
    }

    /// Shorthand for constructing a [`EngineError::HookValidation`].
    pub fn hook_validation(msg: impl Into<String>) -> Self {
        Self::HookValidation(msg.into())
    }

    /// Shorthand for constructing a [`EngineError::Schema`].
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }
}
