//! The `Plugin` contract implemented by every in-process job executor.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Error surfaced by a [`Plugin::run`] implementation. Distinct from
/// [`crate::error::EngineError`] because plugins live outside the engine's own
/// crate boundary and should not need to depend on its full error taxonomy.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The plugin's own application logic failed.
    #[error("{0}")]
    Failed(String),

    /// A required parameter was missing or of the wrong type.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
}

impl PluginError {
    /// Shorthand for [`PluginError::Failed`].
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    /// Shorthand for [`PluginError::InvalidParams`].
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::InvalidParams(msg.into())
    }
}

/// The successful result of a plugin run. A plugin returns either a single
/// block of text (cached to one `stdout` file) or a map of named outputs
/// (cached to one file per key).
#[derive(Debug, Clone)]
pub enum PluginOutput {
    /// A single unkeyed text result.
    Text(String),
    /// Multiple named results, each separately addressable via
    /// `${result:<job_id>:<key>}`.
    Map(BTreeMap<String, String>),
}

impl PluginOutput {
    /// Convenience constructor for a plain-text result.
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }
}

/// An in-process job executor, looked up by name from a job's `plugin` field.
///
/// Implementations are expected to be stateless or internally synchronized:
/// the registry holds a single shared instance and may dispatch concurrent
/// calls to it from multiple jobs at once.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// The name jobs reference this plugin by.
    fn name(&self) -> &str;

    /// Runs the plugin against a job's resolved, templated parameters.
    async fn run(&self, params: &BTreeMap<String, Value>) -> Result<PluginOutput, PluginError>;
}
