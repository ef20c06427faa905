//! The `ContainerRunner` contract implemented by the container transport.
//!
//! Mirrors [`crate::plugin::Plugin`]'s shape: a single async entry point the
//! job manager dispatches to, kept in `taskcraft-core` so neither
//! `taskcraft-framework` nor `taskcraft-transport` needs to depend on the
//! other — the runtime crate wires a concrete implementation into the job
//! manager as a trait object.

use async_trait::async_trait;

use crate::error::EngineResult;
use crate::model::JobContainer;
use crate::plugin::PluginOutput;

/// Runs a job's containerized work to completion and returns its captured
/// output, or an `EngineError::Container`/`ContainerExec` on failure.
#[async_trait]
pub trait ContainerRunner: Send + Sync {
    async fn run(
        &self,
        container: &JobContainer,
        params: &std::collections::BTreeMap<String, serde_json::Value>,
    ) -> EngineResult<PluginOutput>;
}
