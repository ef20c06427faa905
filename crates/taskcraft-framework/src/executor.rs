//! Isolated plugin dispatch with a per-attempt timeout and cancellation:
//! in-process plugins run on their own tokio task, which is aborted outright
//! on timeout; plugins referenced as `file:<path>` run as a real child
//! process via `tokio::process::Command`, killed outright on timeout.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;
use taskcraft_core::prelude::*;
use taskcraft_core::PluginOutput;
use tokio::process::Command;
use tokio::time::timeout;

use crate::registry::PluginRegistry;

/// How a job's `plugin` field resolves to an executable unit.
pub enum PluginRef {
    /// Looked up by name in the [`PluginRegistry`].
    Registered(String),
    /// An external executable, isolated in its own process.
    External(PathBuf),
}

impl PluginRef {
    /// Parses a job's `plugin` field. A `file:` prefix selects external
    /// process isolation; anything else is a registry lookup.
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix("file:") {
            Some(path) => Self::External(PathBuf::from(path)),
            None => Self::Registered(raw.to_string()),
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            PluginRef::Registered(name) => name.clone(),
            PluginRef::External(path) => path.display().to_string(),
        }
    }
}

/// Dispatches jobs to plugins with timeout enforcement.
pub struct PluginExecutor;

impl PluginExecutor {
    /// Runs `plugin_ref` against `params`, aborting if `timeout_secs` elapses
    /// (`None` means no timeout).
    pub async fn execute(
        registry: &PluginRegistry,
        plugin_ref: &PluginRef,
        params: BTreeMap<String, Value>,
        timeout_secs: Option<u64>,
    ) -> EngineResult<PluginOutput> {
        match plugin_ref {
            PluginRef::Registered(name) => {
                Self::execute_registered(registry, name, params, timeout_secs).await
            }
            PluginRef::External(path) => Self::execute_external(path, params, timeout_secs).await,
        }
    }

    async fn execute_registered(
        registry: &PluginRegistry,
        name: &str,
        params: BTreeMap<String, Value>,
        timeout_secs: Option<u64>,
    ) -> EngineResult<PluginOutput> {
        let plugin = registry
            .get(name)
            .ok_or_else(|| EngineError::PluginNotFound(name.to_string()))?;

        let task = tokio::task::spawn(async move { plugin.run(&params).await });
        let abort_handle = task.abort_handle();

        let joined = match timeout_secs {
            Some(secs) => match timeout(Duration::from_secs(secs), task).await {
                Ok(joined) => joined,
                Err(_) => {
                    abort_handle.abort();
                    return Err(EngineError::PluginTimeout {
                        plugin: name.to_string(),
                        seconds: secs,
                    });
                }
            },
            None => task.await,
        };

        let run_result = joined.map_err(|e| {
            EngineError::PluginExecution {
                plugin: name.to_string(),
                reason: format!("plugin task panicked or was aborted: {e}"),
            }
        })?;

        run_result.map_err(|e| EngineError::PluginExecution {
            plugin: name.to_string(),
            reason: e.to_string(),
        })
    }

    async fn execute_external(
        path: &PathBuf,
        params: BTreeMap<String, Value>,
        timeout_secs: Option<u64>,
    ) -> EngineResult<PluginOutput> {
        let name = path.display().to_string();
        let mut cmd = Command::new(path);
        for (k, v) in &params {
            let env_key = format!("TASKCRAFT_PARAM_{}", k.to_uppercase());
            cmd.env(env_key, value_to_env_string(v));
        }

        let run = async { cmd.output().await };

        let output = match timeout_secs {
            Some(secs) => match timeout(Duration::from_secs(secs), run).await {
                Ok(result) => result,
                Err(_) => {
                    return Err(EngineError::PluginTimeout {
                        plugin: name,
                        seconds: secs,
                    });
                }
            },
            None => run.await,
        }
        .map_err(|e| EngineError::PluginExternal(name.clone(), format!("failed to spawn: {e}")))?;

        if !output.status.success() {
            return Err(EngineError::PluginExternal(
                name,
                format!(
                    "exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr)
                ),
            ));
        }

        Ok(PluginOutput::text(
            String::from_utf8_lossy(&output.stdout).to_string(),
        ))
    }
}

fn value_to_env_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_external_reference() {
        match PluginRef::parse("file:/opt/plugins/thing.sh") {
            PluginRef::External(path) => assert_eq!(path, PathBuf::from("/opt/plugins/thing.sh")),
            _ => panic!("expected External"),
        }
    }

    #[test]
    fn parses_registered_reference() {
        match PluginRef::parse("echo") {
            PluginRef::Registered(name) => assert_eq!(name, "echo"),
            _ => panic!("expected Registered"),
        }
    }

    #[tokio::test]
    async fn plugin_not_found_is_reported() {
        let registry = PluginRegistry::new();
        let err = PluginExecutor::execute(
            &registry,
            &PluginRef::Registered("missing".into()),
            BTreeMap::new(),
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, EngineError::PluginNotFound(_)));
    }
}
