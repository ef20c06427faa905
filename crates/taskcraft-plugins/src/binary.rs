//! Runs an external executable and captures its stdout, passing the job's
//! params through as environment variables; raises on a non-zero exit code.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use taskcraft_core::{Plugin, PluginError, PluginOutput};
use tokio::process::Command;

pub struct BinaryPlugin;

#[async_trait]
impl Plugin for BinaryPlugin {
    fn name(&self) -> &str {
        "binary"
    }

    async fn run(&self, params: &BTreeMap<String, Value>) -> Result<PluginOutput, PluginError> {
        let path = params
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| PluginError::invalid_params("missing required 'path'"))?;

        let args: Vec<String> = params
            .get("args")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        let mut cmd = Command::new(path);
        cmd.args(&args);
        for (key, value) in params {
            if key == "path" || key == "args" {
                continue;
            }
            if let Some(s) = value.as_str() {
                cmd.env(key, s);
            }
        }

        let output = cmd
            .output()
            .await
            .map_err(|e| PluginError::failed(format!("failed to spawn '{path}': {e}")))?;

        if !output.status.success() {
            return Err(PluginError::failed(format!(
                "'{path}' exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        Ok(PluginOutput::text(
            String::from_utf8_lossy(&output.stdout).to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_path_is_invalid_params() {
        let err = BinaryPlugin.run(&BTreeMap::new()).await.unwrap_err();
        assert!(matches!(err, PluginError::InvalidParams(_)));
    }

    #[tokio::test]
    async fn runs_true_successfully() {
        let mut params = BTreeMap::new();
        params.insert("path".to_string(), Value::String("/bin/true".into()));
        let out = BinaryPlugin.run(&params).await;
        assert!(out.is_ok());
    }
}
