//! The termination poison pill: a deliberate no-op. The job manager
//! recognizes the plugin name `exit` and stops dependant fan-out once it
//! succeeds.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use taskcraft_core::{Plugin, PluginError, PluginOutput};

pub struct ExitPlugin;

#[async_trait]
impl Plugin for ExitPlugin {
    fn name(&self) -> &str {
        "exit"
    }

    async fn run(&self, _params: &BTreeMap<String, Value>) -> Result<PluginOutput, PluginError> {
        Ok(PluginOutput::text(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_succeeds() {
        assert!(ExitPlugin.run(&BTreeMap::new()).await.is_ok());
    }
}
