//! Prints a message to the log.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use taskcraft_core::{Plugin, PluginError, PluginOutput};
use tracing::info;

pub struct EchoPlugin;

#[async_trait]
impl Plugin for EchoPlugin {
    fn name(&self) -> &str {
        "echo"
    }

    async fn run(&self, params: &BTreeMap<String, Value>) -> Result<PluginOutput, PluginError> {
        let message = params
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Hello World!");
        info!(message, "echo");
        Ok(PluginOutput::text(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_message() {
        let out = EchoPlugin.run(&BTreeMap::new()).await.unwrap();
        match out {
            PluginOutput::Text(s) => assert_eq!(s, "Hello World!"),
            _ => panic!("expected text output"),
        }
    }

    #[tokio::test]
    async fn custom_message() {
        let mut params = BTreeMap::new();
        params.insert("message".to_string(), Value::String("hi there".into()));
        let out = EchoPlugin.run(&params).await.unwrap();
        match out {
            PluginOutput::Text(s) => assert_eq!(s, "hi there"),
            _ => panic!("expected text output"),
        }
    }
}
