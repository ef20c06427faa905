//! Issues an HTTP request and captures its response body, with configurable
//! method/headers/body/timeout/retries; raises on a non-2xx status.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use taskcraft_core::{Plugin, PluginError, PluginOutput};

pub struct HttpFetchPlugin {
    client: reqwest::Client,
}

impl Default for HttpFetchPlugin {
    fn default() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Plugin for HttpFetchPlugin {
    fn name(&self) -> &str {
        "http_fetch"
    }

    async fn run(&self, params: &BTreeMap<String, Value>) -> Result<PluginOutput, PluginError> {
        let url = params
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| PluginError::invalid_params("missing required 'url'"))?;

        let method = params
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or("GET")
            .to_ascii_uppercase();
        let method = reqwest::Method::from_bytes(method.as_bytes())
            .map_err(|e| PluginError::invalid_params(format!("invalid method: {e}")))?;

        let timeout_secs = params.get("timeout").and_then(Value::as_u64).unwrap_or(30);

        let mut request = self
            .client
            .request(method, url)
            .timeout(Duration::from_secs(timeout_secs));

        if let Some(headers) = params.get("headers").and_then(Value::as_object) {
            for (key, value) in headers {
                if let Some(v) = value.as_str() {
                    request = request.header(key, v);
                }
            }
        }

        if let Some(body) = params.get("body").and_then(Value::as_str) {
            request = request.body(body.to_string());
        }

        let response = request
            .send()
            .await
            .map_err(|e| PluginError::failed(format!("request to '{url}' failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PluginError::failed(format!("failed reading response body: {e}")))?;

        if !status.is_success() {
            return Err(PluginError::failed(format!(
                "'{url}' returned {status}: {body}"
            )));
        }

        Ok(PluginOutput::text(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_url_is_invalid_params() {
        let err = HttpFetchPlugin::default()
            .run(&BTreeMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::InvalidParams(_)));
    }
}
