//! Runs a job's container to completion and captures its logs: connect to
//! the configured engine's socket, create and start the container with the
//! job's templated params plus `container.env` as environment variables and
//! `container.volumes`/`user`/`privileged` on its host config, wait for it to
//! exit, collect its logs, and always remove it.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bollard::container::{
    Config, LogsOptions, RemoveContainerOptions, WaitContainerOptions,
};
use bollard::models::HostConfig;
use bollard::Docker;
use futures::StreamExt;
use serde_json::Value;
use taskcraft_core::{ContainerEngine, ContainerRunner, EngineError, EngineResult, JobContainer};
use taskcraft_core::PluginOutput;
use tracing::{info, warn};

/// Dials the Docker Engine API over the engine-appropriate unix socket.
/// Podman speaks the same API, so one client implementation serves both.
pub struct ContainerDriver;

impl ContainerDriver {
    pub fn new() -> Self {
        Self
    }

    fn connect(&self, engine: ContainerEngine) -> EngineResult<Docker> {
        let url = match engine {
            ContainerEngine::Docker => "unix:///var/run/docker.sock",
            ContainerEngine::Podman => "unix:///run/user/1000/podman/podman.sock",
        };
        Docker::connect_with_unix(url, 10, bollard::API_DEFAULT_VERSION)
            .map_err(|e| EngineError::Container(format!("cannot connect to {url}: {e}")))
    }
}

impl Default for ContainerDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContainerRunner for ContainerDriver {
    async fn run(
        &self,
        container: &JobContainer,
        params: &BTreeMap<String, Value>,
    ) -> EngineResult<PluginOutput> {
        let docker = self.connect(container.engine)?;

        let mut env: Vec<String> = params
            .iter()
            .map(|(k, v)| format!("{k}={}", value_to_env_string(v)))
            .collect();
        env.extend(container.env.iter().map(|(k, v)| format!("{k}={v}")));

        let host_config = HostConfig {
            binds: (!container.volumes.is_empty()).then(|| container.volumes.clone()),
            privileged: Some(container.privileged),
            ..Default::default()
        };

        let config = Config {
            image: Some(container.image.clone()),
            cmd: (!container.command.is_empty()).then(|| container.command.clone()),
            env: Some(env),
            user: container.user.clone(),
            host_config: Some(host_config),
            ..Default::default()
        };

        let created = docker
            .create_container::<String, _>(None, config)
            .await
            .map_err(|e| EngineError::Container(format!("failed to create container: {e}")))?;
        let container_id = created.id;

        let result = self.run_created(&docker, &container_id).await;

        if let Err(e) = docker
            .remove_container(
                &container_id,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await
        {
            warn!(container = %container_id, error = %e, "failed to remove container");
        }

        result
    }
}

impl ContainerDriver {
    async fn run_created(&self, docker: &Docker, container_id: &str) -> EngineResult<PluginOutput> {
        docker
            .start_container::<String>(container_id, None)
            .await
            .map_err(|e| EngineError::Container(format!("failed to start container: {e}")))?;

        let mut wait_stream = docker.wait_container(
            container_id,
            Some(WaitContainerOptions {
                condition: "not-running",
            }),
        );
        let mut exit_code = 0i64;
        while let Some(chunk) = wait_stream.next().await {
            match chunk {
                Ok(status) => exit_code = status.status_code,
                Err(e) => return Err(EngineError::Container(format!("wait failed: {e}"))),
            }
        }

        let mut logs_stream = docker.logs::<String>(
            container_id,
            Some(LogsOptions {
                stdout: true,
                stderr: true,
                ..Default::default()
            }),
        );
        let mut logs = String::new();
        while let Some(chunk) = logs_stream.next().await {
            match chunk {
                Ok(output) => logs.push_str(&output.to_string()),
                Err(e) => {
                    warn!(container = %container_id, error = %e, "failed reading container logs");
                    break;
                }
            }
        }

        info!(container = %container_id, exit_code, "container finished");

        if exit_code != 0 {
            return Err(EngineError::ContainerExec(exit_code));
        }

        Ok(PluginOutput::text(logs))
    }
}

fn value_to_env_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
