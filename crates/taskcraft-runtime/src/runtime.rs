//! Top-level entry point tying configuration, the loaded job document, the
//! plugin registry, and the scheduler together: a builder-style `new`/
//! `with_*`/`run_document`, plus signal-based shutdown via `tokio::select!`.

use std::path::Path;
use std::sync::Arc;

use taskcraft_core::ContainerRunner;
use taskcraft_framework::{CacheManager, HookManager, JobManager, PluginRegistry};
use tracing::info;

use crate::config::{validate_config, ConfigLoader, EngineConfig};
use crate::document::{load_document, validate_document};
use crate::error::RuntimeResult;
use crate::scheduler::Scheduler;

/// Owns every subsystem required to run a job document to completion.
pub struct Runtime {
    config: EngineConfig,
    registry: PluginRegistry,
    container_runner: Option<Arc<dyn ContainerRunner>>,
}

impl Runtime {
    /// Loads the engine's own configuration (file + environment overrides).
    pub fn new(config_search_dir: Option<&Path>) -> RuntimeResult<Self> {
        let mut loader = ConfigLoader::new().with_current_dir().with_user_config_dir();
        if let Some(dir) = config_search_dir {
            loader = loader.add_search_path(dir);
        }
        let config = loader.load()?;
        validate_config(&config)?;

        let mut registry = PluginRegistry::new();
        taskcraft_plugins::register_builtins(&mut registry);

        Ok(Self {
            config,
            registry,
            container_runner: Some(Arc::new(taskcraft_transport::ContainerDriver::new())),
        })
    }

    /// Registers a plugin available to jobs in this run.
    pub fn register_plugin(&mut self, plugin: Arc<dyn taskcraft_core::Plugin>) {
        self.registry.register(plugin);
    }

    /// Supplies the container backend used for jobs with a `container` block.
    pub fn with_container_runner(mut self, runner: Arc<dyn ContainerRunner>) -> Self {
        self.container_runner = Some(runner);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Mutable access to the logging section, so a caller (e.g. a CLI's
    /// `-v`/`--verbose` flag) can override the configured level before the
    /// subscriber is installed.
    pub fn logging_mut(&mut self) -> &mut crate::config::LoggingConfig {
        &mut self.config.logging
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Loads and validates a job document, then runs it to completion.
    pub async fn run_document(self, document_path: &Path) -> RuntimeResult<()> {
        let document = load_document(document_path)?;
        validate_document(&document, &self.registry)?;

        info!(
            jobs = document.jobs.len(),
            hooks = document.hooks.len(),
            "loaded job document"
        );

        let cache = Arc::new(CacheManager::open(&self.config.cache_dir)?);
        let hooks = Arc::new(HookManager::new(document.hooks));
        let manager = Arc::new(JobManager::new(
            document.jobs.clone(),
            hooks,
            Arc::new(self.registry),
            self.container_runner,
            cache,
        ));

        let scheduler = Scheduler::new(manager, document.jobs);

        tokio::select! {
            result = scheduler.run() => Ok(result?),
            _ = wait_for_shutdown_signal() => {
                info!("shutdown signal received, stopping");
                Ok(())
            }
        }
    }
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
            sigterm.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
