//! Shape of the engine's own configuration: logging, the on-disk cache
//! directory, default retry policy, and runtime worker-thread sizing.
//! Distinct from a job document (`jobs:`/`hooks:`), which describes *what*
//! to run rather than how the engine itself behaves.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Output format for the `tracing-subscriber` fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

impl Default for LogFormat {
    fn default() -> Self {
        Self::Pretty
    }
}

/// Logging configuration: filter level, output format, and an optional
/// rotated log file (stdout is always written to in addition, when no file
/// is set).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            file: None,
        }
    }
}

/// Default retry policy applied to jobs that don't declare their own.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub default_count: u32,
    pub default_interval: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            default_count: 0,
            default_interval: 5,
        }
    }
}

/// Tokio runtime sizing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Worker thread count; `None` defers to tokio's own CPU-count default.
    pub worker_threads: Option<usize>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
        }
    }
}

/// Top-level engine configuration, loaded by [`super::loader::ConfigLoader`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub logging: LoggingConfig,
    pub cache_dir: PathBuf,
    pub retry: RetryConfig,
    pub runtime: RuntimeConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            cache_dir: PathBuf::from(".cache"),
            retry: RetryConfig::default(),
            runtime: RuntimeConfig::default(),
        }
    }
}
