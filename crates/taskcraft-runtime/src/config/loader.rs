//! Loads [`EngineConfig`] from a YAML file layered with `TASKCRAFT_`-prefixed
//! environment variable overrides, via `figment`'s provider layering. Search
//! order: an explicit directory, then the current directory, then the user
//! config directory, stopping at the first candidate file name found.

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use tracing::{debug, info};

use super::error::ConfigResult;
use super::schema::EngineConfig;

const CANDIDATE_NAMES: &[&str] = &[
    "taskcraft.yaml",
    "taskcraft.yml",
    "config.yaml",
    "config.yml",
    ".taskcraft.yaml",
    ".taskcraft.yml",
];

/// Builds an [`EngineConfig`] from defaults, an optional config file, and the
/// process environment, in that overriding order.
pub struct ConfigLoader {
    search_paths: Vec<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            search_paths: Vec::new(),
        }
    }

    pub fn add_search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    pub fn with_current_dir(self) -> Self {
        match std::env::current_dir() {
            Ok(cwd) => self.add_search_path(cwd),
            Err(_) => self,
        }
    }

    pub fn with_user_config_dir(self) -> Self {
        match dirs::config_dir() {
            Some(dir) => self.add_search_path(dir.join("taskcraft")),
            None => self,
        }
    }

    /// Loads configuration from the first discovered file, falling back to
    /// defaults when none is found. Environment overrides always apply.
    pub fn load(&self) -> ConfigResult<EngineConfig> {
        match self.find_config_file() {
            Some(path) => self.load_from_file(&path),
            None => {
                info!("no configuration file found, using defaults");
                self.build(Figment::from(Serialized::defaults(EngineConfig::default())))
            }
        }
    }

    pub fn load_from_file(&self, path: &Path) -> ConfigResult<EngineConfig> {
        debug!(path = %path.display(), "loading engine configuration");
        let figment = Figment::from(Serialized::defaults(EngineConfig::default()))
            .merge(Yaml::file(path));
        self.build(figment)
    }

    fn build(&self, figment: Figment) -> ConfigResult<EngineConfig> {
        let figment = figment.merge(Env::prefixed("TASKCRAFT_").split("__"));
        Ok(figment.extract()?)
    }

    fn find_config_file(&self) -> Option<PathBuf> {
        self.search_paths.iter().find_map(|dir| {
            CANDIDATE_NAMES
                .iter()
                .map(|name| dir.join(name))
                .find(|path| path.is_file())
        })
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_nothing_found() {
        let loader = ConfigLoader::new();
        let config = loader.load().unwrap();
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn loads_from_explicit_file() {
        let dir = std::env::temp_dir().join(format!("taskcraft-cfg-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("taskcraft.yaml");
        std::fs::write(&path, "logging:\n  level: debug\n").unwrap();

        let config = ConfigLoader::new().load_from_file(&path).unwrap();
        assert_eq!(config.logging.level, "debug");
    }
}
