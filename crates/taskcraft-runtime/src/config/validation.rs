//! Validation of a loaded [`EngineConfig`]: whitelist checks on its handful
//! of scalar fields (log level, cache directory, worker counts).

use super::error::{ConfigError, ConfigResult};
use super::schema::EngineConfig;

const VALID_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

pub fn validate_config(config: &EngineConfig) -> ConfigResult<()> {
    validate_log_level(&config.logging.level)?;
    if config.cache_dir.as_os_str().is_empty() {
        return Err(ConfigError::validation("cache_dir must not be empty"));
    }
    Ok(())
}

fn validate_log_level(level: &str) -> ConfigResult<()> {
    let base = level.split(',').next().unwrap_or(level);
    let base = base.split('=').last().unwrap_or(base);
    if VALID_LEVELS.contains(&base) {
        Ok(())
    } else {
        Err(ConfigError::validation(format!(
            "invalid log level '{level}', expected one of {VALID_LEVELS:?}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_default_config() {
        assert!(validate_config(&EngineConfig::default()).is_ok());
    }

    #[test]
    fn rejects_unknown_log_level() {
        let mut config = EngineConfig::default();
        config.logging.level = "verbose".into();
        assert!(validate_config(&config).is_err());
    }
}
