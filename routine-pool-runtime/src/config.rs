use config::{Config, ConfigError, File, FileFormat};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::PoolError;
use crate::worker::{DEFAULT_MIN_WAIT, DEFAULT_WAIT};

/// `[pool]` section of a configuration file.
///
/// ```toml
/// [pool]
/// worker_count = 4
/// default_wait_ms = 33
/// min_wait_ms = 1
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Defaults to the number of available CPUs.
    pub worker_count: Option<usize>,
    pub default_wait_ms: u64,
    pub min_wait_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            worker_count: None,
            default_wait_ms: DEFAULT_WAIT.as_millis() as u64,
            min_wait_ms: DEFAULT_MIN_WAIT.as_millis() as u64,
        }
    }
}

impl PoolConfig {
    /// Read the `pool` section; a missing section yields the defaults.
    pub fn from_config(config: &Config) -> Result<Self, PoolError> {
        match config.get::<PoolConfig>("pool") {
            Ok(pool) => Ok(pool),
            Err(ConfigError::NotFound(_)) => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn default_wait(&self) -> Duration {
        Duration::from_millis(self.default_wait_ms)
    }

    pub fn min_wait(&self) -> Duration {
        Duration::from_millis(self.min_wait_ms)
    }
}

fn load_config<P: AsRef<Path>>(path: P, format: FileFormat) -> Result<Config, PoolError> {
    let config = Config::builder()
        .add_source(File::from(path.as_ref()).format(format))
        .add_source(
            config::Environment::with_prefix("ROUTINE_POOL")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;
    Ok(config)
}

/// Load config from a specific TOML file, overridden by `ROUTINE_POOL_*` variables
pub fn load_toml_config<P: AsRef<Path>>(path: P) -> Result<Config, PoolError> {
    load_config(path, FileFormat::Toml)
}

/// Load config from a specific YAML file, overridden by `ROUTINE_POOL_*` variables
pub fn load_yaml_config<P: AsRef<Path>>(path: P) -> Result<Config, PoolError> {
    load_config(path, FileFormat::Yaml)
}

/// Resolve config placeholder like ${app.interval} or ${app.interval:default}
pub fn resolve_config_value(value: &str, config: &Config) -> Result<String, PoolError> {
    let Some(inner) = value.strip_prefix("${").and_then(|v| v.strip_suffix('}')) else {
        return Ok(value.to_string());
    };

    // ${app.interval:10}
    if let Some((key, default_value)) = inner.split_once(':') {
        match config.get_string(key) {
            Ok(resolved) => Ok(resolved),
            Err(_) => Ok(default_value.to_string()),
        }
    } else {
        Ok(config.get_string(inner)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toml(source: &str) -> Config {
        Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()
            .unwrap()
    }

    #[test]
    fn literal_values_pass_through() {
        let config = Config::default();
        assert_eq!(resolve_config_value("250ms", &config).unwrap(), "250ms");
    }

    #[test]
    fn placeholders_resolve_with_defaults() {
        let config = toml("[app]\ninterval = \"2s\"\n");
        assert_eq!(resolve_config_value("${app.interval}", &config).unwrap(), "2s");
        assert_eq!(resolve_config_value("${app.missing:10}", &config).unwrap(), "10");
        assert!(resolve_config_value("${app.missing}", &config).is_err());
    }

    #[test]
    fn pool_section_is_optional() {
        let config = toml("[app]\nname = \"x\"\n");
        assert_eq!(PoolConfig::from_config(&config).unwrap(), PoolConfig::default());
    }

    #[test]
    fn pool_section_overrides_defaults() {
        let config = toml("[pool]\nworker_count = 3\ndefault_wait_ms = 50\n");
        let pool = PoolConfig::from_config(&config).unwrap();
        assert_eq!(pool.worker_count, Some(3));
        assert_eq!(pool.default_wait(), Duration::from_millis(50));
        assert_eq!(pool.min_wait(), DEFAULT_MIN_WAIT);
    }
}
