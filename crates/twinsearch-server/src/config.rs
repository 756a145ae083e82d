//! Configuration management for the updater.
//!
//! Configuration is layered from three sources:
//! 1. Default values (hardcoded)
//! 2. Configuration file (YAML)
//! 3. Environment variables (override)
//!
//! Environment variables take precedence over config file values, which take
//! precedence over defaults.
//!
//! # Example
//!
//! ```ignore
//! use twinsearch_server::config::TwinsearchConfig;
//!
//! let config = TwinsearchConfig::load("twinsearch.yaml")?;
//! let updater = config.updater.to_updater_config();
//! ```

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use twinsearch_domain::MapperConfig;

use crate::updater::{RetryPolicy, UpdaterConfig};

const ENV_PREFIX: &str = "TWINSEARCH";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct TwinsearchConfig {
    /// Update pipeline settings
    #[serde(default)]
    pub updater: UpdaterSettings,

    /// Storage settings
    #[serde(default)]
    pub storage: StorageSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Update pipeline settings.
///
/// Overridable through `TWINSEARCH_UPDATER__<FIELD>`, for example
/// `TWINSEARCH_UPDATER__MAX_BATCH_SIZE=500`.
///
/// ```yaml
/// updater:
///   max_batch_size: 250
///   max_wait_ms: 1000
///   parallelism: 4
///   max_attempts: 5
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct UpdaterSettings {
    /// Maximum write models per bulk request
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Maximum time a batch waits for more items, in milliseconds
    #[serde(default = "default_max_wait_ms")]
    pub max_wait_ms: u64,

    /// Maximum bulk requests in flight
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,

    /// Attempts per item, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry, in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Upper bound for retry delays, in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Deadline for one bulk request, in milliseconds
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,

    /// Maximum nesting depth the mapper accepts
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for UpdaterSettings {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
            max_wait_ms: default_max_wait_ms(),
            parallelism: default_parallelism(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            store_timeout_ms: default_store_timeout_ms(),
            max_depth: default_max_depth(),
        }
    }
}

impl UpdaterSettings {
    pub fn to_updater_config(&self) -> UpdaterConfig {
        UpdaterConfig {
            max_batch_size: self.max_batch_size,
            max_wait: Duration::from_millis(self.max_wait_ms),
            parallelism: self.parallelism,
            retry: RetryPolicy {
                max_attempts: self.max_attempts,
                initial_backoff: Duration::from_millis(self.initial_backoff_ms),
                max_backoff: Duration::from_millis(self.max_backoff_ms),
            },
            store_timeout: Duration::from_millis(self.store_timeout_ms),
        }
    }

    pub fn to_mapper_config(&self) -> MapperConfig {
        MapperConfig::default().with_max_depth(self.max_depth)
    }
}

fn default_max_batch_size() -> usize {
    250
}

fn default_max_wait_ms() -> u64 {
    1000
}

fn default_parallelism() -> usize {
    4
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_backoff_ms() -> u64 {
    100
}

fn default_max_backoff_ms() -> u64 {
    10_000
}

fn default_store_timeout_ms() -> u64 {
    30_000
}

fn default_max_depth() -> usize {
    64
}

/// Storage backend settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StorageSettings {
    /// Storage backend type. Only "memory" ships with this crate.
    #[serde(default = "default_storage_backend")]
    pub backend: String,

    /// Largest accepted serialized document, in bytes
    #[serde(default = "default_max_document_bytes")]
    pub max_document_bytes: usize,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            max_document_bytes: default_max_document_bytes(),
        }
    }
}

fn default_storage_backend() -> String {
    "memory".to_string()
}

fn default_max_document_bytes() -> usize {
    twinsearch_storage::memory::DEFAULT_MAX_DOCUMENT_BYTES
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON format (true for production, false for development)
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl TwinsearchConfig {
    /// Load configuration from a YAML file with environment variable overrides.
    ///
    /// Environment variables are prefixed with `TWINSEARCH_` and use `__` as
    /// the nested key separator, e.g. `TWINSEARCH_UPDATER__PARALLELISM=8`
    /// overrides `updater.parallelism`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigLoadError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let config = Config::builder()
            .add_source(Config::try_from(&TwinsearchConfig::default())?)
            .add_source(File::from(path).format(FileFormat::Yaml))
            .add_source(env_source())
            .build()?;

        let loaded: TwinsearchConfig = config.try_deserialize()?;
        loaded.validate()?;

        Ok(loaded)
    }

    /// Load configuration from defaults and `TWINSEARCH_` env vars only.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let config = Config::builder()
            .add_source(Config::try_from(&TwinsearchConfig::default())?)
            .add_source(env_source())
            .build()?;

        let loaded: TwinsearchConfig = config.try_deserialize()?;
        loaded.validate()?;

        Ok(loaded)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        self.updater
            .to_updater_config()
            .validate()
            .map_err(|e| ConfigLoadError::Invalid {
                message: format!("updater: {e}"),
            })?;

        if self.updater.max_depth == 0 {
            return Err(ConfigLoadError::Invalid {
                message: "updater.max_depth must be greater than 0".to_string(),
            });
        }

        let valid_backends = ["memory"];
        if !valid_backends.contains(&self.storage.backend.as_str()) {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "storage.backend must be one of: {:?}, got: {}",
                    valid_backends, self.storage.backend
                ),
            });
        }

        if self.storage.max_document_bytes == 0 {
            return Err(ConfigLoadError::Invalid {
                message: "storage.max_document_bytes must be greater than 0".to_string(),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "logging.level must be one of: {:?}, got: {}",
                    valid_levels, self.logging.level
                ),
            });
        }

        Ok(())
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    #[serial]
    fn test_can_load_config_from_yaml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
updater:
  max_batch_size: 100
  max_wait_ms: 50
  parallelism: 2
  max_attempts: 3
  max_depth: 16

storage:
  backend: memory
  max_document_bytes: 4096

logging:
  level: debug
  json: true
"#
        )
        .unwrap();

        let config = TwinsearchConfig::load(file.path()).unwrap();

        assert_eq!(config.updater.max_batch_size, 100);
        assert_eq!(config.updater.max_wait_ms, 50);
        assert_eq!(config.updater.parallelism, 2);
        assert_eq!(config.updater.max_attempts, 3);
        assert_eq!(config.updater.max_depth, 16);
        // Unset keys keep their defaults
        assert_eq!(config.updater.initial_backoff_ms, 100);
        assert_eq!(config.storage.max_document_bytes, 4096);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    #[serial]
    fn test_can_override_config_with_env_vars() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
updater:
  max_batch_size: 100
  parallelism: 2
"#
        )
        .unwrap();

        std::env::set_var("TWINSEARCH_UPDATER__PARALLELISM", "8");
        std::env::set_var("TWINSEARCH_LOGGING__LEVEL", "warn");

        let config = TwinsearchConfig::load(file.path());

        std::env::remove_var("TWINSEARCH_UPDATER__PARALLELISM");
        std::env::remove_var("TWINSEARCH_LOGGING__LEVEL");

        let config = config.unwrap();
        assert_eq!(config.updater.parallelism, 8);
        assert_eq!(config.updater.max_batch_size, 100);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    #[serial]
    fn test_from_env_loads_defaults_with_env_overrides() {
        std::env::set_var("TWINSEARCH_UPDATER__MAX_BATCH_SIZE", "17");

        let config = TwinsearchConfig::from_env();

        std::env::remove_var("TWINSEARCH_UPDATER__MAX_BATCH_SIZE");

        let config = config.unwrap();
        assert_eq!(config.updater.max_batch_size, 17);
        assert_eq!(config.updater.parallelism, 4);
    }

    #[test]
    fn test_config_validation_catches_errors() {
        let cases: [(fn(&mut TwinsearchConfig), &str); 8] = [
            (|c: &mut TwinsearchConfig| c.updater.max_batch_size = 0, "max_batch_size"),
            (|c: &mut TwinsearchConfig| c.updater.parallelism = 0, "parallelism"),
            (|c: &mut TwinsearchConfig| c.updater.max_attempts = 0, "max_attempts"),
            (
                |c: &mut TwinsearchConfig| {
                    c.updater.initial_backoff_ms = 5_000;
                    c.updater.max_backoff_ms = 1_000;
                },
                "initial_backoff",
            ),
            (|c: &mut TwinsearchConfig| c.updater.max_depth = 0, "max_depth"),
            (|c: &mut TwinsearchConfig| c.storage.backend = "postgres".to_string(), "storage.backend"),
            (|c: &mut TwinsearchConfig| c.storage.max_document_bytes = 0, "max_document_bytes"),
            (|c: &mut TwinsearchConfig| c.logging.level = "verbose".to_string(), "logging.level"),
        ];

        for (mutate, expected) in cases {
            let mut config = TwinsearchConfig::default();
            mutate(&mut config);
            let err = config.validate().unwrap_err();
            assert!(
                err.to_string().contains(expected),
                "error {err} should mention {expected}"
            );
        }
    }

    #[test]
    fn test_invalid_config_returns_clear_error() {
        let err = TwinsearchConfig::load("/nonexistent/path/twinsearch.yaml").unwrap_err();
        assert!(matches!(err, ConfigLoadError::FileNotFound { .. }));
        assert!(err.to_string().contains("not found"));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "invalid: yaml: syntax: [").unwrap();
        let err = TwinsearchConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigLoadError::Load(_)));
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = TwinsearchConfig::default();
        assert!(config.validate().is_ok());

        let updater = config.updater.to_updater_config();
        assert_eq!(updater.max_batch_size, 250);
        assert_eq!(updater.max_wait, Duration::from_secs(1));
        assert_eq!(updater.parallelism, 4);
        assert_eq!(updater.retry.max_attempts, 5);
        assert_eq!(updater.store_timeout, Duration::from_secs(30));
        assert_eq!(config.updater.to_mapper_config().max_depth, 64);
        assert_eq!(config.storage.backend, "memory");
        assert_eq!(config.logging.level, "info");
    }
}
