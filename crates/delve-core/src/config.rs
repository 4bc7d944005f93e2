//! Configuration loading and typed config structures for the Delve server.
//!
//! The canonical configuration lives in `delve.yaml` at the project root.
//! Every section and every field is optional; omitted values fall back to
//! the defaults documented on each field.
//!
//! ```yaml
//! persistence:
//!   autosave_interval_secs: 60
//!   shutdown_deadline_ms: 3000
//!   retry_attempts: 3
//!   retry_delay_ms: 1000
//! storage:
//!   backend: dragonfly
//!   dragonfly_url: redis://localhost:6379
//! inventory:
//!   backpack_capacities: [50, 100, 200, 400, 800, 1600, 3200]
//!   unit_capacity: 30
//! logging:
//!   level: info
//!   json: false
//! ```

use std::path::Path;
use std::time::Duration;

use delve_db::{DEFAULT_KEY_PREFIX, RetryPolicy};
use delve_economy::{CapacityTable, DEFAULT_UNIT_CAPACITY, InventoryLimits};
use delve_structures::Catalog;
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but is not usable.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level server configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// Autosave, retry, and shutdown timing.
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Storage backend selection.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Inventory limits.
    #[serde(default)]
    pub inventory: InventoryConfig,

    /// Species, hatch durations, and income multipliers.
    #[serde(default)]
    pub catalog: Catalog,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ServerConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `DRAGONFLY_URL` overrides `storage.dragonfly_url`
    /// - `DELVE_STORAGE_BACKEND` overrides `storage.backend`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.storage.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.persistence.retry_attempts == 0 {
            return Err(invalid("persistence.retry_attempts must be at least 1"));
        }
        if self.persistence.autosave_interval_secs == 0 {
            return Err(invalid("persistence.autosave_interval_secs must be at least 1"));
        }
        if self.storage.key_prefix.is_empty() {
            return Err(invalid("storage.key_prefix must not be empty"));
        }
        self.catalog.validate().map_err(|reason| ConfigError::Invalid {
            reason: format!("catalog: {reason}"),
        })
    }

    /// Inventory limits for every player's ledger.
    pub fn inventory_limits(&self) -> InventoryLimits {
        InventoryLimits {
            backpack: self.inventory.backpack_capacities.clone(),
            unit_capacity: self.inventory.unit_capacity,
        }
    }
}

fn invalid(reason: &str) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.to_owned(),
    }
}

/// Autosave, retry, and shutdown timing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PersistenceConfig {
    /// Seconds between autosave passes.
    #[serde(default = "default_autosave_interval_secs")]
    pub autosave_interval_secs: u64,

    /// Overall budget for the shutdown flush, in milliseconds.
    #[serde(default = "default_shutdown_deadline_ms")]
    pub shutdown_deadline_ms: u64,

    /// Attempts per load or save, including the first.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Fixed delay between attempts, in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl PersistenceConfig {
    /// Interval between autosave passes.
    pub const fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs)
    }

    /// Overall budget for the shutdown flush.
    pub const fn shutdown_deadline(&self) -> Duration {
        Duration::from_millis(self.shutdown_deadline_ms)
    }

    /// Attempt-count retry policy for joins, leaves, and autosaves.
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.retry_attempts,
            delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            autosave_interval_secs: default_autosave_interval_secs(),
            shutdown_deadline_ms: default_shutdown_deadline_ms(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

/// Which storage backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process map; records are lost on exit.
    #[default]
    Memory,
    /// `Dragonfly` (Redis-compatible) at `dragonfly_url`.
    Dragonfly,
}

impl std::str::FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "dragonfly" => Ok(Self::Dragonfly),
            other => Err(ConfigError::Invalid {
                reason: format!("unknown storage backend {other:?}"),
            }),
        }
    }
}

/// Storage backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// Backend kind.
    #[serde(default)]
    pub backend: BackendKind,

    /// `Dragonfly` connection URL.
    #[serde(default = "default_dragonfly_url")]
    pub dragonfly_url: String,

    /// Prefix for every record key.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl StorageConfig {
    /// Override storage settings with environment variables when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `DELVE_STORAGE_BACKEND` names an
    /// unknown backend.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var("DRAGONFLY_URL") {
            self.dragonfly_url = val;
        }
        if let Ok(val) = std::env::var("DELVE_STORAGE_BACKEND") {
            self.backend = val.parse()?;
        }
        Ok(())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            dragonfly_url: default_dragonfly_url(),
            key_prefix: default_key_prefix(),
        }
    }
}

/// Inventory limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InventoryConfig {
    /// Backpack capacity per level, starting at level 1. Must be
    /// non-empty and non-decreasing.
    #[serde(default)]
    pub backpack_capacities: CapacityTable,

    /// Maximum units a player may hold.
    #[serde(default = "default_unit_capacity")]
    pub unit_capacity: u32,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            backpack_capacities: CapacityTable::default(),
            unit_capacity: default_unit_capacity(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// =========================================================================
// Default value functions
// =========================================================================

const fn default_autosave_interval_secs() -> u64 {
    60
}

const fn default_shutdown_deadline_ms() -> u64 {
    3000
}

const fn default_retry_attempts() -> u32 {
    delve_db::DEFAULT_RETRY_ATTEMPTS
}

const fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_dragonfly_url() -> String {
    String::from("redis://localhost:6379")
}

fn default_key_prefix() -> String {
    String::from(DEFAULT_KEY_PREFIX)
}

const fn default_unit_capacity() -> u32 {
    DEFAULT_UNIT_CAPACITY
}

fn default_log_level() -> String {
    String::from("info")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use delve_types::Rarity;

    use super::*;

    #[test]
    fn empty_yaml_gives_defaults() {
        let config = ServerConfig::parse("").unwrap();
        assert_eq!(config.persistence.autosave_interval_secs, 60);
        assert_eq!(config.persistence.shutdown_deadline_ms, 3000);
        assert_eq!(config.persistence.retry_attempts, 3);
        assert_eq!(config.inventory.unit_capacity, 30);
        assert_eq!(config.inventory_limits().backpack.capacity(1), 50);
        assert_eq!(config.storage.key_prefix, "delve:player");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = ServerConfig::parse(
            r"
persistence:
  autosave_interval_secs: 15
inventory:
  backpack_capacities: [10, 20]
",
        )
        .unwrap();
        assert_eq!(config.persistence.autosave_interval_secs, 15);
        assert_eq!(config.persistence.retry_delay_ms, 1000);
        assert_eq!(config.inventory_limits().backpack.capacity(2), 20);
        assert_eq!(config.inventory_limits().backpack.capacity(9), 20);
        assert_eq!(config.persistence.autosave_interval(), Duration::from_secs(15));
    }

    #[test]
    fn decreasing_capacities_are_rejected() {
        let result = ServerConfig::parse(
            r"
inventory:
  backpack_capacities: [100, 50]
",
        );
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn zero_retry_attempts_is_invalid() {
        let result = ServerConfig::parse(
            r"
persistence:
  retry_attempts: 0
",
        );
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn catalog_missing_rarity_is_invalid() {
        let result = ServerConfig::parse(
            r"
catalog:
  hatch_seconds:
    Common: 30
",
        );
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn catalog_override_applies() {
        let config = ServerConfig::parse(
            r"
catalog:
  hatch_seconds:
    Common: 5
    Uncommon: 10
    Rare: 20
    Epic: 40
    Legendary: 80
    Mythic: 160
",
        )
        .unwrap();
        assert_eq!(config.catalog.hatch_duration(Rarity::Common), 5);
        assert_eq!(config.catalog.hatch_duration(Rarity::Mythic), 160);
    }

    #[test]
    fn backend_kind_parses() {
        assert_eq!("Dragonfly".parse::<BackendKind>().unwrap(), BackendKind::Dragonfly);
        assert_eq!(" memory ".parse::<BackendKind>().unwrap(), BackendKind::Memory);
        assert!("postgres".parse::<BackendKind>().is_err());
    }

    #[test]
    fn retry_policy_from_config() {
        let config = PersistenceConfig::default();
        assert_eq!(
            config.retry_policy(),
            RetryPolicy {
                attempts: 3,
                delay: Duration::from_secs(1),
            }
        );
    }
}
