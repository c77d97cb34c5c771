use serde::{Deserialize, Serialize};
use std::fs;
use thiserror::Error;

use crate::counter::LIKE_COUNT_ATTRIBUTE;

/// Characters the router reads as captures or wildcards
const ROUTE_PATTERN_CHARS: [char; 4] = ['*', ':', '{', '}'];

/// Log configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LogConfig {
  /// Log file path, if not set, logs will be printed to stdout
  pub file: Option<String>,
  /// Log level, default is "info"
  #[serde(default = "default_log_level")]
  pub level: String,
}

fn default_log_level() -> String {
  "info".to_string()
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      file: None,
      level: default_log_level(),
    }
  }
}

/// Location of the single counter record
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct CounterConfig {
  /// Table holding the record
  pub table: String,
  /// Name of the partition key attribute
  pub key_name: String,
  /// Partition key value of the record
  pub record_id: String,
  /// Seed the record at startup when it does not exist yet
  pub provision: bool,
  /// Count written when seeding
  pub initial_count: i64,
}

impl Default for CounterConfig {
  fn default() -> Self {
    Self {
      table: "wallet-teaser".to_string(),
      key_name: "id".to_string(),
      record_id: "likes".to_string(),
      provision: false,
      initial_count: 0,
    }
  }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
  #[default]
  Memory,
  RocksDb,
}

/// Store configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
  pub backend: StoreBackend,
  /// Data directory, only used by the rocksdb backend
  pub path: String,
}

impl Default for StoreConfig {
  fn default() -> Self {
    Self {
      backend: StoreBackend::Memory,
      path: "data/likes".to_string(),
    }
  }
}

/// Service configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
  /// HTTP listening address
  #[serde(default = "default_server_addr")]
  pub server_addr: String,

  /// Path the counter is served on
  #[serde(default = "default_route")]
  pub route: String,

  /// Log configuration
  #[serde(default)]
  pub log: LogConfig,

  #[serde(default)]
  pub counter: CounterConfig,

  #[serde(default)]
  pub store: StoreConfig,
}

fn default_server_addr() -> String {
  "0.0.0.0:8080".to_string()
}

fn default_route() -> String {
  "/likes".to_string()
}

impl Default for Config {
  fn default() -> Self {
    Self {
      server_addr: default_server_addr(),
      route: default_route(),
      log: LogConfig::default(),
      counter: CounterConfig::default(),
      store: StoreConfig::default(),
    }
  }
}

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config file '{path}': {source}")]
  Read {
    path: String,
    source: std::io::Error,
  },

  #[error("failed to parse config: {0}")]
  Parse(#[from] toml::de::Error),

  #[error("invalid config: {0}")]
  Invalid(String),
}

impl Config {
  /// Load configuration from TOML file
  pub fn from_file(path: &str) -> Result<Self, ConfigError> {
    let config_str = fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_string(),
      source,
    })?;

    Self::parse_str(&config_str)
  }

  /// Parse and validate configuration from TOML text
  pub fn parse_str(config_str: &str) -> Result<Self, ConfigError> {
    let config: Config = toml::from_str(config_str)?;
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if !self.route.starts_with('/') {
      return Err(ConfigError::Invalid(format!(
        "route must start with '/', got '{}'",
        self.route
      )));
    }
    if self.route.contains(ROUTE_PATTERN_CHARS) {
      return Err(ConfigError::Invalid(format!(
        "route must be a literal path without any of {:?}, got '{}'",
        ROUTE_PATTERN_CHARS, self.route
      )));
    }

    let counter = &self.counter;
    for (name, value) in [
      ("counter.table", &counter.table),
      ("counter.key_name", &counter.key_name),
      ("counter.record_id", &counter.record_id),
    ] {
      if value.is_empty() {
        return Err(ConfigError::Invalid(format!("{} must not be empty", name)));
      }
    }

    // The key attribute is stamped into the record and would overwrite the count
    if counter.key_name == LIKE_COUNT_ATTRIBUTE {
      return Err(ConfigError::Invalid(format!(
        "counter.key_name must not be '{}'",
        LIKE_COUNT_ATTRIBUTE
      )));
    }

    if counter.initial_count < 0 {
      return Err(ConfigError::Invalid(
        "counter.initial_count must not be negative".to_string(),
      ));
    }

    Ok(())
  }
}
