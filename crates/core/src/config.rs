//! Configuration for the intake pipeline.
//!
//! Config priority: explicit path (--config) > user (~/.config/intake/config.toml) > defaults.
//!
//! All sections use `#[serde(default)]` so a config file only needs to name
//! the values it overrides.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use serde::{Deserialize, Serialize};
use tracing::warn;

// ============================================================================
// Filter Configuration
// ============================================================================

/// Event filter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
  /// Ignore repeat events for the same path within this window, in
  /// milliseconds (default: 2000)
  pub event_ignore_ms: u64,

  /// How often the debounce ledger is pruned, and how old an entry must be
  /// to be pruned, in milliseconds (default: 10000)
  pub cleanup_interval_ms: u64,

  /// Filename prefixes excluded from create handling. Editors and file
  /// managers doing atomic replaces write through temp files with these
  /// prefixes.
  pub temp_prefixes: Vec<String>,
}

impl Default for FilterConfig {
  fn default() -> Self {
    Self {
      event_ignore_ms: 2000,
      cleanup_interval_ms: 10_000,
      temp_prefixes: vec![".goutputstream-".to_string()],
    }
  }
}

impl FilterConfig {
  /// Debounce window as a `Duration`
  pub fn event_ignore(&self) -> Duration {
    Duration::from_millis(self.event_ignore_ms)
  }

  /// Ledger cleanup horizon as a `Duration`
  pub fn cleanup_interval(&self) -> Duration {
    Duration::from_millis(self.cleanup_interval_ms)
  }
}

// ============================================================================
// Completion Configuration
// ============================================================================

/// Completion detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
  /// Interval between size readings, in milliseconds (default: 1000)
  pub poll_interval_ms: u64,

  /// Overall budget for a single completion check, in milliseconds
  /// (default: 60000). A file that never stabilizes within this window
  /// counts as incomplete.
  pub check_timeout_ms: u64,

  /// How many times an incomplete file is re-queued before being dropped
  /// (default: 3)
  pub max_retries: u32,

  /// Number of completion workers pulling from the staging queue
  /// (default: 10)
  pub workers: usize,
}

impl Default for CompletionConfig {
  fn default() -> Self {
    Self {
      poll_interval_ms: 1000,
      check_timeout_ms: 60_000,
      max_retries: 3,
      workers: 10,
    }
  }
}

impl CompletionConfig {
  /// Polling interval as a `Duration`
  pub fn poll_interval(&self) -> Duration {
    Duration::from_millis(self.poll_interval_ms)
  }

  /// Per-check timeout as a `Duration`
  pub fn check_timeout(&self) -> Duration {
    Duration::from_millis(self.check_timeout_ms)
  }
}

// ============================================================================
// Daemon Configuration
// ============================================================================

/// Process-level settings consumed by the binary, not the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
  /// Log level: "off", "error", "warn", "info", "debug", "trace"
  /// Default: "info"
  pub log_level: String,

  /// Log file rotation: "daily", "hourly", "never"
  /// Default: "daily"
  pub log_rotation: String,
}

impl Default for DaemonConfig {
  fn default() -> Self {
    Self {
      log_level: "info".to_string(),
      log_rotation: "daily".to_string(),
    }
  }
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Full intake configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  pub filter: FilterConfig,
  pub completion: CompletionConfig,
  pub daemon: DaemonConfig,
}

impl Config {
  /// Path of the user config file (~/.config/intake/config.toml)
  pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("intake").join("config.toml"))
  }

  /// Load configuration from an explicit file.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  /// Resolve the effective configuration.
  ///
  /// An explicit path must load cleanly. A user config is optional, and a
  /// malformed one is skipped with a warning rather than blocking startup.
  pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
    if let Some(path) = explicit {
      return Self::load(path);
    }

    match Self::user_config_path() {
      Some(path) if path.exists() => match Self::load(&path) {
        Ok(config) => Ok(config),
        Err(e) => {
          warn!(error = %e, "Ignoring malformed user config");
          Ok(Self::default())
        }
      },
      _ => Ok(Self::default()),
    }
  }
}

/// Errors loading a config file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("Failed to read config {}: {source}", path.display())]
  Read {
    path: PathBuf,
    source: std::io::Error,
  },

  #[error("Failed to parse config {}: {source}", path.display())]
  Parse {
    path: PathBuf,
    source: toml::de::Error,
  },
}
