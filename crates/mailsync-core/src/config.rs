//! Configuration module for mailsync.
//!
//! Provides typed configuration structs that map to the YAML configuration
//! file, with loading, validation, and defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for mailsync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub scheduling: SchedulingConfig,
    pub registry: RegistryConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

/// Scheduling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingConfig {
    /// Seconds between daemon wake-ups to check for due accounts.
    pub tick_interval: u64,
    /// Whether to run a reconcile pass immediately on startup.
    pub reconcile_on_start: bool,
}

/// Account registry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Path to the registry file shared with the platform identity layer.
    pub path: PathBuf,
    /// Sync type tag identifying this application's registry entries.
    pub type_tag: String,
    /// Seconds a registry change must be quiet before triggering reconcile.
    pub debounce_delay: u64,
}

/// Provider store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite account database.
    pub db_path: PathBuf,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/mailsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("mailsync")
            .join("config.yaml")
    }
}

/// Platform-appropriate data directory for daemon state.
fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailsync")
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            tick_interval: 60,
            reconcile_on_start: true,
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: data_dir().join("registry.yaml"),
            type_tag: "com.enigmora.mailsync".to_string(),
            debounce_delay: 2,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: data_dir().join("mailsync.db"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
