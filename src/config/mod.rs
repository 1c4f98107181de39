//! Configuration management for ClipKeep
//!
//! This module handles loading, validating, and managing configuration
//! for the clipboard watcher and history store.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading config file
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// Validation error
    #[error("Config validation failed: {0}")]
    Validation(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// History storage configuration
    #[serde(default)]
    pub history: HistoryConfig,

    /// Clipboard monitor configuration
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// History storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Path to the SQLite history database
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Maximum number of non-favorite items to retain
    #[serde(default = "default_cap")]
    pub cap: usize,

    /// Window in seconds during which identical content is not re-inserted
    #[serde(default = "default_dedup_window_secs")]
    pub dedup_window_secs: u64,
}

/// Clipboard monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Polling interval in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Directory where captured images are saved as PNG files
    #[serde(default = "default_images_dir")]
    pub images_dir: PathBuf,

    /// Text entries larger than this are skipped
    #[serde(default = "default_max_text_bytes")]
    pub max_text_bytes: usize,
}

// Default value functions
fn default_db_path() -> PathBuf {
    PathBuf::from("~/.local/share/clipkeep/history.db")
}

fn default_cap() -> usize {
    200
}

fn default_dedup_window_secs() -> u64 {
    60
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_images_dir() -> PathBuf {
    PathBuf::from("~/.local/share/clipkeep/images")
}

fn default_max_text_bytes() -> usize {
    crate::DEFAULT_MAX_TEXT_BYTES
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            cap: default_cap(),
            dedup_window_secs: default_dedup_window_secs(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            images_dir: default_images_dir(),
            max_text_bytes: default_max_text_bytes(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            history: HistoryConfig::default(),
            monitor: MonitorConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Checks in order:
    /// 1. Path from CLIPKEEP_CONFIG environment variable
    /// 2. ~/.config/clipkeep/config.toml
    /// 3. Falls back to defaults if none exists
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::find_config_path();

        if let Some(path) = config_path {
            Self::load_from_path(&path)
        } else {
            let mut config = Self::default();
            config.expand_paths();
            Ok(config)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Load configuration with optional explicit path
    pub fn load_config(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            Self::load_from_path(&path)
        } else {
            Self::load()
        }
    }

    /// Parse configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(toml_str)?;

        config.expand_paths();
        config.validate_config()?;

        Ok(config)
    }

    /// Find configuration file path
    fn find_config_path() -> Option<PathBuf> {
        // Check environment variable first
        if let Ok(path) = std::env::var("CLIPKEEP_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        dirs::config_dir()
            .map(|p| p.join("clipkeep").join("config.toml"))
            .filter(|p| p.exists())
    }

    /// Expand tilde in paths
    fn expand_paths(&mut self) {
        self.history.db_path = expand_path(&self.history.db_path);
        self.monitor.images_dir = expand_path(&self.monitor.images_dir);
    }

    /// Validate configuration values
    fn validate_config(&self) -> Result<(), ConfigError> {
        if self.history.cap < 1 {
            return Err(ConfigError::Validation(
                "history.cap must be at least 1".to_string(),
            ));
        }
        if self.history.cap > 10_000 {
            return Err(ConfigError::Validation(
                "history.cap must not exceed 10000".to_string(),
            ));
        }

        if self.monitor.poll_interval_ms < 100 {
            return Err(ConfigError::Validation(
                "monitor.poll_interval_ms must be at least 100".to_string(),
            ));
        }
        if self.monitor.poll_interval_ms > 10_000 {
            return Err(ConfigError::Validation(
                "monitor.poll_interval_ms must not exceed 10000".to_string(),
            ));
        }

        if self.monitor.max_text_bytes < 1 {
            return Err(ConfigError::Validation(
                "monitor.max_text_bytes must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Save configuration to default location
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| {
                ConfigError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "Could not find config directory",
                ))
            })?
            .join("clipkeep");

        std::fs::create_dir_all(&config_dir)?;

        let config_path = config_dir.join("config.toml");
        let toml_string = toml::to_string_pretty(self).map_err(|e| {
            ConfigError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;

        std::fs::write(config_path, toml_string)?;

        Ok(())
    }

    /// Generate example configuration file at the default location
    pub fn generate_example_config(force: bool) -> Result<(), ConfigError> {
        let example_content = Self::generate_example();

        let config_dir = dirs::config_dir()
            .ok_or_else(|| {
                ConfigError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "Could not find config directory",
                ))
            })?
            .join("clipkeep");

        std::fs::create_dir_all(&config_dir)?;
        let config_path = config_dir.join("config.toml");

        if !force && config_path.exists() {
            return Err(ConfigError::Validation(
                "Config file already exists. Use --force to overwrite.".to_string(),
            ));
        }

        std::fs::write(config_path, example_content)?;
        Ok(())
    }

    /// Generate example configuration content with comments
    pub fn generate_example() -> String {
        let config = Config::default();

        format!(
            r#"# ClipKeep Configuration File
# Location: ~/.config/clipkeep/config.toml

# Logging level (trace, debug, info, warn, error)
log_level = "{}"

# History storage settings
[history]
# Path to the SQLite history database
db_path = "{}"
# Maximum number of non-favorite items to retain
cap = {}
# Identical content copied again within this window is not re-inserted
dedup_window_secs = {}

# Clipboard monitor settings
[monitor]
# How often to poll the clipboard, in milliseconds
poll_interval_ms = {}
# Directory where captured images are saved
images_dir = "{}"
# Text entries larger than this many bytes are skipped
max_text_bytes = {}
"#,
            config.log_level,
            config.history.db_path.display(),
            config.history.cap,
            config.history.dedup_window_secs,
            config.monitor.poll_interval_ms,
            config.monitor.images_dir.display(),
            config.monitor.max_text_bytes,
        )
    }

    /// Validate configuration file at given path
    pub fn validate(path: &Path) -> Result<(), ConfigError> {
        Self::load_from_path(path).map(|_| ())
    }
}

/// Expand tilde in path
fn expand_path(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    let expanded = shellexpand::tilde(path_str.as_ref());
    PathBuf::from(expanded.into_owned())
}
