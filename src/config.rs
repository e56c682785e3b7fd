//! Configuration management for the backup rotator.
//!
//! Loads configuration from a TOML file; individual values can be overridden
//! on the command line. All values are validated before any work starts.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::utils::errors::{Result, RotatorError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    pub remote: RemoteConfig,

    #[serde(default)]
    pub retention: RetentionConfig,

    #[serde(default)]
    pub archive: ArchiveConfig,

    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Directory to back up
    pub path: PathBuf,

    /// Tag distinguishing this backup stream from others sharing the
    /// same remote folder (empty = untagged stream)
    #[serde(default)]
    pub prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Opaque transport destination, e.g. "offsite:backups/host01"
    pub destination: String,

    /// Delete pruned backups without asking
    #[serde(default)]
    pub auto_confirm: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Most recent backups kept unconditionally
    #[serde(default = "default_keep_daily")]
    pub keep_daily: u32,

    /// One backup kept per ISO week
    #[serde(default = "default_keep_weekly")]
    pub keep_weekly: u32,

    /// One backup kept per calendar month
    #[serde(default = "default_keep_monthly")]
    pub keep_monthly: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// gzip compression level (1-9)
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default values
fn default_keep_daily() -> u32 {
    7
}

fn default_keep_weekly() -> u32 {
    4
}

fn default_keep_monthly() -> u32 {
    6
}

fn default_compression_level() -> u32 {
    6
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            keep_daily: default_keep_daily(),
            keep_weekly: default_keep_weekly(),
            keep_monthly: default_keep_monthly(),
        }
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            compression_level: default_compression_level(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Create a default configuration; the source path and remote
    /// destination still have to be supplied on the command line.
    pub fn default() -> Self {
        Config {
            source: SourceConfig {
                path: PathBuf::new(),
                prefix: String::new(),
            },
            remote: RemoteConfig {
                destination: String::new(),
                auto_confirm: false,
            },
            retention: RetentionConfig::default(),
            archive: ArchiveConfig::default(),
            log: LogConfig::default(),
        }
    }

    /// Check the configuration surface before any side effect occurs.
    pub fn validate(&self) -> Result<()> {
        if self.remote.destination.trim().is_empty() {
            return Err(RotatorError::Config(
                "remote destination must not be empty".to_string(),
            ));
        }

        if !(1..=9).contains(&self.archive.compression_level) {
            return Err(RotatorError::Config(format!(
                "compression level must be between 1 and 9, got {}",
                self.archive.compression_level
            )));
        }

        if self.source.prefix.contains('/') {
            return Err(RotatorError::Config(format!(
                "prefix must not contain '/': {:?}",
                self.source.prefix
            )));
        }

        if !self.source.path.is_dir() {
            return Err(RotatorError::Config(format!(
                "source directory does not exist or is not a directory: {}",
                self.source.path.display()
            )));
        }

        Ok(())
    }
}
