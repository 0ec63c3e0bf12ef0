//! Configuration management system for dirsync
//!
//! Configuration is layered: built-in defaults, then an optional YAML, TOML or
//! JSON file, then `DIRSYNC__*` environment variables. Command-line flags are
//! applied on top by the binary.
//!
//! # Examples
//!
//! ```rust
//! use dirsync_config::ConfigBuilder;
//!
//! let config = ConfigBuilder::new()
//!     .add_defaults()
//!     .add_source_file("dirsync.yaml")
//!     .add_env_prefix("DIRSYNC")
//!     .build()
//!     .expect("Failed to load configuration");
//!
//! println!("Delete missing: {}", config.sync.delete_missing);
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod builder;
pub mod error;
pub mod loader;

pub use builder::ConfigBuilder;
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;

/// Main configuration structure for dirsync
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Synchronization behaviour
    pub sync: SyncConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Synchronization behaviour
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Remove target entries that have no counterpart in the source
    pub delete_missing: bool,
    /// Plan only, change nothing
    pub dry_run: bool,
    /// Descend into symlinked directories instead of skipping them
    pub follow_symlinks: bool,
    /// Allowed modification time difference, in milliseconds, for two files
    /// of equal size to count as identical
    pub mtime_tolerance_ms: u64,
}

impl SyncConfig {
    /// Upper bound accepted for `mtime_tolerance_ms` (one day)
    pub const MAX_TOLERANCE_MS: u64 = 24 * 60 * 60 * 1000;

    /// Tolerance as a `Duration`
    pub fn mtime_tolerance(&self) -> Duration {
        Duration::from_millis(self.mtime_tolerance_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Enable JSON formatting
    pub json_format: bool,
    /// Enable colored output
    pub colored_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            colored_output: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.sync.delete_missing);
        assert!(!config.sync.dry_run);
        assert_eq!(config.sync.mtime_tolerance(), Duration::ZERO);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str("sync:\n  delete_missing: true\n").unwrap();
        assert!(config.sync.delete_missing);
        assert!(!config.sync.follow_symlinks);
        assert_eq!(config.logging, LoggingConfig::default());
    }
}
