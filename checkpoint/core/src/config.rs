//! TOML Configuration File Support
//!
//! Checkpoint settings can come from `$XDG_CONFIG_HOME/ckpt/checkpoint.toml`,
//! the environment, and the command line.
//!
//! # Configuration Priority
//!
//! Values are applied with the following priority (highest first):
//! 1. CLI arguments (via [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [checkpoint]
//! interval = 10
//! actions = ["dot", "ttyout=%{%H:%M:%S}t %u%*\\r"]
//!
//! [archive]
//! blocking_factor = 20
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stats::DEFAULT_BLOCKING_FACTOR;

/// Interval applied when actions are given without one
pub const DEFAULT_CHECKPOINT: u64 = 10;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// `[checkpoint]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointToml {
    /// Fire every N archive operations
    pub interval: Option<u64>,

    /// Action specifiers, in execution order
    pub actions: Option<Vec<String>>,
}

/// `[archive]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveToml {
    /// Blocks per record
    pub blocking_factor: Option<u64>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigToml {
    /// Checkpoint section
    pub checkpoint: CheckpointToml,

    /// Archive section
    pub archive: ArchiveToml,
}

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Resolved checkpoint configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckpointConfig {
    /// Checkpoint interval; `None` leaves checkpointing off unless actions
    /// are given
    pub interval: Option<u64>,

    /// Action specifiers, in execution order
    pub actions: Vec<String>,

    /// Blocks per record
    pub blocking_factor: u64,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    source: ConfigSource,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            interval: None,
            actions: Vec::new(),
            blocking_factor: DEFAULT_BLOCKING_FACTOR,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl CheckpointConfig {
    /// Get the highest-priority source that contributed a value
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// [`ConfigError::ValidationError`] for a zero blocking factor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.blocking_factor == 0 {
            return Err(ConfigError::ValidationError(
                "blocking_factor must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/ckpt/checkpoint.toml` when a config directory is
/// known.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("ckpt").join("checkpoint.toml"))
}

/// Load configuration from the default path
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be read or parsed.
pub fn load_config() -> Result<CheckpointConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// A missing file is not an error; defaults and environment variables apply.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read, parsed or
/// validated.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<CheckpointConfig, ConfigError> {
    let mut config = CheckpointConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: ConfigToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config);
    config.validate()?;

    Ok(config)
}

fn apply_toml_config(config: &mut CheckpointConfig, toml: &ConfigToml) {
    if let Some(interval) = toml.checkpoint.interval {
        config.interval = Some(interval);
    }
    if let Some(ref actions) = toml.checkpoint.actions {
        config.actions.clone_from(actions);
    }
    if let Some(factor) = toml.archive.blocking_factor {
        config.blocking_factor = factor;
    }
}

fn apply_env_config(config: &mut CheckpointConfig) {
    if let Ok(interval) = std::env::var("CKPT_CHECKPOINT") {
        if let Ok(n) = interval.parse::<u64>() {
            config.interval = Some(n);
            config.source = ConfigSource::Env;
        }
    }
    if let Ok(factor) = std::env::var("CKPT_BLOCKING_FACTOR") {
        if let Ok(n) = factor.parse::<u64>() {
            config.blocking_factor = n;
            config.source = ConfigSource::Env;
        }
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Interval override
    pub interval: Option<u64>,

    /// Actions override; replaces the configured list when non-empty
    pub actions: Vec<String>,

    /// Blocking factor override
    pub blocking_factor: Option<u64>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set interval override
    #[must_use]
    pub fn with_interval(mut self, interval: u64) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Add an action specifier
    #[must_use]
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.actions.push(action.into());
        self
    }

    /// Set blocking factor override
    #[must_use]
    pub fn with_blocking_factor(mut self, factor: u64) -> Self {
        self.blocking_factor = Some(factor);
        self
    }

    /// Apply overrides to a configuration
    ///
    /// # Errors
    ///
    /// Returns a validation error when the result is out of range.
    pub fn apply(&self, config: &mut CheckpointConfig) -> Result<(), ConfigError> {
        if self.interval.is_some() || !self.actions.is_empty() || self.blocking_factor.is_some() {
            config.source = ConfigSource::Cli;
        }

        if let Some(interval) = self.interval {
            config.interval = Some(interval);
        }
        if !self.actions.is_empty() {
            config.actions.clone_from(&self.actions);
        }
        if let Some(factor) = self.blocking_factor {
            config.blocking_factor = factor;
        }

        config.validate()
    }
}

// =============================================================================
// Tests
// =============================================================================
