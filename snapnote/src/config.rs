//! Configuration management for SnapNote
//!
//! Values are layered, lowest precedence first:
//! 1. Built-in defaults
//! 2. `SNAPNOTE_*` environment variables
//! 3. A `snapnote.yaml` file
//!
//! Per-user settings that the UI toggles (dark mode, `maxNotes`, ...) are not
//! configuration; they live in the store itself, see [`crate::settings`].

use crate::common::env_loader::EnvLoader;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Capacity of browser-local extension storage, in bytes
pub const DEFAULT_QUOTA_BYTES: u64 = 10_485_760;

/// Usage ratio at which the oldest notes start being evicted
pub const DEFAULT_CLEANUP_THRESHOLD: f64 = 0.9;

/// Share of the collection evicted per cleanup
pub const DEFAULT_EVICTION_FRACTION: f64 = 0.1;

/// Maximum note length in characters
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 10_000;

/// Note ceiling used until settings are initialized
pub const DEFAULT_MAX_NOTES: usize = 10_000;

const CONFIG_FILE_NAME: &str = "snapnote.yaml";

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a configuration file from disk
    #[error("Failed to read configuration file {path}: {source}")]
    FileRead {
        /// Path to the configuration file that could not be read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse YAML content from a configuration file
    #[error("Invalid YAML syntax in {path}:\n{source}")]
    YamlParse {
        /// Path to the configuration file with invalid YAML content
        path: PathBuf,
        /// Underlying YAML parsing error
        #[source]
        source: serde_yaml::Error,
    },

    /// Invalid configuration value for a specific field
    #[error("Invalid configuration value for '{field}': {value}\n{hint}")]
    InvalidValue {
        /// Name of the offending field
        field: String,
        /// The value that was provided
        value: String,
        /// How to fix it
        hint: String,
    },
}

impl From<ConfigError> for crate::SnapNoteError {
    fn from(err: ConfigError) -> Self {
        crate::SnapNoteError::Config(err.to_string())
    }
}

/// Runtime configuration for the note store
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// Directory holding the persisted keys
    pub data_dir: PathBuf,
    /// Storage capacity in bytes
    pub quota_bytes: u64,
    /// Usage ratio (0, 1] that triggers cleanup
    pub cleanup_threshold: f64,
    /// Fraction (0, 1] of notes evicted per cleanup
    pub eviction_fraction: f64,
    /// Maximum content length in characters
    pub max_content_length: usize,
    /// Note ceiling written into freshly initialized settings
    pub default_max_notes: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            quota_bytes: DEFAULT_QUOTA_BYTES,
            cleanup_threshold: DEFAULT_CLEANUP_THRESHOLD,
            eviction_fraction: DEFAULT_EVICTION_FRACTION,
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
            default_max_notes: DEFAULT_MAX_NOTES,
        }
    }
}

/// `~/.snapnote`, or `./.snapnote` when there is no home directory
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".snapnote"))
        .unwrap_or_else(|| PathBuf::from(".snapnote"))
}

impl StoreConfig {
    /// Build configuration from defaults, environment variables and YAML
    ///
    /// An unreadable or invalid YAML file is logged and skipped rather than
    /// failing startup.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.apply_env_vars();

        match YamlConfig::load_or_default() {
            Ok(yaml) => {
                let mut candidate = config.clone();
                yaml.apply_to_config(&mut candidate);
                match candidate.validate() {
                    Ok(()) => config = candidate,
                    Err(e) => tracing::warn!(
                        "Invalid YAML configuration: {}. Continuing with environment variables and defaults.",
                        e
                    ),
                }
            }
            Err(e) => tracing::warn!(
                "Failed to load YAML configuration, falling back to env vars and defaults: {}",
                e
            ),
        }

        config
    }

    /// Same as [`StoreConfig::new`] but rooted at an explicit data directory
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::new()
        }
    }

    fn apply_env_vars(&mut self) {
        let loader = EnvLoader::new("SNAPNOTE");

        if let Some(dir) = loader.load_optional::<PathBuf>("DATA_DIR") {
            self.data_dir = dir;
        }
        self.quota_bytes = loader.load_parsed("QUOTA_BYTES", self.quota_bytes);
        self.cleanup_threshold = loader.load_parsed("CLEANUP_THRESHOLD", self.cleanup_threshold);
        self.eviction_fraction = loader.load_parsed("EVICTION_FRACTION", self.eviction_fraction);
        self.max_content_length = loader.load_parsed("MAX_CONTENT_LENGTH", self.max_content_length);
        self.default_max_notes = loader.load_parsed("MAX_NOTES", self.default_max_notes);

        if let Err(e) = self.validate() {
            tracing::warn!("Ignoring invalid environment configuration: {}", e);
            let data_dir = std::mem::take(&mut self.data_dir);
            *self = Self {
                data_dir,
                ..Self::default()
            };
        }
    }

    /// Check that all numeric values are within their allowed ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::validate_ratio(self.cleanup_threshold, "cleanup_threshold")?;
        Self::validate_ratio(self.eviction_fraction, "eviction_fraction")?;

        if self.quota_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "quota_bytes".to_string(),
                value: "0".to_string(),
                hint: "quota_bytes must be greater than zero".to_string(),
            });
        }
        if self.max_content_length == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_content_length".to_string(),
                value: "0".to_string(),
                hint: "max_content_length must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    fn validate_ratio(value: f64, field: &str) -> Result<(), ConfigError> {
        if !(value > 0.0 && value <= 1.0) {
            return Err(ConfigError::InvalidValue {
                field: field.to_string(),
                value: value.to_string(),
                hint: format!("{field} must be greater than 0 and at most 1"),
            });
        }
        Ok(())
    }

    /// Find `snapnote.yaml` in the working directory or `~/.config/snapnote`
    pub fn find_yaml_config_file() -> Option<PathBuf> {
        let mut candidates = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join(".config").join("snapnote").join(CONFIG_FILE_NAME));
        }
        candidates.into_iter().find(|p| p.is_file())
    }
}

/// Optional overrides read from `snapnote.yaml`
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct YamlConfig {
    /// Data directory override
    pub data_dir: Option<PathBuf>,
    /// Storage capacity override
    pub quota_bytes: Option<u64>,
    /// Cleanup trigger override
    pub cleanup_threshold: Option<f64>,
    /// Eviction share override
    pub eviction_fraction: Option<f64>,
    /// Content length override
    pub max_content_length: Option<usize>,
    /// Note ceiling override
    pub max_notes: Option<usize>,
}

impl YamlConfig {
    /// Apply YAML values on top of an existing config
    pub fn apply_to_config(&self, config: &mut StoreConfig) {
        if let Some(ref dir) = self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(v) = self.quota_bytes {
            config.quota_bytes = v;
        }
        if let Some(v) = self.cleanup_threshold {
            config.cleanup_threshold = v;
        }
        if let Some(v) = self.eviction_fraction {
            config.eviction_fraction = v;
        }
        if let Some(v) = self.max_content_length {
            config.max_content_length = v;
        }
        if let Some(v) = self.max_notes {
            config.default_max_notes = v;
        }
    }

    /// Load YAML configuration from a file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        tracing::info!("Loading YAML configuration from: {:?}", path);

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        serde_yaml::from_str(&content).map_err(|e| ConfigError::YamlParse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Load the first config file found, or an empty override set
    pub fn load_or_default() -> Result<Self, ConfigError> {
        match StoreConfig::find_yaml_config_file() {
            Some(path) => Self::load_from_file(path),
            None => {
                tracing::debug!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }
}
