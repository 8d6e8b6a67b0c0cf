//! # Configuration
//!
//! Process-wide defaults: schema laziness, per-field cache capacity, default
//! temporal output formats and log settings.
//!
//! Loaded from TOML, overridden by `FIELDWORK_*` environment variables, and
//! installed once. Code that never installs settings gets the defaults plus
//! environment overrides on first use.
//!
//! ```toml
//! lazy = false
//! cache_capacity = 1024
//! datetime_format = "%Y-%m-%dT%H:%M:%S%:z"
//!
//! [log]
//! directive = "fieldwork=debug"
//! json = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::warn;

static GLOBAL: OnceLock<Settings> = OnceLock::new();

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("cannot read '{path}': {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The configuration text is not valid TOML for [`Settings`]
    #[error("invalid configuration: {message}")]
    Parse {
        /// Parser message
        message: String,
    },

    /// An environment override could not be parsed
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidEnv {
        /// Variable name
        key: String,
        /// Offending value
        value: String,
        /// Expected shape
        reason: String,
    },

    /// [`Settings::install`] was called twice, or after first use
    #[error("settings are already installed")]
    AlreadyInstalled,
}

/// Source of environment variables
pub trait EnvProvider {
    /// Value of `key`, if set
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads the process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Log subscriber settings used by [`crate::logging::init`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// `EnvFilter` directive added on top of `RUST_LOG`
    pub directive: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            directive: "fieldwork=info".to_string(),
            json: false,
        }
    }
}

/// Engine-wide defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Default lazy mode of schemas that do not set one
    pub lazy: bool,
    /// Entries per field cache; 0 disables caching
    pub cache_capacity: u64,
    /// Default `strftime` output format of date fields
    pub date_format: String,
    /// Default `strftime` output format of time fields
    pub time_format: String,
    /// Default `strftime` output format of datetime fields
    pub datetime_format: String,
    /// Logging
    pub log: LogSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            lazy: false,
            cache_capacity: 1024,
            date_format: "%Y-%m-%d".to_string(),
            time_format: "%H:%M:%S%.f".to_string(),
            datetime_format: "%Y-%m-%d %H:%M:%S%z".to_string(),
            log: LogSettings::default(),
        }
    }
}

impl Settings {
    /// Parse settings from TOML text; missing keys keep their defaults
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed TOML or mistyped keys.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }

    /// Load settings from a TOML file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read, or
    /// `ConfigError::Parse` if it is invalid.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Defaults with process environment overrides applied
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnv` for unparsable overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env(&SystemEnvProvider)
    }

    /// Apply `FIELDWORK_LAZY`, `FIELDWORK_CACHE_CAPACITY`, `FIELDWORK_LOG`
    /// and `FIELDWORK_LOG_JSON` overrides
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnv` for unparsable overrides.
    pub fn with_env(mut self, env: &impl EnvProvider) -> Result<Self, ConfigError> {
        if let Some(value) = env.get("FIELDWORK_LAZY") {
            self.lazy = parse_bool("FIELDWORK_LAZY", &value)?;
        }
        if let Some(value) = env.get("FIELDWORK_CACHE_CAPACITY") {
            self.cache_capacity = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                key: "FIELDWORK_CACHE_CAPACITY".to_string(),
                reason: "expected a non-negative integer".to_string(),
                value,
            })?;
        }
        if let Some(value) = env.get("FIELDWORK_LOG") {
            self.log.directive = value;
        }
        if let Some(value) = env.get("FIELDWORK_LOG_JSON") {
            self.log.json = parse_bool("FIELDWORK_LOG_JSON", &value)?;
        }
        Ok(self)
    }

    /// Make these settings the process-wide defaults
    ///
    /// Must run before the first field or schema is built.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::AlreadyInstalled` if settings are already in use.
    pub fn install(self) -> Result<(), ConfigError> {
        GLOBAL.set(self).map_err(|_| ConfigError::AlreadyInstalled)
    }

    /// Process-wide settings
    pub fn global() -> &'static Self {
        GLOBAL.get_or_init(|| {
            Self::from_env().unwrap_or_else(|err| {
                warn!(error = %err, "Ignoring invalid environment overrides");
                Self::default()
            })
        })
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            key: key.to_string(),
            value: value.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}
