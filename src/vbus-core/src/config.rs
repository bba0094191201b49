use crate::paths::AppDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const CURRENT_CONFIG_VERSION: u32 = 1;

/// Environment variable naming the bus endpoint. Takes precedence over `bus.url`.
pub const VBUS_URL_ENV: &str = "VBUS_URL";

/// Endpoint used when neither `VBUS_URL` nor `bus.url` is set.
pub const DEFAULT_BUS_URL: &str = "nats://localhost:4222";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_config_version")]
    pub config_version: u32,
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub element: ElementConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            bus: BusConfig::default(),
            element: ElementConfig::default(),
            audio: AudioConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// Endpoint when `VBUS_URL` is not set; [`DEFAULT_BUS_URL`] when absent.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_registration_subject")]
    pub registration_subject: String,
    /// Give up on the initial connection after this many seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            url: None,
            registration_subject: default_registration_subject(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// Identity announced to the directory service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementConfig {
    #[serde(default = "default_element_path")]
    pub path: String,
    #[serde(default = "default_element_name")]
    pub name: String,
    #[serde(default = "default_element_name")]
    pub uuid: String,
    #[serde(default = "default_element_tags")]
    pub tags: Vec<String>,
}

impl Default for ElementConfig {
    fn default() -> Self {
        Self {
            path: default_element_path(),
            name: default_element_name(),
            uuid: default_element_name(),
            tags: default_element_tags(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Seconds of audio the host should keep queued ahead of this backend.
    #[serde(default = "default_buffer_desired_length")]
    pub buffer_desired_length: f64,
    /// Seconds added to the host's latency calculation.
    #[serde(default)]
    pub latency_offset: f64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            buffer_desired_length: default_buffer_desired_length(),
            latency_offset: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: LogLevel,
    #[serde(default = "default_max_log_files")]
    pub max_log_files: usize,
    /// Mirror log lines to stderr in addition to the log file.
    #[serde(default = "default_console_enabled", alias = "stdout")]
    pub console: bool,
    #[serde(default)]
    pub file_name: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_log_files: default_max_log_files(),
            console: default_console_enabled(),
            file_name: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("config file {path} does not exist")]
    Missing { path: PathBuf },
    #[error("config validation failed: {0}")]
    Validation(ValidationError),
    #[error("failed to prepare configuration directories: {0}")]
    Directories(#[from] crate::paths::DirsError),
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("unsupported config_version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("element.{field} must not be empty")]
    EmptyElementField { field: &'static str },
    #[error("bus.registration_subject must not be empty")]
    EmptyRegistrationSubject,
    #[error("bus.connect_timeout_secs must be at least 1")]
    ConnectTimeout,
    #[error("audio.buffer_desired_length must be positive, got {0}")]
    BufferLength(f64),
}

impl Config {
    pub fn load_or_default(dirs: &AppDirs) -> Result<Self, ConfigError> {
        dirs.ensure_exists()?;
        Self::load_from(&Self::config_path(dirs))
    }

    /// Load a config file, falling back to defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_required(path)
    }

    /// Load a config file the user named explicitly; it must exist.
    pub fn load_required(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::Missing {
                path: path.to_path_buf(),
            });
        }

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate().map_err(ConfigError::Validation)?;
        Ok(config)
    }

    pub fn config_path(dirs: &AppDirs) -> PathBuf {
        dirs.config_dir().join("config.toml")
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.config_version != CURRENT_CONFIG_VERSION {
            return Err(ValidationError::UnsupportedVersion {
                found: self.config_version,
                expected: CURRENT_CONFIG_VERSION,
            });
        }
        for (field, value) in [
            ("path", &self.element.path),
            ("name", &self.element.name),
            ("uuid", &self.element.uuid),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::EmptyElementField { field });
            }
        }
        if self.bus.registration_subject.trim().is_empty() {
            return Err(ValidationError::EmptyRegistrationSubject);
        }
        if self.bus.connect_timeout_secs == 0 {
            return Err(ValidationError::ConnectTimeout);
        }
        if !(self.audio.buffer_desired_length > 0.0) {
            return Err(ValidationError::BufferLength(
                self.audio.buffer_desired_length,
            ));
        }
        Ok(())
    }

    /// Pick the bus endpoint: a non-empty `VBUS_URL` value, then `bus.url`,
    /// then [`DEFAULT_BUS_URL`].
    pub fn resolve_bus_url(&self, env_value: Option<&str>) -> String {
        env_value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .or_else(|| self.bus.url.clone())
            .unwrap_or_else(|| DEFAULT_BUS_URL.to_string())
    }

    /// [`Config::resolve_bus_url`] against the process environment.
    pub fn bus_url_from_env(&self) -> String {
        let env_value = std::env::var(VBUS_URL_ENV).ok();
        self.resolve_bus_url(env_value.as_deref())
    }
}

fn default_config_version() -> u32 {
    CURRENT_CONFIG_VERSION
}

fn default_registration_subject() -> String {
    "system.db.newElement".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_element_path() -> String {
    "system.audio.shairport-sync".to_string()
}

fn default_element_name() -> String {
    "shairport-sync".to_string()
}

fn default_element_tags() -> Vec<String> {
    vec!["audio".into(), "source".into(), "airplay".into()]
}

fn default_buffer_desired_length() -> f64 {
    1.0
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_max_log_files() -> usize {
    7
}

fn default_console_enabled() -> bool {
    true
}
