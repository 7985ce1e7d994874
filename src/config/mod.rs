//! Configuration management.
//!
//! Settings come from built-in defaults, an optional TOML file, and
//! environment variables prefixed with `CDLI_SCRAPER_` (nested keys joined
//! with `__`, e.g. `CDLI_SCRAPER_RETRY__MAX_ATTEMPTS=5`).

mod file_config;

pub use file_config::{read_config_file, save_config, ConfigFileError, CONFIG_FILE_NAME};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::client::{CDLI_BASE_URL, DEFAULT_PAGE_SIZE};
use crate::utils::{RetryConfig, DEFAULT_USER_AGENT};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Catalog endpoint settings
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Retry settings
    #[serde(default)]
    pub retry: RetrySettings,

    /// Where results are written
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Retry policy described by the `retry` section
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.retry.max_attempts,
            initial_delay: Duration::from_millis(self.retry.initial_delay_ms),
            max_delay: Duration::from_secs(self.retry.max_delay_secs),
            backoff_multiplier: self.retry.backoff_multiplier,
        }
    }
}

/// Catalog endpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Origin every request path is appended to
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Rows per page in the paginated export
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Request timeout; unset means the HTTP client's default
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl CatalogConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            page_size: default_page_size(),
            user_agent: default_user_agent(),
            timeout_secs: None,
        }
    }
}

fn default_base_url() -> String {
    CDLI_BASE_URL.to_string()
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Attempts per request, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay after the first failure, in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_delay_secs: default_max_delay_secs(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_delay_secs() -> u64 {
    60
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory results are written to
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `json` for structured output, anything else for human-readable lines
    #[serde(default)]
    pub format: Option<String>,
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format
            .as_deref()
            .is_some_and(|f| f.eq_ignore_ascii_case("json"))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Load configuration from a file, layered with environment overrides
pub fn load_config(path: &Path) -> Result<Config, config::ConfigError> {
    config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(env_source())
        .build()?
        .try_deserialize()
}

/// Configuration from defaults and environment variables only
pub fn get_config() -> Result<Config, config::ConfigError> {
    config::Config::builder()
        .add_source(env_source())
        .build()?
        .try_deserialize()
}

fn env_source() -> config::Environment {
    config::Environment::with_prefix("CDLI_SCRAPER")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// Look for a configuration file in the working directory, then in the
/// user's configuration directory
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("cdli-scraper").join("config.toml"))
        .filter(|path| path.is_file())
}
