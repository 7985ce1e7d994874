//! Reading and writing configuration files directly.
//!
//! # Configuration File Format
//!
//! ```toml
//! [catalog]
//! base_url = "https://cdli.mpiwg-berlin.mpg.de"
//! page_size = 1000
//! # timeout_secs = 60
//!
//! [retry]
//! max_attempts = 3
//! initial_delay_ms = 1000
//! backoff_multiplier = 2.0
//! max_delay_secs = 60
//!
//! [output]
//! directory = "./data"
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```

use std::path::Path;

use super::Config;

/// File name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "cdli-scraper.toml";

/// Read a TOML configuration file without environment overrides
pub fn read_config_file(path: &Path) -> Result<Config, ConfigFileError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigFileError::Io(e.to_string()))?;

    toml::from_str(&content).map_err(|e| ConfigFileError::Parse(e.to_string()))
}

/// Write a configuration as TOML, creating parent directories as needed
pub fn save_config(config: &Config, path: &Path) -> Result<(), ConfigFileError> {
    let content =
        toml::to_string_pretty(config).map_err(|e| ConfigFileError::Serialize(e.to_string()))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigFileError::Io(e.to_string()))?;
        }
    }

    std::fs::write(path, content).map_err(|e| ConfigFileError::Io(e.to_string()))
}

/// Configuration file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialize error: {0}")]
    Serialize(String),
}
