//! Configuration loading
//!
//! Reads a JSON5 file, then applies `POLLROOM_*` environment overrides.
//! A missing file is not an error.

pub mod types;

pub use types::{Config, ServerConfig, SessionConfig, ValidationIssue, DEFAULT_PORT};

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "POLLROOM_CONFIG_PATH";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid value for {var}: '{value}'")]
    InvalidEnv { var: &'static str, value: String },

    #[error("invalid configuration: {}", format_issues(.0))]
    Invalid(Vec<ValidationIssue>),
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Resolved config file path
pub fn get_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pollroom")
        .join("pollroom.json5")
}

/// Load the configuration from the default path with env overrides applied
pub fn load_config() -> Result<Config, ConfigError> {
    let mut config = load_config_from(&get_config_path())?;
    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    Ok(config)
}

/// Load a config file without env overrides. Missing file means defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content).map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

/// Parse JSON5 config text
pub fn parse_config(content: &str) -> Result<Config, String> {
    if content.trim().is_empty() {
        return Ok(Config::default());
    }
    json5::from_str(content).map_err(|e| e.to_string())
}

/// Apply `POLLROOM_BIND`, `POLLROOM_PORT` and `POLLROOM_LOG_LEVEL`
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(bind) = lookup("POLLROOM_BIND") {
        config.server.bind = bind;
    }
    if let Some(port) = lookup("POLLROOM_PORT") {
        config.server.port = port.parse().map_err(|_| ConfigError::InvalidEnv {
            var: "POLLROOM_PORT",
            value: port.clone(),
        })?;
    }
    if let Some(level) = lookup("POLLROOM_LOG_LEVEL") {
        config.logging.level = level;
    }
    Ok(())
}

/// Reject a config with validation issues
pub fn ensure_valid(config: &Config) -> Result<(), ConfigError> {
    let issues = config.validate();
    if issues.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(issues))
    }
}
