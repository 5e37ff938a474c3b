//! Typed configuration structures
//!
//! Every key is optional; missing keys take the defaults below.

use crate::chat::DEFAULT_CHAT_HISTORY;
use crate::logging::{LogFormat, LoggingConfig};
use crate::polls::{DEFAULT_MAX_OPTIONS, DEFAULT_TIME_LIMIT_SECS};
use crate::session::SessionOptions;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Default listen port
pub const DEFAULT_PORT: u16 = 3001;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP / WebSocket listener
    #[serde(default)]
    pub server: ServerConfig,

    /// Classroom session limits
    #[serde(default)]
    pub session: SessionConfig,

    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if self.server.bind.parse::<IpAddr>().is_err() {
            issues.push(ValidationIssue::new(
                "server.bind",
                format!("'{}' is not an IP address", self.server.bind),
            ));
        }
        for (i, origin) in self.server.cors_origins.iter().enumerate() {
            if origin.trim().is_empty() {
                issues.push(ValidationIssue::new(
                    format!("server.corsOrigins[{}]", i),
                    "origin must not be empty",
                ));
            }
        }

        if self.session.default_time_limit_secs == 0 {
            issues.push(ValidationIssue::new(
                "session.defaultTimeLimitSecs",
                "must be at least 1",
            ));
        }
        if self.session.chat_history_limit == 0 {
            issues.push(ValidationIssue::new(
                "session.chatHistoryLimit",
                "must be at least 1",
            ));
        }
        if self.session.max_options == 0 {
            issues.push(ValidationIssue::new("session.maxOptions", "must be at least 1"));
        }

        if self.logging.level.trim().is_empty() {
            issues.push(ValidationIssue::new("logging.level", "must not be empty"));
        }

        issues
    }
}

/// Validation issue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Listener configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Address to bind
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Poll time limit used when a request has none
    #[serde(default = "default_time_limit")]
    pub default_time_limit_secs: u64,

    /// Chat messages kept for late joiners
    #[serde(default = "default_chat_history")]
    pub chat_history_limit: usize,

    /// Only teacher connections may create polls or remove students
    #[serde(default)]
    pub enforce_teacher_role: bool,

    /// Maximum options per poll
    #[serde(default = "default_max_options")]
    pub max_options: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_time_limit_secs: default_time_limit(),
            chat_history_limit: default_chat_history(),
            enforce_teacher_role: false,
            max_options: default_max_options(),
        }
    }
}

impl SessionConfig {
    pub fn to_options(&self) -> SessionOptions {
        SessionOptions {
            default_time_limit_secs: self.default_time_limit_secs,
            chat_history_limit: self.chat_history_limit,
            max_options: self.max_options,
            enforce_teacher_role: self.enforce_teacher_role,
        }
    }
}

fn default_time_limit() -> u64 {
    DEFAULT_TIME_LIMIT_SECS
}

fn default_chat_history() -> usize {
    DEFAULT_CHAT_HISTORY
}

fn default_max_options() -> usize {
    DEFAULT_MAX_OPTIONS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.server.cors_origins, vec!["*"]);
        assert_eq!(config.session.default_time_limit_secs, 60);
        assert_eq!(config.session.chat_history_limit, 50);
        assert_eq!(config.session.max_options, 50);
        assert!(!config.session.enforce_teacher_role);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Text);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_partial_session_keeps_other_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"session": {"enforceTeacherRole": true}}"#).unwrap();
        assert!(config.session.enforce_teacher_role);
        assert_eq!(config.session.chat_history_limit, 50);
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn test_validate_reports_paths() {
        let mut config = Config::default();
        config.server.bind = "localhost:80".to_string();
        config.session.chat_history_limit = 0;
        config.session.max_options = 0;

        let paths: Vec<String> = config.validate().into_iter().map(|i| i.path).collect();
        assert_eq!(
            paths,
            vec!["server.bind", "session.chatHistoryLimit", "session.maxOptions"]
        );
    }

    #[test]
    fn test_to_options() {
        let session = SessionConfig {
            default_time_limit_secs: 30,
            chat_history_limit: 10,
            enforce_teacher_role: true,
            max_options: 4,
        };
        let options = session.to_options();
        assert_eq!(options.default_time_limit_secs, 30);
        assert_eq!(options.chat_history_limit, 10);
        assert_eq!(options.max_options, 4);
        assert!(options.enforce_teacher_role);
    }
}
