//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and `NOTIFYLINK_*` environment overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::connection::{self, derive_ws_url, ReconnectPolicy, DEFAULT_AUTH_CLOSE_CODES};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub connection: ConnectionConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Notifications socket configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    /// REST API base URL the socket URL is derived from
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_ws_path")]
    pub ws_path: String,

    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,

    /// Unset disables pong tracking
    #[serde(default)]
    pub pong_timeout_secs: Option<u64>,

    #[serde(default = "default_auth_close_codes")]
    pub auth_close_codes: Vec<u16>,

    #[serde(default = "default_reconnect_settle")]
    pub reconnect_settle_ms: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_ws_path() -> String {
    connection::DEFAULT_WS_PATH.to_string()
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_base_delay() -> u64 {
    1000 // 1 second
}

fn default_max_delay() -> u64 {
    30_000 // 30 seconds
}

fn default_heartbeat_interval() -> u64 {
    30
}

fn default_auth_close_codes() -> Vec<u16> {
    DEFAULT_AUTH_CLOSE_CODES.to_vec()
}

fn default_reconnect_settle() -> u64 {
    100
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            ws_path: default_ws_path(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
            heartbeat_interval_secs: default_heartbeat_interval(),
            pong_timeout_secs: None,
            auth_close_codes: default_auth_close_codes(),
            reconnect_settle_ms: default_reconnect_settle(),
        }
    }
}

impl From<&ConnectionConfig> for connection::ConnectionConfig {
    fn from(config: &ConnectionConfig) -> Self {
        Self {
            ws_path: config.ws_path.clone(),
            reconnect: ReconnectPolicy {
                base_delay: Duration::from_millis(config.base_delay_ms),
                max_delay: Duration::from_millis(config.max_delay_ms),
                max_attempts: config.max_reconnect_attempts,
            },
            heartbeat_interval: Duration::from_secs(config.heartbeat_interval_secs),
            pong_timeout: config.pong_timeout_secs.map(Duration::from_secs),
            auth_close_codes: config.auth_close_codes.clone(),
            reconnect_settle: Duration::from_millis(config.reconnect_settle_ms),
        }
    }
}

/// Access token source
///
/// The first configured source wins: `token`, then `token_file`, then
/// `token_env`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    pub token: Option<String>,

    /// Environment variable read on every connection attempt
    pub token_env: Option<String>,

    /// File read on every connection attempt
    pub token_file: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("notifylink").join("config.toml")),
            Some(PathBuf::from("/etc/notifylink/config.toml")),
            Some(PathBuf::from("./notifylink.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::debug!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Connection overrides
        if let Some(base_url) = lookup("NOTIFYLINK_BASE_URL") {
            self.connection.base_url = base_url;
        }
        if let Some(ws_path) = lookup("NOTIFYLINK_WS_PATH") {
            self.connection.ws_path = ws_path;
        }

        // Auth overrides
        if let Some(token) = lookup("NOTIFYLINK_TOKEN") {
            self.auth.token = Some(token);
        }
        if let Some(path) = lookup("NOTIFYLINK_TOKEN_FILE") {
            self.auth.token_file = Some(PathBuf::from(path));
        }

        // Logging overrides
        if let Some(level) = lookup("NOTIFYLINK_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("NOTIFYLINK_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Reject values the connection manager cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let connection = &self.connection;

        derive_ws_url(&connection.base_url, &connection.ws_path)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if connection.ws_path.trim().is_empty() {
            return Err(ConfigError::Invalid("connection.ws_path is empty".into()));
        }
        if connection.heartbeat_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "connection.heartbeat_interval_secs must be greater than 0".into(),
            ));
        }
        if connection.pong_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "connection.pong_timeout_secs must be greater than 0".into(),
            ));
        }
        if connection.base_delay_ms == 0 {
            return Err(ConfigError::Invalid(
                "connection.base_delay_ms must be greater than 0".into(),
            ));
        }
        if connection.max_delay_ms < connection.base_delay_ms {
            return Err(ConfigError::Invalid(format!(
                "connection.max_delay_ms ({}) is below base_delay_ms ({})",
                connection.max_delay_ms, connection.base_delay_ms
            )));
        }

        match self.logging.format.as_str() {
            "pretty" | "json" => Ok(()),
            other => Err(ConfigError::Invalid(format!(
                "logging.format must be \"pretty\" or \"json\", got {:?}",
                other
            ))),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# notifylink Configuration
#
# Environment variables override these settings:
# - NOTIFYLINK_BASE_URL
# - NOTIFYLINK_WS_PATH
# - NOTIFYLINK_TOKEN
# - NOTIFYLINK_TOKEN_FILE
# - NOTIFYLINK_LOG_LEVEL
# - NOTIFYLINK_LOG_FORMAT

[connection]
# REST API base URL; the socket URL is derived from it
# (http -> ws, https -> wss, trailing /api removed)
base_url = "http://localhost:8000/api"

# Path of the notifications endpoint
ws_path = "/ws/notifications/"

# Consecutive failed reconnects before giving up
max_reconnect_attempts = 5

# Backoff: min(base_delay_ms * 2^(attempt - 1), max_delay_ms)
base_delay_ms = 1000
max_delay_ms = 30000

# Seconds between {"type": "ping"} frames
heartbeat_interval_secs = 30

# Drop the socket if no pong arrives this many seconds after a ping
# pong_timeout_secs = 10

# Close codes meaning the access token was rejected
auth_close_codes = [1008, 4001, 4003]

# Pause between disconnect and connect on a manual reconnect (ms)
reconnect_settle_ms = 100

[auth]
# Access token sent as the `token` query parameter.
# First match wins: token, token_file, token_env
# token = ""
# token_file = "~/.config/notifylink/token"
# token_env = "API_ACCESS_TOKEN"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.connection.base_url, "http://localhost:8000/api");
        assert_eq!(config.connection.ws_path, "/ws/notifications/");
        assert_eq!(config.connection.max_reconnect_attempts, 5);
        assert_eq!(config.connection.auth_close_codes, vec![1008, 4001, 4003]);
        assert!(config.connection.pong_timeout_secs.is_none());
        assert_eq!(config.logging.format, "pretty");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_generated_config_parses_to_defaults() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        let defaults = ConnectionConfig::default();

        assert_eq!(config.connection.base_url, defaults.base_url);
        assert_eq!(config.connection.base_delay_ms, defaults.base_delay_ms);
        assert_eq!(config.connection.max_delay_ms, defaults.max_delay_ms);
        assert_eq!(
            config.connection.heartbeat_interval_secs,
            defaults.heartbeat_interval_secs
        );
        assert!(config.auth.token.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[connection]
base_url = "https://api.example.com/api"
max_reconnect_attempts = 3
pong_timeout_secs = 10

[auth]
token_file = "/run/secrets/token"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.connection.base_url, "https://api.example.com/api");
        assert_eq!(config.connection.max_reconnect_attempts, 3);
        assert_eq!(config.connection.pong_timeout_secs, Some(10));
        assert_eq!(config.connection.base_delay_ms, 1000);
        assert_eq!(
            config.auth.token_file.as_deref(),
            Some(Path::new("/run/secrets/token"))
        );
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_errors() {
        let missing = Config::load(Path::new("/nonexistent/notifylink.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[connection]\nmax_reconnect_attempts = \"five\"").unwrap();
        assert!(matches!(
            Config::load(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("NOTIFYLINK_BASE_URL", "https://prod.example.com/api"),
            ("NOTIFYLINK_TOKEN", "abc"),
            ("NOTIFYLINK_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.connection.base_url, "https://prod.example.com/api");
        assert_eq!(config.auth.token.as_deref(), Some("abc"));
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.connection.ws_path, "/ws/notifications/");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.connection.heartbeat_interval_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.connection.max_delay_ms = 10;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.connection.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_into_connection_config() {
        let mut config = ConnectionConfig::default();
        config.base_delay_ms = 50;
        config.pong_timeout_secs = Some(5);

        let runtime = connection::ConnectionConfig::from(&config);
        assert_eq!(runtime.reconnect.base_delay, Duration::from_millis(50));
        assert_eq!(runtime.reconnect.max_attempts, 5);
        assert_eq!(runtime.pong_timeout, Some(Duration::from_secs(5)));
        assert_eq!(runtime.heartbeat_interval, Duration::from_secs(30));
    }
}
