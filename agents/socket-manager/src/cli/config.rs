//! Configuration module
//!
//! Handles loading and saving the socket manager configuration as TOML.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::connection::settings::{
    ConnectionSettings, DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_HEARTBEAT_PAYLOAD,
    DEFAULT_MAX_RECONNECT_ATTEMPTS, DEFAULT_RECONNECT_DELAY,
};
use crate::transport::websocket::DEFAULT_CONNECT_TIMEOUT;

/// Main configuration structure for the socket manager
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Connection settings
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote endpoint and timing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// WebSocket URL of the remote service
    #[serde(default)]
    pub endpoint: String,

    /// Client identifier the session token is derived from
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Heartbeat interval in milliseconds
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_ms: u64,

    /// Payload sent on every heartbeat
    #[serde(default = "default_heartbeat_payload")]
    pub heartbeat_payload: String,

    /// Delay between reconnect attempts in milliseconds
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,

    /// Consecutive reconnect attempts before giving up
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Reset the attempt counter whenever a connection opens
    #[serde(default)]
    pub reset_attempts_on_open: bool,

    /// Opening handshake timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
}

/// Output format of the log subscriber
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (pretty, compact, json)
    #[serde(default)]
    pub format: LogFormat,
}

// Default value functions
fn default_client_id() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}

fn default_heartbeat_interval() -> u64 {
    DEFAULT_HEARTBEAT_INTERVAL.as_millis() as u64
}

fn default_heartbeat_payload() -> String {
    DEFAULT_HEARTBEAT_PAYLOAD.to_string()
}

fn default_reconnect_delay() -> u64 {
    DEFAULT_RECONNECT_DELAY.as_millis() as u64
}

fn default_max_reconnect_attempts() -> u32 {
    DEFAULT_MAX_RECONNECT_ATTEMPTS
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT.as_millis() as u64
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            client_id: default_client_id(),
            heartbeat_interval_ms: default_heartbeat_interval(),
            heartbeat_payload: default_heartbeat_payload(),
            reconnect_delay_ms: default_reconnect_delay(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reset_attempts_on_open: false,
            connect_timeout_ms: default_connect_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl ConnectionConfig {
    /// Convert into the settings the connection manager runs with
    pub fn to_settings(&self) -> ConnectionSettings {
        ConnectionSettings::new(self.endpoint.clone(), self.client_id.clone())
            .with_heartbeat_interval(Duration::from_millis(self.heartbeat_interval_ms))
            .with_heartbeat_payload(self.heartbeat_payload.clone())
            .with_reconnect_delay(Duration::from_millis(self.reconnect_delay_ms))
            .with_max_reconnect_attempts(self.max_reconnect_attempts)
            .with_reset_attempts_on_open(self.reset_attempts_on_open)
    }

    /// Convert into settings, failing on values a connection cannot start with
    pub fn validated_settings(&self) -> Result<ConnectionSettings> {
        let settings = self.to_settings();
        settings
            .validate()
            .context("Invalid connection configuration")?;
        Ok(settings)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default_config())
        }
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default_config();
        assert!(config.connection.endpoint.is_empty());
        assert!(!config.connection.client_id.is_empty());
        assert_eq!(config.connection.heartbeat_interval_ms, 10_000);
        assert_eq!(config.connection.reconnect_delay_ms, 5_000);
        assert_eq!(config.connection.max_reconnect_attempts, 10);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_parse_minimal_config() {
        let toml_content = r#"
            [connection]
            endpoint = "wss://svc/ws"
            client_id = "u1"
        "#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.connection.endpoint, "wss://svc/ws");
        assert_eq!(config.connection.heartbeat_payload, "ping");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_to_settings() {
        let toml_content = r#"
            [connection]
            endpoint = "wss://svc/ws"
            client_id = "u1"
            heartbeat_interval_ms = 2500
            reconnect_delay_ms = 100
            max_reconnect_attempts = 3
            reset_attempts_on_open = true

            [logging]
            level = "debug"
            format = "json"
        "#;

        let config: Config = toml::from_str(toml_content).unwrap();
        let settings = config.connection.to_settings();
        assert_eq!(settings.endpoint, "wss://svc/ws");
        assert_eq!(settings.client_id, "u1");
        assert_eq!(settings.heartbeat_interval, Duration::from_millis(2500));
        assert_eq!(settings.reconnect_delay, Duration::from_millis(100));
        assert_eq!(settings.max_reconnect_attempts, 3);
        assert!(settings.reset_attempts_on_open);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_validated_settings_rejects_missing_endpoint() {
        let config = Config::default_config();
        let err = config.connection.validated_settings().unwrap_err();
        assert!(err.to_string().contains("Invalid connection configuration"));
    }

    #[test]
    fn test_validated_settings_rejects_zero_heartbeat() {
        let toml_content = r#"
            [connection]
            endpoint = "wss://svc/ws"
            client_id = "u1"
            heartbeat_interval_ms = 0
        "#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert!(config.connection.validated_settings().is_err());
    }

    #[test]
    fn test_validated_settings_accepts_zero_reconnect_delay() {
        let toml_content = r#"
            [connection]
            endpoint = "wss://svc/ws"
            client_id = "u1"
            reconnect_delay_ms = 0
        "#;

        let config: Config = toml::from_str(toml_content).unwrap();
        let settings = config.connection.validated_settings().unwrap();
        assert_eq!(settings.reconnect_delay, Duration::ZERO);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("socket-manager.toml");

        let mut config = Config::default_config();
        config.connection.endpoint = "ws://localhost:9000/ws".to_string();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.connection.endpoint, "ws://localhost:9000/ws");
        assert_eq!(loaded.connection.client_id, config.connection.client_id);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.connection.max_reconnect_attempts, 10);
    }
}
