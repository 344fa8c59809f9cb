//! Connection Settings
//!
//! Immutable parameters a connection manager is constructed with.

use std::time::Duration;

use crate::connection::error::ConnectionError;

/// Period of the liveness probe while the connection is open
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

/// Fixed delay between reconnect attempts
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Consecutive reconnect attempts before giving up
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Payload sent on every heartbeat tick
pub const DEFAULT_HEARTBEAT_PAYLOAD: &str = "ping";

/// Settings for a single managed connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Address of the remote service
    pub endpoint: String,
    /// Identifier the per-connection token is derived from
    pub client_id: String,
    pub heartbeat_interval: Duration,
    pub heartbeat_payload: String,
    pub reconnect_delay: Duration,
    pub max_reconnect_attempts: u32,
    /// Reset the attempt counter on every successful open
    pub reset_attempts_on_open: bool,
}

impl ConnectionSettings {
    /// Create settings with the default timing constants
    pub fn new(endpoint: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client_id: client_id.into(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            heartbeat_payload: DEFAULT_HEARTBEAT_PAYLOAD.to_string(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            reset_attempts_on_open: false,
        }
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_heartbeat_payload(mut self, payload: impl Into<String>) -> Self {
        self.heartbeat_payload = payload.into();
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_max_reconnect_attempts(mut self, max: u32) -> Self {
        self.max_reconnect_attempts = max;
        self
    }

    pub fn with_reset_attempts_on_open(mut self, reset: bool) -> Self {
        self.reset_attempts_on_open = reset;
        self
    }

    /// Check the fields required before a connection can be attempted
    pub fn validate(&self) -> Result<(), ConnectionError> {
        if self.endpoint.is_empty() {
            return Err(ConnectionError::Configuration(
                "endpoint address is required".to_string(),
            ));
        }
        if self.client_id.is_empty() {
            return Err(ConnectionError::Configuration(
                "client id is required".to_string(),
            ));
        }
        if self.heartbeat_interval.is_zero() {
            return Err(ConnectionError::Configuration(
                "heartbeat interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
