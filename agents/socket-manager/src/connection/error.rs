//! Connection Errors
//!
//! Failures the connection manager reports. None of them escape the public
//! operations; they are logged and handled where they occur.

use thiserror::Error;

use crate::transport::TransportError;

/// Failures surfaced by the connection manager
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Endpoint or client id missing at initialization
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Low-level transport failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Attempt to send while the connection is not open
    #[error("connection is not open, unable to send message")]
    SendRejected,

    /// Reconnect ceiling reached, automatic recovery halted
    #[error("max reconnect attempts ({max}) reached, unable to reconnect")]
    ReconnectExhausted { max: u32 },
}
