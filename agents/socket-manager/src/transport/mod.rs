//! Transport Adapter
//!
//! Defines the interface the connection manager uses to open, write to and
//! close duplex connections. Implementations report what happens on a
//! connection as [`TransportEvent`]s tagged with its [`ConnectionId`].

pub mod websocket;

use thiserror::Error;

/// Identifies one transport handle for its whole lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Something that happened on a transport handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportEvent {
    pub connection: ConnectionId,
    pub kind: TransportEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEventKind {
    /// Connection established
    Open,
    /// Inbound payload
    Message(String),
    /// Connection closed, by either side or after a failure
    Close { code: Option<u16>, reason: String },
    /// Low-level failure, usually followed by a close
    Error(String),
}

impl TransportEvent {
    pub fn open(connection: ConnectionId) -> Self {
        Self {
            connection,
            kind: TransportEventKind::Open,
        }
    }

    pub fn message(connection: ConnectionId, payload: impl Into<String>) -> Self {
        Self {
            connection,
            kind: TransportEventKind::Message(payload.into()),
        }
    }

    pub fn close(connection: ConnectionId, code: Option<u16>, reason: impl Into<String>) -> Self {
        Self {
            connection,
            kind: TransportEventKind::Close {
                code,
                reason: reason.into(),
            },
        }
    }

    pub fn error(connection: ConnectionId, message: impl Into<String>) -> Self {
        Self {
            connection,
            kind: TransportEventKind::Error(message.into()),
        }
    }
}

/// Transport-level failures
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("invalid sub-protocol token: {0}")]
    InvalidProtocol(String),

    #[error("connection {0} is not known to the transport")]
    UnknownConnection(ConnectionId),

    #[error("connection {0} is closed")]
    Closed(ConnectionId),

    /// Failure reported asynchronously through an error event
    #[error("transport error: {0}")]
    Failed(String),
}

/// Transport adapter trait - common interface for duplex connections
pub trait Transport {
    /// Start opening a connection to `endpoint`, presenting `protocol` as the
    /// sub-protocol. The outcome arrives later as events for the returned id.
    fn open(&mut self, endpoint: &str, protocol: &str) -> Result<ConnectionId, TransportError>;

    /// Queue a text frame on an open connection
    fn send(&mut self, connection: ConnectionId, payload: &str) -> Result<(), TransportError>;

    /// Request shutdown of a connection and forget its handle
    fn close(&mut self, connection: ConnectionId);
}
