//! Socket Manager Library
//!
//! Keeps a single persistent WebSocket connection to a remote endpoint alive:
//! connects, sends a periodic heartbeat while open, redials after a fixed
//! delay when the connection drops, and relays text payloads between the
//! connection and a caller-supplied handler.

pub mod cli;
pub mod connection;
pub mod runtime;
pub mod timer;
pub mod transport;

// Re-exports for convenience
pub use cli::config::Config;
pub use connection::error::ConnectionError;
pub use connection::manager::{ConnectionManager, MessageHandler, Status};
pub use connection::settings::ConnectionSettings;
pub use connection::state::ConnectionState;
pub use runtime::driver::{SocketManager, SocketManagerBuilder};
pub use timer::{task::TokioScheduler, Scheduler, TimerId};
pub use transport::websocket::WebSocketTransport;
pub use transport::{ConnectionId, Transport, TransportError, TransportEvent, TransportEventKind};
