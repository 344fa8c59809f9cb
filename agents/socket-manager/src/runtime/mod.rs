//! Runtime module
//!
//! Binds the connection manager to tokio: the WebSocket transport, the
//! task-backed scheduler and a single driver task that owns the manager.

pub mod driver;
