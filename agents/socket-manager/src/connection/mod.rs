//! Connection module
//!
//! The connection manager state machine together with its settings,
//! state tracking, session tokens and error types.

pub mod error;
pub mod manager;
pub mod settings;
pub mod state;
pub mod token;

#[cfg(test)]
pub(crate) mod testing;
