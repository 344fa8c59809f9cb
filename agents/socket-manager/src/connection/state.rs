//! Connection State
//!
//! Named states of a connection episode and the tracker that validates and
//! records transitions between them.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// Number of transitions kept in the history
const MAX_TRANSITIONS: usize = 100;

/// Represents the possible states of a managed connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not started, or closed by the caller
    Idle,
    /// Transport handle opened, waiting for the open event
    Connecting,
    /// Connection is open and the heartbeat is running
    Open,
    /// Transport reported close, reconnect policy not yet applied
    Closed,
    /// Waiting for the reconnect timer to fire
    ReconnectPending,
    /// Reconnect ceiling reached, waiting for the caller to initialize again
    GivenUp,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Idle => write!(f, "Idle"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Open => write!(f, "Open"),
            ConnectionState::Closed => write!(f, "Closed"),
            ConnectionState::ReconnectPending => write!(f, "ReconnectPending"),
            ConnectionState::GivenUp => write!(f, "GivenUp"),
        }
    }
}

/// State transition information
#[derive(Debug, Clone)]
pub struct StateTransition {
    pub from: ConnectionState,
    pub to: ConnectionState,
    pub timestamp: DateTime<Utc>,
    pub reason: Option<String>,
}

/// Tracks the current state and a bounded transition history
#[derive(Debug)]
pub struct StateTracker {
    current: ConnectionState,
    transitions: VecDeque<StateTransition>,
}

impl StateTracker {
    /// Create a tracker starting in Idle state
    pub fn new() -> Self {
        Self {
            current: ConnectionState::Idle,
            transitions: VecDeque::new(),
        }
    }

    /// Get the current state
    pub fn current(&self) -> ConnectionState {
        self.current
    }

    /// Transition to a new state
    pub fn transition_to(&mut self, new_state: ConnectionState, reason: Option<String>) -> bool {
        if !Self::is_valid_transition(self.current, new_state) {
            tracing::warn!(
                from = %self.current,
                to = %new_state,
                "Rejected invalid connection state transition"
            );
            return false;
        }

        let old_state = self.current;
        self.current = new_state;

        self.transitions.push_back(StateTransition {
            from: old_state,
            to: new_state,
            timestamp: Utc::now(),
            reason,
        });
        if self.transitions.len() > MAX_TRANSITIONS {
            self.transitions.pop_front();
        }

        tracing::debug!(from = %old_state, to = %new_state, "Connection state transition");

        true
    }

    /// Check if a state transition is valid
    fn is_valid_transition(from: ConnectionState, to: ConnectionState) -> bool {
        use ConnectionState::*;

        // Self-transition is always allowed, and the caller may close from anywhere
        if from == to || to == Idle {
            return true;
        }

        matches!(
            (from, to),
            (Idle, Connecting)
                | (Connecting, Open)
                | (Connecting, Closed)
                | (Open, Closed)
                | (Open, Connecting)
                | (Closed, ReconnectPending)
                | (Closed, GivenUp)
                | (ReconnectPending, Connecting)
                | (GivenUp, Connecting)
        )
    }

    /// Get recent state transitions, newest first
    pub fn recent_transitions(&self, count: usize) -> Vec<StateTransition> {
        self.transitions.iter().rev().take(count).cloned().collect()
    }
}

impl Default for StateTracker {
    fn default() -> Self {
        Self::new()
    }
}
