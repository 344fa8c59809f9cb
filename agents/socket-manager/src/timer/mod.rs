//! Timer Scheduling
//!
//! The connection manager never sleeps itself. It asks a [`Scheduler`] for
//! one-shot and recurring timers and is told when they fire.

pub mod task;

/// Identifies a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TimerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// Scheduling capability injected into the connection manager
pub trait Scheduler {
    /// Fire once after `delay`
    fn start_after(&mut self, delay: std::time::Duration) -> TimerId;

    /// Fire every `period`, first after one full period
    fn start_interval(&mut self, period: std::time::Duration) -> TimerId;

    /// Stop a timer. Unknown or already fired timers are ignored.
    fn cancel(&mut self, timer: TimerId);
}
