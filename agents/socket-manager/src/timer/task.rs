//! Tokio-backed [`Scheduler`]: one task per timer, firings reported on a channel.

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};

use super::{Scheduler, TimerId};

/// Shortest period an interval timer runs with
pub const MIN_INTERVAL_PERIOD: Duration = Duration::from_millis(1);

pub struct TokioScheduler {
    next_id: u64,
    timers: HashMap<TimerId, JoinHandle<()>>,
    fired: mpsc::UnboundedSender<TimerId>,
}

impl TokioScheduler {
    /// Create a scheduler reporting firings on `fired`
    pub fn new(fired: mpsc::UnboundedSender<TimerId>) -> Self {
        Self {
            next_id: 0,
            timers: HashMap::new(),
            fired,
        }
    }

    /// Number of timers that have not finished or been cancelled
    pub fn active(&self) -> usize {
        self.timers.values().filter(|h| !h.is_finished()).count()
    }

    fn register<F>(&mut self, spawn: F) -> TimerId
    where
        F: FnOnce(TimerId, mpsc::UnboundedSender<TimerId>) -> JoinHandle<()>,
    {
        self.timers.retain(|_, handle| !handle.is_finished());

        self.next_id += 1;
        let id = TimerId::new(self.next_id);
        let handle = spawn(id, self.fired.clone());
        self.timers.insert(id, handle);
        id
    }
}

impl Scheduler for TokioScheduler {
    fn start_after(&mut self, delay: Duration) -> TimerId {
        self.register(|id, fired| {
            tokio::spawn(async move {
                sleep(delay).await;
                let _ = fired.send(id);
            })
        })
    }

    fn start_interval(&mut self, period: Duration) -> TimerId {
        // tokio panics on a zero period
        let period = period.max(MIN_INTERVAL_PERIOD);
        self.register(|id, fired| {
            tokio::spawn(async move {
                let mut ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    if fired.send(id).is_err() {
                        break;
                    }
                }
            })
        })
    }

    fn cancel(&mut self, timer: TimerId) {
        if let Some(handle) = self.timers.remove(&timer) {
            handle.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }
}
