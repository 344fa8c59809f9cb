//! Deterministic transport and scheduler fakes for manager tests.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::transport::{ConnectionId, Transport, TransportError};
use crate::timer::{Scheduler, TimerId};

/// Records every call instead of touching the network
#[derive(Debug, Default)]
pub struct FakeTransport {
    next_id: u64,
    pub fail_open: bool,
    pub opened: Vec<(ConnectionId, String, String)>,
    pub sent: Vec<(ConnectionId, String)>,
    pub closed: Vec<ConnectionId>,
}

impl FakeTransport {
    pub fn last_opened(&self) -> Option<ConnectionId> {
        self.opened.last().map(|(id, _, _)| *id)
    }

    pub fn sent_payloads(&self) -> Vec<&str> {
        self.sent.iter().map(|(_, p)| p.as_str()).collect()
    }
}

impl Transport for FakeTransport {
    fn open(&mut self, endpoint: &str, protocol: &str) -> Result<ConnectionId, TransportError> {
        if self.fail_open {
            return Err(TransportError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                reason: "refused by fake".to_string(),
            });
        }
        self.next_id += 1;
        let id = ConnectionId::new(self.next_id);
        self.opened
            .push((id, endpoint.to_string(), protocol.to_string()));
        Ok(id)
    }

    fn send(&mut self, connection: ConnectionId, payload: &str) -> Result<(), TransportError> {
        self.sent.push((connection, payload.to_string()));
        Ok(())
    }

    fn close(&mut self, connection: ConnectionId) {
        self.closed.push(connection);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeTimer {
    pub delay: Duration,
    pub repeating: bool,
}

/// Keeps scheduled timers in a map; tests fire them by hand
#[derive(Debug, Default)]
pub struct FakeScheduler {
    next_id: u64,
    pub active: BTreeMap<TimerId, FakeTimer>,
    pub cancelled: Vec<TimerId>,
}

impl FakeScheduler {
    pub fn one_shots(&self) -> Vec<(TimerId, FakeTimer)> {
        self.timers(false)
    }

    pub fn intervals(&self) -> Vec<(TimerId, FakeTimer)> {
        self.timers(true)
    }

    /// Mark a timer as fired, dropping it if it was one-shot
    pub fn fire(&mut self, timer: TimerId) {
        if let Some(t) = self.active.get(&timer) {
            if !t.repeating {
                self.active.remove(&timer);
            }
        }
    }

    fn timers(&self, repeating: bool) -> Vec<(TimerId, FakeTimer)> {
        self.active
            .iter()
            .filter(|(_, t)| t.repeating == repeating)
            .map(|(id, t)| (*id, *t))
            .collect()
    }

    fn insert(&mut self, delay: Duration, repeating: bool) -> TimerId {
        self.next_id += 1;
        let id = TimerId::new(self.next_id);
        self.active.insert(id, FakeTimer { delay, repeating });
        id
    }
}

impl Scheduler for FakeScheduler {
    fn start_after(&mut self, delay: Duration) -> TimerId {
        self.insert(delay, false)
    }

    fn start_interval(&mut self, period: Duration) -> TimerId {
        self.insert(period, true)
    }

    fn cancel(&mut self, timer: TimerId) {
        if self.active.remove(&timer).is_some() {
            self.cancelled.push(timer);
        }
    }
}
