//! Connection Manager
//!
//! Keeps one connection to a remote endpoint alive: opens it, probes it with
//! a heartbeat while it is open, and redials after a fixed delay when it
//! drops, up to a ceiling of consecutive attempts.
//!
//! The manager is a plain state machine. It never blocks and never spawns;
//! the [`Transport`] and [`Scheduler`] it is given report back through
//! [`ConnectionManager::handle_event`] and [`ConnectionManager::handle_timer`].

use tracing::{debug, error, info, warn};

use crate::connection::error::ConnectionError;
use crate::connection::settings::ConnectionSettings;
use crate::connection::state::{ConnectionState, StateTracker, StateTransition};
use crate::connection::token::session_token;
use crate::timer::{Scheduler, TimerId};
use crate::transport::{ConnectionId, Transport, TransportError, TransportEvent, TransportEventKind};

/// Callback invoked with every inbound payload
pub type MessageHandler = Box<dyn FnMut(&str) + Send + 'static>;

/// Snapshot of the manager's externally visible state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub state: ConnectionState,
    pub reconnect_attempts: u32,
}

/// Manages a single persistent connection
pub struct ConnectionManager<T: Transport, S: Scheduler> {
    settings: ConnectionSettings,
    transport: T,
    scheduler: S,
    on_message: Option<MessageHandler>,
    connection: Option<ConnectionId>,
    heartbeat_timer: Option<TimerId>,
    reconnect_timer: Option<TimerId>,
    reconnect_attempts: u32,
    state: StateTracker,
}

impl<T: Transport, S: Scheduler> ConnectionManager<T, S> {
    /// Create a new connection manager in Idle state
    pub fn new(settings: ConnectionSettings, transport: T, scheduler: S) -> Self {
        Self {
            settings,
            transport,
            scheduler,
            on_message: None,
            connection: None,
            heartbeat_timer: None,
            reconnect_timer: None,
            reconnect_attempts: 0,
            state: StateTracker::new(),
        }
    }

    /// Set the callback receiving inbound payloads
    pub fn with_message_handler<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.on_message = Some(Box::new(handler));
        self
    }

    /// Set the callback from an already boxed handler
    pub fn with_boxed_handler(mut self, handler: Option<MessageHandler>) -> Self {
        self.on_message = handler;
        self
    }

    /// Validate the settings and start the first connect cycle.
    ///
    /// Calling it again starts another cycle, replacing the current handle.
    pub fn initialize(&mut self) {
        if let Err(e) = self.try_initialize() {
            self.report(&e);
        }
    }

    pub(crate) fn try_initialize(&mut self) -> Result<(), ConnectionError> {
        self.settings.validate()?;
        info!(
            endpoint = %self.settings.endpoint,
            client_id = %self.settings.client_id,
            "Initializing connection manager"
        );
        self.connect();
        Ok(())
    }

    /// Send a payload if the connection is open, otherwise drop it
    pub fn send_message(&mut self, payload: &str) {
        if let Err(e) = self.try_send_message(payload) {
            self.report(&e);
        }
    }

    pub(crate) fn try_send_message(&mut self, payload: &str) -> Result<(), ConnectionError> {
        match self.connection {
            Some(id) if self.state.current() == ConnectionState::Open => {
                self.transport.send(id, payload)?;
                Ok(())
            }
            _ => Err(ConnectionError::SendRejected),
        }
    }

    /// Close the connection, cancel both timers and reset the attempt counter
    pub fn close(&mut self) {
        self.release_connection();
        self.cancel_reconnect();
        self.reconnect_attempts = 0;
        self.state
            .transition_to(ConnectionState::Idle, Some("Closed by caller".to_string()));
        info!(client_id = %self.settings.client_id, "Connection manager closed");
    }

    /// React to an event reported by the transport
    pub fn handle_event(&mut self, event: TransportEvent) {
        if self.connection != Some(event.connection) {
            debug!(connection = %event.connection, "Ignoring event for stale connection");
            return;
        }

        match event.kind {
            TransportEventKind::Open => self.on_open(),
            TransportEventKind::Message(payload) => self.receive_message(&payload),
            TransportEventKind::Close { code, reason } => {
                info!(connection = %event.connection, ?code, %reason, "Connection closed");
                self.connection = None;
                self.on_closed(reason);
            }
            TransportEventKind::Error(message) => {
                // The close event that follows drives recovery
                self.report(&TransportError::Failed(message).into());
            }
        }
    }

    /// React to a timer firing
    pub fn handle_timer(&mut self, timer: TimerId) {
        if self.heartbeat_timer == Some(timer) {
            debug!("Sending heartbeat");
            let payload = self.settings.heartbeat_payload.clone();
            self.send_message(&payload);
        } else if self.reconnect_timer == Some(timer) {
            self.reconnect_timer = None;
            info!(
                attempt = self.reconnect_attempts,
                max = self.settings.max_reconnect_attempts,
                "Reconnecting"
            );
            self.connect();
        } else {
            debug!(%timer, "Ignoring stale timer");
        }
    }

    /// Open a fresh transport handle with a new session token
    fn connect(&mut self) {
        self.release_connection();
        self.cancel_reconnect();

        self.state.transition_to(
            ConnectionState::Connecting,
            Some("Initiating connection".to_string()),
        );

        let token = session_token(&self.settings.client_id);
        info!(endpoint = %self.settings.endpoint, "Connecting");

        match self.transport.open(&self.settings.endpoint, &token) {
            Ok(id) => self.connection = Some(id),
            Err(e) => {
                self.report(&e.into());
                self.on_closed("Transport refused to open".to_string());
            }
        }
    }

    fn on_open(&mut self) {
        self.state.transition_to(
            ConnectionState::Open,
            Some("Connection established".to_string()),
        );
        if self.settings.reset_attempts_on_open {
            self.reconnect_attempts = 0;
        }
        info!(endpoint = %self.settings.endpoint, "Connection open");
        self.start_heartbeat();
    }

    /// Stop both timers and apply the reconnect policy
    fn on_closed(&mut self, reason: String) {
        self.stop_heartbeat();
        self.cancel_reconnect();
        self.state.transition_to(ConnectionState::Closed, Some(reason));

        let max = self.settings.max_reconnect_attempts;
        if self.reconnect_attempts < max {
            self.reconnect_attempts += 1;
            let delay = self.settings.reconnect_delay;
            self.reconnect_timer = Some(self.scheduler.start_after(delay));
            self.state.transition_to(
                ConnectionState::ReconnectPending,
                Some(format!("Reconnect attempt {} of {}", self.reconnect_attempts, max)),
            );
            info!(
                attempt = self.reconnect_attempts,
                max,
                delay_ms = delay.as_millis() as u64,
                "Waiting before reconnection attempt"
            );
        } else {
            self.reconnect_attempts = 0;
            self.state.transition_to(
                ConnectionState::GivenUp,
                Some("Max reconnect attempts reached".to_string()),
            );
            self.report(&ConnectionError::ReconnectExhausted { max });
        }
    }

    fn receive_message(&mut self, payload: &str) {
        debug!(payload, "Received message");
        if let Some(handler) = self.on_message.as_mut() {
            handler(payload);
        }
    }

    fn start_heartbeat(&mut self) {
        self.stop_heartbeat();
        self.heartbeat_timer = Some(self.scheduler.start_interval(self.settings.heartbeat_interval));
    }

    fn stop_heartbeat(&mut self) {
        if let Some(timer) = self.heartbeat_timer.take() {
            self.scheduler.cancel(timer);
        }
    }

    fn cancel_reconnect(&mut self) {
        if let Some(timer) = self.reconnect_timer.take() {
            self.scheduler.cancel(timer);
        }
    }

    /// Close and forget the current handle, if any
    fn release_connection(&mut self) {
        if let Some(id) = self.connection.take() {
            self.transport.close(id);
        }
        self.stop_heartbeat();
    }

    fn report(&self, err: &ConnectionError) {
        let client_id = &self.settings.client_id;
        match err {
            ConnectionError::SendRejected => {
                warn!(%client_id, state = %self.state.current(), error = %err, "Message dropped");
            }
            _ => error!(%client_id, error = %err, "Connection manager error"),
        }
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    pub fn state(&self) -> ConnectionState {
        self.state.current()
    }

    pub fn status(&self) -> Status {
        Status {
            state: self.state.current(),
            reconnect_attempts: self.reconnect_attempts,
        }
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    pub fn is_open(&self) -> bool {
        self.state.current() == ConnectionState::Open
    }

    pub fn heartbeat_active(&self) -> bool {
        self.heartbeat_timer.is_some()
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_timer.is_some()
    }

    /// Get recent state transitions, newest first
    pub fn recent_transitions(&self, count: usize) -> Vec<StateTransition> {
        self.state.recent_transitions(count)
    }

    #[cfg(test)]
    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }

    #[cfg(test)]
    pub(crate) fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    #[cfg(test)]
    pub(crate) fn scheduler(&self) -> &S {
        &self.scheduler
    }

    #[cfg(test)]
    pub(crate) fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }
}
