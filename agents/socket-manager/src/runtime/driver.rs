//! Runtime Driver
//!
//! Runs a [`ConnectionManager`] inside a single tokio task. Caller commands,
//! transport events and timer firings are funnelled through channels and
//! processed one at a time, so the manager never needs a lock.

use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::connection::manager::{ConnectionManager, MessageHandler, Status};
use crate::connection::settings::ConnectionSettings;
use crate::timer::task::TokioScheduler;
use crate::timer::TimerId;
use crate::transport::websocket::{WebSocketTransport, DEFAULT_CONNECT_TIMEOUT};
use crate::transport::TransportEvent;

type Manager = ConnectionManager<WebSocketTransport, TokioScheduler>;

#[derive(Debug)]
enum Command {
    Initialize,
    Send(String),
    Close,
    Shutdown,
}

/// Cloneable handle to a running connection manager
#[derive(Clone)]
pub struct SocketManager {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<Status>,
}

impl SocketManager {
    /// Start building a manager for `endpoint`
    pub fn builder(endpoint: impl Into<String>, client_id: impl Into<String>) -> SocketManagerBuilder {
        SocketManagerBuilder::new(endpoint, client_id)
    }

    /// Validate the settings and start connecting
    pub fn initialize(&self) {
        self.dispatch(Command::Initialize);
    }

    /// Send a text payload; dropped with a warning unless the connection is open
    pub fn send_message(&self, payload: impl Into<String>) {
        self.dispatch(Command::Send(payload.into()));
    }

    /// Close the connection and stop all timers. The task keeps running and
    /// can be initialized again.
    pub fn close(&self) {
        self.dispatch(Command::Close);
    }

    /// Close the connection and stop the task
    pub fn shutdown(&self) {
        self.dispatch(Command::Shutdown);
    }

    /// Current state and reconnect attempt count
    pub fn status(&self) -> Status {
        *self.status.borrow()
    }

    /// Subscribe to status changes
    pub fn status_receiver(&self) -> watch::Receiver<Status> {
        self.status.clone()
    }

    fn dispatch(&self, command: Command) {
        if self.commands.send(command).is_err() {
            warn!("Connection manager task has stopped, command dropped");
        }
    }
}

/// Builder for [`SocketManager`]
pub struct SocketManagerBuilder {
    settings: ConnectionSettings,
    connect_timeout: Duration,
    on_message: Option<MessageHandler>,
}

impl SocketManagerBuilder {
    pub fn new(endpoint: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self::from_settings(ConnectionSettings::new(endpoint, client_id))
    }

    pub fn from_settings(settings: ConnectionSettings) -> Self {
        Self {
            settings,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            on_message: None,
        }
    }

    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.settings.heartbeat_interval = interval;
        self
    }

    pub fn heartbeat_payload(mut self, payload: impl Into<String>) -> Self {
        self.settings.heartbeat_payload = payload.into();
        self
    }

    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.settings.reconnect_delay = delay;
        self
    }

    pub fn max_reconnect_attempts(mut self, max: u32) -> Self {
        self.settings.max_reconnect_attempts = max;
        self
    }

    pub fn reset_attempts_on_open(mut self, reset: bool) -> Self {
        self.settings.reset_attempts_on_open = reset;
        self
    }

    pub fn connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn on_message<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.on_message = Some(Box::new(handler));
        self
    }

    /// Spawn the driver task. Must be called within a tokio runtime.
    pub fn spawn(self) -> (SocketManager, JoinHandle<()>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let transport = WebSocketTransport::new(event_tx).with_connect_timeout(self.connect_timeout);
        let scheduler = TokioScheduler::new(timer_tx);
        let manager = ConnectionManager::new(self.settings, transport, scheduler)
            .with_boxed_handler(self.on_message);

        let (status_tx, status_rx) = watch::channel(manager.status());
        let task = tokio::spawn(run(manager, command_rx, event_rx, timer_rx, status_tx));

        let handle = SocketManager {
            commands: command_tx,
            status: status_rx,
        };
        (handle, task)
    }
}

/// Process commands, transport events and timer firings until shutdown or
/// until every handle is dropped
async fn run(
    mut manager: Manager,
    mut commands: mpsc::UnboundedReceiver<Command>,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
    mut timers: mpsc::UnboundedReceiver<TimerId>,
    status: watch::Sender<Status>,
) {
    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Initialize) => manager.initialize(),
                Some(Command::Send(payload)) => manager.send_message(&payload),
                Some(Command::Close) => manager.close(),
                Some(Command::Shutdown) | None => {
                    manager.close();
                    break;
                }
            },
            Some(event) = events.recv() => manager.handle_event(event),
            Some(timer) = timers.recv() => manager.handle_timer(timer),
        }
        status.send_replace(manager.status());
    }

    status.send_replace(manager.status());
    info!(endpoint = %manager.settings().endpoint, "Connection manager stopped");
}
