//! WebSocket Transport
//!
//! [`Transport`] implementation over tokio-tungstenite. Every connection runs
//! in its own task and reports back through an event channel.

use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use super::{ConnectionId, Transport, TransportError, TransportEvent};

/// Default time allowed for the opening handshake
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Commands from the transport to a connection task
#[derive(Debug)]
enum Outbound {
    Text(String),
    Close,
}

/// WebSocket transport spawning one task per connection
pub struct WebSocketTransport {
    next_id: u64,
    connect_timeout: Duration,
    connections: HashMap<ConnectionId, mpsc::UnboundedSender<Outbound>>,
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl WebSocketTransport {
    /// Create a transport reporting on `events`
    pub fn new(events: mpsc::UnboundedSender<TransportEvent>) -> Self {
        Self {
            next_id: 0,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            connections: HashMap::new(),
            events,
        }
    }

    /// Set the opening handshake timeout
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }
}

impl Transport for WebSocketTransport {
    fn open(&mut self, endpoint: &str, protocol: &str) -> Result<ConnectionId, TransportError> {
        let request = build_request(endpoint, protocol)?;

        // Tasks drop their receiver when they end
        self.connections.retain(|_, tx| !tx.is_closed());

        self.next_id += 1;
        let id = ConnectionId::new(self.next_id);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        tokio::spawn(run_connection(
            id,
            request,
            self.connect_timeout,
            outbound_rx,
            self.events.clone(),
        ));
        self.connections.insert(id, outbound_tx);

        debug!(connection = %id, endpoint, "Opening WebSocket connection");
        Ok(id)
    }

    fn send(&mut self, connection: ConnectionId, payload: &str) -> Result<(), TransportError> {
        let tx = self
            .connections
            .get(&connection)
            .ok_or(TransportError::UnknownConnection(connection))?;
        tx.send(Outbound::Text(payload.to_string()))
            .map_err(|_| TransportError::Closed(connection))
    }

    fn close(&mut self, connection: ConnectionId) {
        if let Some(tx) = self.connections.remove(&connection) {
            // The task may already be gone
            let _ = tx.send(Outbound::Close);
        }
    }
}

/// Build the upgrade request carrying the session token as sub-protocol
fn build_request(endpoint: &str, protocol: &str) -> Result<Request, TransportError> {
    let mut request =
        endpoint
            .into_client_request()
            .map_err(|e| TransportError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;
    let value = HeaderValue::from_str(protocol)
        .map_err(|e| TransportError::InvalidProtocol(e.to_string()))?;
    request.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, value);
    Ok(request)
}

/// Drive a single connection until it closes
async fn run_connection(
    id: ConnectionId,
    request: Request,
    connect_timeout: Duration,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let emit = |event: TransportEvent| {
        // The driver is gone, nobody is listening
        let _ = events.send(event);
    };

    // Frames queued while the handshake is still running
    let mut pending: Vec<String> = Vec::new();
    let handshake = timeout(connect_timeout, connect_async(request));
    tokio::pin!(handshake);

    let ws_stream = loop {
        tokio::select! {
            result = &mut handshake => match result {
                Ok(Ok((stream, _response))) => break stream,
                Ok(Err(e)) => {
                    emit(TransportEvent::error(id, format!("failed to connect: {}", e)));
                    emit(TransportEvent::close(id, None, "connection failed"));
                    return;
                }
                Err(_) => {
                    emit(TransportEvent::error(id, "connection timeout"));
                    emit(TransportEvent::close(id, None, "connection timeout"));
                    return;
                }
            },

            outgoing = outbound.recv() => match outgoing {
                Some(Outbound::Text(text)) => pending.push(text),
                Some(Outbound::Close) | None => {
                    debug!(connection = %id, "Connection released during handshake");
                    emit(TransportEvent::close(id, None, "closed by client"));
                    return;
                }
            },
        }
    };

    info!(connection = %id, "WebSocket connection established");
    emit(TransportEvent::open(id));

    let (mut write, mut read) = ws_stream.split();
    let mut close_code: Option<u16> = None;
    let mut close_reason = String::new();

    for text in pending {
        if let Err(e) = write.send(Message::Text(text.into())).await {
            emit(TransportEvent::error(id, e.to_string()));
            emit(TransportEvent::close(id, None, "send failed"));
            return;
        }
    }

    loop {
        tokio::select! {
            // Handle incoming messages
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        emit(TransportEvent::message(id, text.to_string()));
                    }
                    Some(Ok(Message::Binary(data))) => {
                        emit(TransportEvent::message(id, String::from_utf8_lossy(&data).into_owned()));
                    }
                    Some(Ok(Message::Close(frame))) => {
                        debug!(connection = %id, ?frame, "Received close frame");
                        if let Some(frame) = frame {
                            close_code = Some(frame.code.into());
                            close_reason = frame.reason.to_string();
                        }
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {
                        // Pings are answered by tungstenite itself
                    }
                    Some(Err(e)) => {
                        warn!(connection = %id, error = %e, "WebSocket error");
                        emit(TransportEvent::error(id, e.to_string()));
                        break;
                    }
                    None => {
                        debug!(connection = %id, "WebSocket stream ended");
                        break;
                    }
                }
            }

            // Handle outgoing frames and close requests
            outgoing = outbound.recv() => {
                match outgoing {
                    Some(Outbound::Text(text)) => {
                        if let Err(e) = write.send(Message::Text(text.into())).await {
                            emit(TransportEvent::error(id, e.to_string()));
                            break;
                        }
                    }
                    Some(Outbound::Close) | None => {
                        debug!(connection = %id, "Closing WebSocket connection");
                        let _ = write.send(Message::Close(None)).await;
                        close_reason = "closed by client".to_string();
                        break;
                    }
                }
            }
        }
    }

    emit(TransportEvent::close(id, close_code, close_reason));
}
