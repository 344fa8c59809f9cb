//! End-to-end behaviour against a local WebSocket server.

use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::Message;

use socket_manager::{ConnectionState, SocketManager};

const WAIT: Duration = Duration::from_secs(5);

/// Accepts connections forever. For each one it reports the offered
/// sub-protocol, greets with "welcome", forwards every text frame it receives
/// and closes the connection once it sees "hello".
async fn spawn_server() -> (String, mpsc::UnboundedReceiver<String>, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (protocol_tx, protocol_rx) = mpsc::unbounded_channel();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let protocol_tx = protocol_tx.clone();
            let inbound_tx = inbound_tx.clone();
            tokio::spawn(async move {
                let callback = move |request: &Request, mut response: Response| -> Result<Response, ErrorResponse> {
                    let offered = request.headers().get(SEC_WEBSOCKET_PROTOCOL).cloned();
                    if let Some(protocol) = offered {
                        let _ = protocol_tx.send(protocol.to_str().unwrap_or_default().to_string());
                        response.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, protocol);
                    }
                    Ok(response)
                };
                let Ok(mut ws) = accept_hdr_async(stream, callback).await else {
                    return;
                };

                if ws.send(Message::Text("welcome".into())).await.is_err() {
                    return;
                }
                while let Some(Ok(msg)) = ws.next().await {
                    if let Message::Text(text) = msg {
                        let text = text.to_string();
                        let _ = inbound_tx.send(text.clone());
                        if text == "hello" {
                            let _ = ws.close(None).await;
                        }
                    }
                }
            });
        }
    });

    (format!("ws://{}/ws", addr), protocol_rx, inbound_rx)
}

#[tokio::test]
async fn test_relays_messages_and_reconnects_after_server_close() {
    let (endpoint, mut protocols, mut inbound) = spawn_server().await;
    let (received_tx, mut received) = mpsc::unbounded_channel();

    let (manager, task) = SocketManager::builder(endpoint, "u1")
        .heartbeat_interval(Duration::from_millis(50))
        .reconnect_delay(Duration::from_millis(20))
        .on_message(move |payload| {
            let _ = received_tx.send(payload.to_string());
        })
        .spawn();
    manager.initialize();

    // First connection presents the session token
    let protocol = timeout(WAIT, protocols.recv()).await.unwrap().unwrap();
    assert!(protocol.starts_with("u1-"));
    assert_eq!(timeout(WAIT, received.recv()).await.unwrap().unwrap(), "welcome");
    assert_eq!(manager.status().state, ConnectionState::Open);

    // Heartbeats arrive while open
    loop {
        let text = timeout(WAIT, inbound.recv()).await.unwrap().unwrap();
        if text == "ping" {
            break;
        }
    }

    // The server closes after "hello"; the manager redials with a new token
    manager.send_message("hello");
    loop {
        let text = timeout(WAIT, inbound.recv()).await.unwrap().unwrap();
        if text == "hello" {
            break;
        }
    }

    let second = timeout(WAIT, protocols.recv()).await.unwrap().unwrap();
    assert!(second.starts_with("u1-"));
    assert_ne!(second, protocol);
    assert_eq!(timeout(WAIT, received.recv()).await.unwrap().unwrap(), "welcome");

    // Opening again does not reset the attempt counter
    let status = manager.status();
    assert_eq!(status.state, ConnectionState::Open);
    assert_eq!(status.reconnect_attempts, 1);

    manager.close();
    let mut status_rx = manager.status_receiver();
    let closed = timeout(WAIT, status_rx.wait_for(|s| s.state == ConnectionState::Idle))
        .await
        .unwrap()
        .map(|s| *s)
        .unwrap();
    assert_eq!(closed.reconnect_attempts, 0);

    // No redial after an explicit close
    assert!(timeout(Duration::from_millis(200), protocols.recv()).await.is_err());

    manager.shutdown();
    timeout(WAIT, task).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_send_before_open_is_dropped() {
    let (endpoint, mut protocols, mut inbound) = spawn_server().await;

    let (manager, task) = SocketManager::builder(endpoint, "u1").spawn();
    manager.send_message("too early");
    manager.initialize();

    timeout(WAIT, protocols.recv()).await.unwrap().unwrap();
    let mut status_rx = manager.status_receiver();
    timeout(WAIT, status_rx.wait_for(|s| s.state == ConnectionState::Open))
        .await
        .unwrap()
        .unwrap();

    manager.send_message("on time");
    assert_eq!(timeout(WAIT, inbound.recv()).await.unwrap().unwrap(), "on time");

    manager.shutdown();
    timeout(WAIT, task).await.unwrap().unwrap();
}
