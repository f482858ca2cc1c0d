//! Local WebSocket server and event helpers shared by the integration tests

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use notifylink::connection::{ConnectionConfig, ReconnectPolicy};
use notifylink::{ConnectionManager, Event, EventDispatcher, EventKind, StaticToken};

pub const WAIT: Duration = Duration::from_secs(5);

pub type ServerSocket = WebSocketStream<TcpStream>;

/// One accepted client socket and the request URI it used
pub struct Accepted {
    pub uri: String,
    pub ws: ServerSocket,
}

pub struct TestServer {
    pub port: u16,
    accepted: mpsc::UnboundedReceiver<Accepted>,
    task: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, accepted) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let uri = Arc::new(Mutex::new(String::new()));
                let uri_slot = Arc::clone(&uri);
                let callback =
                    move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
                        *uri_slot.lock().unwrap() = request.uri().to_string();
                        Ok(response)
                    };
                if let Ok(ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await {
                    let uri = uri.lock().unwrap().clone();
                    let _ = tx.send(Accepted { uri, ws });
                }
            }
        });

        Self {
            port,
            accepted,
            task,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}/api", self.port)
    }

    /// Next accepted socket, failing the test after [`WAIT`]
    pub async fn accept(&mut self) -> Accepted {
        tokio::time::timeout(WAIT, self.accepted.recv())
            .await
            .expect("timed out waiting for a client connection")
            .expect("server stopped")
    }

    /// Next accepted socket within `within`, if any
    pub async fn try_accept(&mut self, within: Duration) -> Option<Accepted> {
        tokio::time::timeout(within, self.accepted.recv())
            .await
            .ok()
            .flatten()
    }

    /// Stop listening; later connection attempts are refused
    pub async fn shutdown(&mut self) {
        self.task.abort();
        let _ = (&mut self.task).await;
    }
}

/// Backoff and heartbeat short enough for real-time tests
pub fn fast_config() -> ConnectionConfig {
    ConnectionConfig {
        reconnect: ReconnectPolicy {
            base_delay: Duration::from_millis(20),
            max_delay: Duration::from_millis(200),
            max_attempts: 5,
        },
        ..ConnectionConfig::default()
    }
}

pub fn manager(config: ConnectionConfig, token: &str) -> ConnectionManager {
    ConnectionManager::new(config, Arc::new(StaticToken::new(token)), EventDispatcher::new())
}

/// Receive events until one of `kind` arrives
pub async fn expect_event(events: &mut broadcast::Receiver<Event>, kind: EventKind) -> Event {
    let wait = async {
        loop {
            match events.recv().await {
                Ok(event) if event.kind() == kind => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event stream closed"),
            }
        }
    };
    tokio::time::timeout(WAIT, wait)
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {}", kind))
}

/// Next frame the client wrote
pub async fn next_message(ws: &mut ServerSocket) -> Message {
    tokio::time::timeout(WAIT, ws.next())
        .await
        .expect("timed out waiting for a client frame")
        .expect("client socket ended")
        .expect("client socket errored")
}

/// Next text frame that is not a heartbeat
pub async fn next_text(ws: &mut ServerSocket) -> String {
    loop {
        if let Message::Text(text) = next_message(ws).await {
            if text != r#"{"type":"ping"}"# {
                return text;
            }
        }
    }
}

pub async fn send_json(ws: &mut ServerSocket, value: serde_json::Value) {
    send_raw(ws, &value.to_string()).await;
}

pub async fn send_raw(ws: &mut ServerSocket, text: &str) {
    ws.send(Message::Text(text.to_string())).await.unwrap();
}

/// Read and discard client frames in the background until the socket ends
pub fn drain(mut ws: ServerSocket) {
    tokio::spawn(async move { while let Some(Ok(_)) = ws.next().await {} });
}

/// Send a close frame and keep reading so the handshake completes
pub async fn close_with(mut ws: ServerSocket, code: u16, reason: &str) {
    ws.send(Message::Close(Some(CloseFrame {
        code: CloseCode::from(code),
        reason: reason.to_string().into(),
    })))
    .await
    .unwrap();
    drain(ws);
}
