//! Connection Manager
//!
//! Owns the single notifications socket. Each connection attempt runs in its
//! own task which performs the handshake, pumps inbound frames through the
//! router into the dispatcher, writes outbound frames, and sends heartbeats.
//! When the socket closes the task reports the close code back here, where
//! the reconnect decision is made.
//!
//! Every connect and disconnect bumps a generation counter. A socket task
//! only mutates shared state while its generation is current, so a socket
//! superseded by `disconnect()` can still report `disconnected` but can never
//! schedule a reconnect.

use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

use super::backoff::{
    CloseDisposition, ReconnectPolicy, ABNORMAL_CLOSURE, DEFAULT_AUTH_CLOSE_CODES,
    NORMAL_CLOSURE, NO_STATUS_RECEIVED,
};
use super::error::{ConnectionError, ConnectionResult};
use super::state::{ConnectionState, ConnectionStatus};
use super::url::{derive_ws_url, with_token, DEFAULT_WS_PATH};
use crate::auth::TokenProvider;
use crate::dispatcher::{route_text, Event, EventDispatcher, EventKind, Routed, Subscription};
use crate::protocol::OutboundFrame;

/// How long to wait for the server's close reply after sending a close frame
const CLOSE_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(1);

const CLIENT_DISCONNECT_REASON: &str = "Client disconnect";

/// Runtime configuration for the connection manager
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Path of the notifications endpoint, appended to the derived host
    pub ws_path: String,
    pub reconnect: ReconnectPolicy,
    /// Interval between `{"type": "ping"}` frames while open
    pub heartbeat_interval: Duration,
    /// Close and reconnect if no pong arrives this long after a ping
    pub pong_timeout: Option<Duration>,
    /// Close codes treated as a rejected token
    pub auth_close_codes: Vec<u16>,
    /// Pause between the disconnect and connect halves of `reconnect()`
    pub reconnect_settle: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            ws_path: DEFAULT_WS_PATH.to_string(),
            reconnect: ReconnectPolicy::default(),
            heartbeat_interval: Duration::from_secs(30),
            pong_timeout: None,
            auth_close_codes: DEFAULT_AUTH_CLOSE_CODES.to_vec(),
            reconnect_settle: Duration::from_millis(100),
        }
    }
}

/// Instructions from the public API to the socket task
enum Command {
    Send(String),
    Close { code: u16, reason: String },
}

/// Manages one authenticated notifications socket
///
/// Cloning yields another handle to the same connection.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

struct Inner {
    config: ConnectionConfig,
    tokens: Arc<dyn TokenProvider>,
    dispatcher: EventDispatcher,
    shared: Mutex<Shared>,
}

/// Mutable connection bookkeeping. Never held across an await or an emit.
struct Shared {
    url: Option<String>,
    state: ConnectionState,
    reconnect_attempts: u32,
    generation: u64,
    commands: Option<mpsc::UnboundedSender<Command>>,
    reconnect_timer: Option<JoinHandle<()>>,
    /// Generation of a socket still completing its close handshake
    closing: Option<u64>,
}

impl ConnectionManager {
    pub fn new(
        config: ConnectionConfig,
        tokens: Arc<dyn TokenProvider>,
        dispatcher: EventDispatcher,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                tokens,
                dispatcher,
                shared: Mutex::new(Shared {
                    url: None,
                    state: ConnectionState::Disconnected,
                    reconnect_attempts: 0,
                    generation: 0,
                    commands: None,
                    reconnect_timer: None,
                    closing: None,
                }),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.inner
            .shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.inner.config
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.inner.dispatcher
    }

    /// Register a listener on the underlying dispatcher
    pub fn on<F>(&self, kind: EventKind, callback: F) -> Subscription
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.inner.dispatcher.on(kind, callback)
    }

    /// Derived WebSocket URL (without token), once initialized
    pub fn url(&self) -> Option<String> {
        self.lock().url.clone()
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.lock().reconnect_attempts
    }

    pub fn status(&self) -> ConnectionStatus {
        let shared = self.lock();
        ConnectionStatus::from_state(shared.state, shared.closing.is_some())
    }

    /// Point the manager at `base_url` and connect
    ///
    /// A no-op if already connected or connecting to the same derived URL.
    /// When no access token is available the attempt is logged and abandoned;
    /// call again once the user has authenticated.
    pub async fn initialize(&self, base_url: &str, ws_path: &str) -> ConnectionResult<()> {
        let url = derive_ws_url(base_url, ws_path)?;

        let switching = {
            let shared = self.lock();
            let active = shared.state != ConnectionState::Disconnected;
            if active && shared.url.as_deref() == Some(url.as_str()) {
                tracing::debug!(url = %url, "Already connected, initialize is a no-op");
                return Ok(());
            }
            active
        };

        if switching {
            tracing::info!(url = %url, "Endpoint changed, closing current socket");
            self.disconnect();
        }

        self.lock().url = Some(url);
        self.connect().await;
        Ok(())
    }

    /// Open the socket if it is not already connecting or open
    pub async fn connect(&self) {
        self.connect_inner(None).await;
    }

    /// `expected_generation` is set by reconnect timers; a disconnect or
    /// manual connect since scheduling makes the timer's attempt obsolete.
    async fn connect_inner(&self, expected_generation: Option<u64>) {
        let url = {
            let shared = self.lock();
            if shared.state != ConnectionState::Disconnected {
                tracing::debug!(state = %shared.state, "Connect skipped, socket already active");
                return;
            }
            match &shared.url {
                Some(url) => url.clone(),
                None => {
                    tracing::warn!("Connect called before initialize, no endpoint configured");
                    return;
                }
            }
        };

        let Some(token) = self.inner.tokens.access_token().await else {
            tracing::warn!(url = %url, "No access token available, not connecting");
            return;
        };

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (generation, attempt) = {
            let mut shared = self.lock();

            // State may have moved while the token was being fetched
            if shared.state != ConnectionState::Disconnected
                || shared.url.as_deref() != Some(url.as_str())
            {
                return;
            }
            if let Some(expected) = expected_generation {
                if shared.generation != expected {
                    tracing::debug!("Reconnect timer superseded, skipping attempt");
                    return;
                }
            }

            if let Some(timer) = shared.reconnect_timer.take() {
                timer.abort();
            }
            shared.generation += 1;
            shared.state = ConnectionState::Connecting;
            shared.commands = Some(command_tx);
            (shared.generation, shared.reconnect_attempts)
        };

        tracing::info!(url = %url, attempt, "Connecting to notifications endpoint");

        let manager = self.clone();
        let request_url = with_token(&url, &token);
        tokio::spawn(async move {
            manager.run_socket(generation, request_url, command_rx).await;
        });
    }

    /// Close the socket with code 1000 and cancel any pending reconnect
    ///
    /// Listener registrations are kept.
    pub fn disconnect(&self) {
        let previous = {
            let mut shared = self.lock();

            if let Some(timer) = shared.reconnect_timer.take() {
                timer.abort();
            }

            let socket_generation = shared.generation;
            shared.generation += 1;
            shared.reconnect_attempts = 0;
            let previous = shared.state;
            shared.state = ConnectionState::Disconnected;

            if let Some(commands) = shared.commands.take() {
                let close = Command::Close {
                    code: NORMAL_CLOSURE,
                    reason: CLIENT_DISCONNECT_REASON.to_string(),
                };
                if commands.send(close).is_ok() {
                    shared.closing = Some(socket_generation);
                }
            }
            previous
        };

        tracing::info!(previous = %previous, "Disconnected from notifications endpoint");
    }

    /// Disconnect, let the socket settle, then connect again
    pub async fn reconnect(&self) {
        self.disconnect();
        tokio::time::sleep(self.inner.config.reconnect_settle).await;
        self.connect().await;
    }

    /// Serialize `data` as JSON and write it if the socket is open
    ///
    /// Fire-and-forget: when the socket is not open the message is logged and
    /// dropped, never queued.
    pub fn send<T: Serialize + ?Sized>(&self, data: &T) -> ConnectionResult<()> {
        let text = serde_json::to_string(data).map_err(|e| {
            tracing::warn!(error = %e, "Failed to serialize outbound message");
            ConnectionError::from(e)
        })?;

        let shared = self.lock();
        let sender = match (&shared.state, &shared.commands) {
            (ConnectionState::Connected, Some(sender)) => sender,
            _ => {
                tracing::warn!(state = %shared.state, "Socket not open, dropping message");
                return Err(ConnectionError::NotConnected);
            }
        };

        sender.send(Command::Send(text)).map_err(|_| {
            tracing::warn!("Socket task gone, dropping message");
            ConnectionError::NotConnected
        })
    }

    /// Body of the per-connection socket task
    async fn run_socket(
        self,
        generation: u64,
        request_url: String,
        mut commands: mpsc::UnboundedReceiver<Command>,
    ) {
        let connection_id = Uuid::new_v4();

        let ws = tokio::select! {
            result = tokio_tungstenite::connect_async(request_url.as_str()) => match result {
                Ok((ws, _response)) => ws,
                Err(e) => {
                    tracing::error!(%connection_id, error = %e, "WebSocket connection failed");
                    self.inner.dispatcher.emit(Event::error(e.to_string()));
                    self.handle_close(generation, ABNORMAL_CLOSURE, e.to_string());
                    return;
                }
            },
            command = commands.recv() => {
                let (code, reason) = match command {
                    Some(Command::Close { code, reason }) => (code, reason),
                    _ => (NORMAL_CLOSURE, CLIENT_DISCONNECT_REASON.to_string()),
                };
                tracing::debug!(%connection_id, code, reason = %reason, "Connect cancelled before handshake completed");
                self.abandon_handshake(generation);
                return;
            }
        };

        let (mut sink, mut stream) = ws.split();

        if !self.mark_open(generation) {
            // disconnect() won the race against the handshake
            let _ = sink.send(close_message(NORMAL_CLOSURE, CLIENT_DISCONNECT_REASON)).await;
            tracing::debug!(%connection_id, "Socket opened after disconnect, closed unannounced");
            self.abandon_handshake(generation);
            return;
        }

        tracing::info!(%connection_id, "WebSocket connected");
        self.inner.dispatcher.emit(Event::Connected);

        let heartbeat_interval = self
            .inner
            .config
            .heartbeat_interval
            .max(Duration::from_millis(1));
        let pong_timeout = self.inner.config.pong_timeout;
        let mut heartbeat =
            tokio::time::interval_at(Instant::now() + heartbeat_interval, heartbeat_interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut awaiting_pong_since: Option<Instant> = None;

        let (code, reason) = loop {
            let pong_deadline = async move {
                match (awaiting_pong_since, pong_timeout) {
                    (Some(since), Some(timeout)) => tokio::time::sleep_until(since + timeout).await,
                    _ => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        if self.handle_text(&connection_id, &text) {
                            awaiting_pong_since = None;
                        }
                    }
                    Some(Ok(Message::Binary(data))) => {
                        tracing::debug!(%connection_id, bytes = data.len(), "Ignoring binary frame");
                    }
                    Some(Ok(Message::Close(frame))) => {
                        break frame
                            .map(|f| (u16::from(f.code), f.reason.into_owned()))
                            .unwrap_or((NO_STATUS_RECEIVED, String::new()));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!(%connection_id, error = %e, "WebSocket error");
                        self.inner.dispatcher.emit(Event::error(e.to_string()));
                        break (ABNORMAL_CLOSURE, String::new());
                    }
                    None => break (ABNORMAL_CLOSURE, String::new()),
                },
                command = commands.recv() => match command {
                    Some(Command::Send(text)) => {
                        if let Err(e) = sink.send(Message::Text(text)).await {
                            tracing::error!(%connection_id, error = %e, "WebSocket write failed");
                            self.inner.dispatcher.emit(Event::error(e.to_string()));
                            break (ABNORMAL_CLOSURE, String::new());
                        }
                    }
                    Some(Command::Close { code, reason }) => {
                        let _ = sink.send(close_message(code, &reason)).await;
                        // Give the server a moment to answer the close handshake
                        let _ = tokio::time::timeout(CLOSE_HANDSHAKE_TIMEOUT, async {
                            while let Some(Ok(_)) = stream.next().await {}
                        })
                        .await;
                        break (code, reason);
                    }
                    None => {
                        let _ = sink.send(close_message(NORMAL_CLOSURE, CLIENT_DISCONNECT_REASON)).await;
                        break (NORMAL_CLOSURE, CLIENT_DISCONNECT_REASON.to_string());
                    }
                },
                _ = heartbeat.tick() => {
                    let ping = match OutboundFrame::Ping.to_json() {
                        Ok(ping) => ping,
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to encode heartbeat");
                            continue;
                        }
                    };
                    tracing::trace!(%connection_id, "Sending heartbeat");
                    if let Err(e) = sink.send(Message::Text(ping)).await {
                        tracing::error!(%connection_id, error = %e, "Heartbeat write failed");
                        self.inner.dispatcher.emit(Event::error(e.to_string()));
                        break (ABNORMAL_CLOSURE, String::new());
                    }
                    if awaiting_pong_since.is_none() {
                        awaiting_pong_since = Some(Instant::now());
                    }
                }
                _ = pong_deadline => {
                    tracing::warn!(%connection_id, "No pong received in time, dropping connection");
                    let _ = sink.close().await;
                    break (ABNORMAL_CLOSURE, "heartbeat timeout".to_string());
                }
            }
        };

        self.handle_close(generation, code, reason);
    }

    /// Route one text frame. Returns true if it was a heartbeat ack.
    fn handle_text(&self, connection_id: &Uuid, text: &str) -> bool {
        match route_text(text) {
            Routed::Heartbeat => {
                tracing::trace!(%connection_id, "Pong received");
                true
            }
            Routed::Event(event) => {
                tracing::debug!(%connection_id, event = %event.kind(), "Frame received");
                self.inner.dispatcher.emit(event);
                false
            }
            Routed::Dropped(e) => {
                tracing::warn!(%connection_id, error = %e, "Dropping undecodable frame");
                false
            }
        }
    }

    /// Record a completed handshake. False if this socket is already stale.
    fn mark_open(&self, generation: u64) -> bool {
        let mut shared = self.lock();
        if shared.generation != generation {
            return false;
        }
        shared.state = ConnectionState::Connected;
        shared.reconnect_attempts = 0;
        true
    }

    /// Socket `generation` went away before `connected` was emitted
    ///
    /// Nothing is emitted and no reconnect is scheduled.
    fn abandon_handshake(&self, generation: u64) {
        let mut shared = self.lock();
        if shared.closing == Some(generation) {
            shared.closing = None;
        }
        if shared.generation == generation {
            shared.state = ConnectionState::Disconnected;
            shared.commands = None;
        }
    }

    /// Socket `generation` closed with `code`; decide whether to reconnect
    fn handle_close(&self, generation: u64, code: u16, reason: String) {
        let current = {
            let mut shared = self.lock();
            if shared.closing == Some(generation) {
                shared.closing = None;
            }
            if shared.generation == generation {
                shared.state = ConnectionState::Disconnected;
                shared.commands = None;
                true
            } else {
                false
            }
        };

        tracing::info!(code, reason = %reason, "WebSocket closed");
        self.inner
            .dispatcher
            .emit(Event::disconnected(code, reason));

        if !current {
            return;
        }

        match CloseDisposition::classify(code, &self.inner.config.auth_close_codes) {
            CloseDisposition::Normal => {
                self.lock().reconnect_attempts = 0;
            }
            CloseDisposition::AuthFailure => {
                tracing::warn!(code, "Server rejected the access token, retrying with a fresh one");
                self.lock().reconnect_attempts = 0;
                self.schedule_reconnect(generation);
            }
            CloseDisposition::Abnormal => self.schedule_reconnect(generation),
        }
    }

    /// Arm the backoff timer, or give up once attempts are exhausted
    fn schedule_reconnect(&self, generation: u64) {
        let policy = &self.inner.config.reconnect;

        let scheduled = {
            let mut shared = self.lock();

            // A listener may have reconnected or disconnected in the meantime
            if shared.generation != generation || shared.state != ConnectionState::Disconnected {
                return;
            }

            if shared.reconnect_attempts >= policy.max_attempts {
                Err(shared.reconnect_attempts)
            } else {
                shared.reconnect_attempts += 1;
                let attempt = shared.reconnect_attempts;
                let delay = policy.delay_for(attempt);

                let deadline = Instant::now() + delay;
                let manager = self.clone();
                let timer = tokio::spawn(async move {
                    tokio::time::sleep_until(deadline).await;
                    {
                        let mut shared = manager.lock();
                        if shared.generation != generation {
                            return;
                        }
                        // Detach so connect() does not abort this task
                        shared.reconnect_timer = None;
                    }
                    manager.connect_inner(Some(generation)).await;
                });

                if let Some(previous) = shared.reconnect_timer.replace(timer) {
                    previous.abort();
                }
                Ok((attempt, delay))
            }
        };

        match scheduled {
            Ok((attempt, delay)) => {
                tracing::info!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Scheduling reconnect"
                );
            }
            Err(attempts) => {
                tracing::warn!(attempts, "Max reconnect attempts reached, giving up");
                self.inner
                    .dispatcher
                    .emit(Event::ReconnectFailed { attempts });
            }
        }
    }
}

fn close_message(code: u16, reason: &str) -> Message {
    Message::Close(Some(CloseFrame {
        code: CloseCode::from(code),
        reason: reason.to_string().into(),
    }))
}
