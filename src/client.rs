//! Notification Client
//!
//! Application-level context object: one connection manager, its dispatcher,
//! and the configuration they were built from. Construct it once at startup
//! and hand out clones.

use std::sync::Arc;

use crate::auth::{EnvToken, FileToken, StaticToken, TokenProvider};
use crate::config::{AuthConfig, Config};
use crate::connection::{self, ConnectionManager, ConnectionResult, ConnectionStatus};
use crate::dispatcher::{Event, EventDispatcher, EventKind, Subscription};
use crate::feed::{NotificationFeed, NotificationStore};

/// Handle to the application's notifications connection
#[derive(Clone)]
pub struct NotificationClient {
    connection: ConnectionManager,
    config: Arc<Config>,
}

impl NotificationClient {
    pub fn new(config: Config, tokens: Arc<dyn TokenProvider>) -> Self {
        let connection = ConnectionManager::new(
            connection::ConnectionConfig::from(&config.connection),
            tokens,
            EventDispatcher::new(),
        );
        Self {
            connection,
            config: Arc::new(config),
        }
    }

    /// Build the client with the token source named in `[auth]`
    pub fn from_config(config: Config) -> Self {
        let tokens = token_provider(&config.auth);
        Self::new(config, tokens)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        self.connection.dispatcher()
    }

    /// Connect to `base_url` using the configured notifications path
    pub async fn initialize(&self, base_url: &str) -> ConnectionResult<()> {
        self.connection
            .initialize(base_url, &self.config.connection.ws_path)
            .await
    }

    /// Connect to the configured `base_url`
    pub async fn start(&self) -> ConnectionResult<()> {
        self.initialize(&self.config.connection.base_url).await
    }

    pub async fn connect(&self) {
        self.connection.connect().await;
    }

    pub fn disconnect(&self) {
        self.connection.disconnect();
    }

    pub async fn reconnect(&self) {
        self.connection.reconnect().await;
    }

    pub fn send<T: serde::Serialize + ?Sized>(&self, data: &T) -> ConnectionResult<()> {
        self.connection.send(data)
    }

    pub fn status(&self) -> ConnectionStatus {
        self.connection.status()
    }

    pub fn on<F>(&self, kind: EventKind, callback: F) -> Subscription
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.connection.on(kind, callback)
    }

    /// Bind a store to this client's events
    pub fn attach_feed(&self, store: NotificationStore) -> NotificationFeed {
        NotificationFeed::attach(&self.connection, store)
    }
}

/// First configured source wins: inline token, token file, then env var
pub fn token_provider(auth: &AuthConfig) -> Arc<dyn TokenProvider> {
    if let Some(token) = &auth.token {
        return Arc::new(StaticToken::new(token));
    }
    if let Some(path) = &auth.token_file {
        return Arc::new(FileToken::new(path));
    }
    if let Some(var) = &auth.token_env {
        return Arc::new(EnvToken::new(var));
    }
    tracing::debug!("No token source configured");
    Arc::new(StaticToken::none())
}
