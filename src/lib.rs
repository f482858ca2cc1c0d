//! # notifylink
//!
//! Real-time notification client: keeps one authenticated WebSocket open to a
//! notifications endpoint and turns the JSON frames it receives into typed
//! events for application listeners.
//!
//! ## Features
//!
//! - **Resilient connection**: exponential backoff (1s doubling, capped at
//!   30s, 5 attempts), then a `reconnect_failed` event
//! - **Auth aware**: close codes 1008/4001/4003 reset the retry budget so a
//!   refreshed token gets a fresh start
//! - **Heartbeat**: `{"type": "ping"}` every 30s while open
//! - **Isolated listeners**: a panicking listener never stops delivery to the
//!   others or kills the socket
//! - **Consumer store**: optional notification list plus unread counter driven
//!   by server pushes
//!
//! ## Modules
//!
//! - [`protocol`]: wire frames and notification payloads
//! - [`dispatcher`]: event routing and listener registry
//! - [`connection`]: socket lifecycle, backoff and heartbeat
//! - [`auth`]: access token providers
//! - [`feed`]: notification store bound to dispatcher events
//! - [`client`]: application-level context object
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use notifylink::{Config, Event, EventKind, NotificationClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = NotificationClient::from_config(Config::load_default());
//!
//!     let _sub = client.on(EventKind::NotificationCreated, |event| {
//!         if let Event::NotificationCreated(n) = event {
//!             println!("{}: {}", n.title().unwrap_or_default(), n.message().unwrap_or_default());
//!         }
//!     });
//!
//!     client.initialize("https://api.example.com/api").await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     client.disconnect();
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod feed;
pub mod protocol;
pub mod telemetry;

// Re-export top-level types for convenience
pub use auth::{EnvToken, FileToken, SharedToken, StaticToken, TokenProvider};

pub use client::NotificationClient;

pub use config::{AuthConfig, Config, ConfigError, LoggingConfig};

pub use connection::{
    derive_ws_url, ConnectionError, ConnectionManager, ConnectionResult, ConnectionState,
    ConnectionStatus, ReadyState, ReconnectPolicy,
};

pub use dispatcher::{Event, EventDispatcher, EventKind, Subscription};

pub use feed::{NotificationFeed, NotificationStore};

pub use protocol::{Notification, NotificationId, ProtocolError, UnreadCount};
