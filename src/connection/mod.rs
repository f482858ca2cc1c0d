//! Notifications Connection
//!
//! Keeps one authenticated WebSocket open to the notifications endpoint.
//!
//! ## Lifecycle
//!
//! - `initialize(base_url, ws_path)` derives `ws(s)://host/ws/notifications/`
//!   and connects with `?token=<access token>`
//! - abnormal closes reconnect after `min(1s * 2^(n-1), 30s)`, up to 5 times,
//!   then `reconnect_failed` is emitted
//! - close codes 1008, 4001 and 4003 mean the token was rejected; the attempt
//!   counter is reset before retrying
//! - close code 1000 never reconnects
//! - `{"type": "ping"}` is sent every 30s while open

mod backoff;
mod error;
mod manager;
mod state;
mod url;

pub use backoff::{
    CloseDisposition, ReconnectPolicy, ABNORMAL_CLOSURE, DEFAULT_AUTH_CLOSE_CODES,
    NORMAL_CLOSURE, NO_STATUS_RECEIVED,
};
pub use error::{ConnectionError, ConnectionResult};
pub use manager::{ConnectionConfig, ConnectionManager};
pub use state::{ConnectionState, ConnectionStatus, ReadyState};
pub use url::{derive_ws_url, DEFAULT_WS_PATH};
