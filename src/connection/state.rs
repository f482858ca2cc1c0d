//! Connection state and status snapshots

use serde::Serialize;
use std::fmt;

/// Lifecycle state of the managed socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
        }
    }
}

/// WebSocket ready state, numbered like the browser API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadyState {
    Connecting = 0,
    Open = 1,
    Closing = 2,
    Closed = 3,
}

impl ReadyState {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Point-in-time connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub is_connected: bool,
    pub is_connecting: bool,
    pub ready_state: ReadyState,
}

impl ConnectionStatus {
    pub(crate) fn from_state(state: ConnectionState, closing: bool) -> Self {
        let ready_state = match state {
            ConnectionState::Connected => ReadyState::Open,
            ConnectionState::Connecting => ReadyState::Connecting,
            ConnectionState::Disconnected if closing => ReadyState::Closing,
            ConnectionState::Disconnected => ReadyState::Closed,
        };

        Self {
            is_connected: state == ConnectionState::Connected,
            is_connecting: state == ConnectionState::Connecting,
            ready_state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_state() {
        let status = ConnectionStatus::from_state(ConnectionState::Connected, false);
        assert!(status.is_connected);
        assert!(!status.is_connecting);
        assert_eq!(status.ready_state, ReadyState::Open);

        let status = ConnectionStatus::from_state(ConnectionState::Disconnected, true);
        assert!(!status.is_connected);
        assert_eq!(status.ready_state, ReadyState::Closing);

        let status = ConnectionStatus::from_state(ConnectionState::Disconnected, false);
        assert_eq!(status.ready_state.as_u8(), 3);
    }

    #[test]
    fn test_status_serialize() {
        let status = ConnectionStatus::from_state(ConnectionState::Connecting, false);
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(
            json,
            r#"{"is_connected":false,"is_connecting":true,"ready_state":"connecting"}"#
        );
    }
}
