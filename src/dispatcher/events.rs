//! Event Types
//!
//! The closed set of events the dispatcher delivers. Transport lifecycle
//! events are synthesized by the connection manager; the rest come from
//! routed server frames.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::protocol::{Notification, NotificationDeleted, NotificationUpdate, UnreadCount};

/// Event names listeners subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Connected,
    Disconnected,
    Error,
    ReconnectFailed,
    Notification,
    UnreadCount,
    NotificationCreated,
    NotificationUpdated,
    NotificationDeleted,
    /// Fallback for frames with an unrecognized type
    Message,
}

impl EventKind {
    pub const ALL: [EventKind; 10] = [
        EventKind::Connected,
        EventKind::Disconnected,
        EventKind::Error,
        EventKind::ReconnectFailed,
        EventKind::Notification,
        EventKind::UnreadCount,
        EventKind::NotificationCreated,
        EventKind::NotificationUpdated,
        EventKind::NotificationDeleted,
        EventKind::Message,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Connected => "connected",
            EventKind::Disconnected => "disconnected",
            EventKind::Error => "error",
            EventKind::ReconnectFailed => "reconnect_failed",
            EventKind::Notification => "notification",
            EventKind::UnreadCount => "unread_count",
            EventKind::NotificationCreated => "notification_created",
            EventKind::NotificationUpdated => "notification_updated",
            EventKind::NotificationDeleted => "notification_deleted",
            EventKind::Message => "message",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown event: {}", s))
    }
}

/// An event together with its payload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum Event {
    /// Socket opened
    Connected,
    /// Socket closed
    Disconnected { code: u16, reason: String },
    /// Socket-level error
    Error { message: String },
    /// Reconnection attempts exhausted
    ReconnectFailed { attempts: u32 },
    Notification(Notification),
    UnreadCount(UnreadCount),
    NotificationCreated(Notification),
    NotificationUpdated(NotificationUpdate),
    NotificationDeleted(NotificationDeleted),
    /// Full frame of an unrecognized type
    Message(Value),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Connected => EventKind::Connected,
            Event::Disconnected { .. } => EventKind::Disconnected,
            Event::Error { .. } => EventKind::Error,
            Event::ReconnectFailed { .. } => EventKind::ReconnectFailed,
            Event::Notification(_) => EventKind::Notification,
            Event::UnreadCount(_) => EventKind::UnreadCount,
            Event::NotificationCreated(_) => EventKind::NotificationCreated,
            Event::NotificationUpdated(_) => EventKind::NotificationUpdated,
            Event::NotificationDeleted(_) => EventKind::NotificationDeleted,
            Event::Message(_) => EventKind::Message,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Event::Error {
            message: message.into(),
        }
    }

    pub fn disconnected(code: u16, reason: impl Into<String>) -> Self {
        Event::Disconnected {
            code,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_names_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(kind.as_str().parse::<EventKind>().unwrap(), kind);
        }
        assert!("pong".parse::<EventKind>().is_err());
    }

    #[test]
    fn test_event_kind_mapping() {
        assert_eq!(Event::Connected.kind(), EventKind::Connected);
        assert_eq!(
            Event::disconnected(1006, "").kind(),
            EventKind::Disconnected
        );
        assert_eq!(
            Event::NotificationDeleted(NotificationDeleted::new(1)).kind(),
            EventKind::NotificationDeleted
        );
        assert_eq!(Event::Message(json!({})).kind(), EventKind::Message);
    }

    #[test]
    fn test_event_serialize() {
        let json = serde_json::to_value(Event::disconnected(4001, "token expired")).unwrap();
        assert_eq!(
            json,
            json!({"event": "disconnected", "data": {"code": 4001, "reason": "token expired"}})
        );

        let json = serde_json::to_value(Event::UnreadCount(UnreadCount::from(2))).unwrap();
        assert_eq!(json, json!({"event": "unread_count", "data": {"unread_count": 2}}));

        let json = serde_json::to_value(Event::Connected).unwrap();
        assert_eq!(json, json!({"event": "connected"}));
    }

    #[test]
    fn test_event_data_is_server_payload() {
        let payload = json!({"id": 2, "title": "Sync done", "message": null, "created_at": "2024-03-01T12:00:00"});
        let event = Event::NotificationCreated(Notification::from_value(payload.clone()));
        let json = serde_json::to_value(event).unwrap();
        assert_eq!(json, json!({"event": "notification_created", "data": payload}));
    }
}
