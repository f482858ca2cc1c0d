//! Frame Routing
//!
//! Maps inbound frames to dispatcher events.

use crate::protocol::{
    FrameType, InboundFrame, Notification, NotificationDeleted, NotificationUpdate,
    ProtocolError, UnreadCount,
};

use super::events::Event;

/// Outcome of routing one inbound frame
#[derive(Debug)]
pub enum Routed {
    /// Heartbeat acknowledgement; consumed by the transport, never emitted
    Heartbeat,
    /// Event to emit
    Event(Event),
    /// Frame text was not JSON; logged and discarded by the caller
    Dropped(ProtocolError),
}

/// Parse and route the text of a WebSocket frame
pub fn route_text(text: &str) -> Routed {
    match InboundFrame::parse(text) {
        Ok(frame) => route(frame),
        Err(e) => Routed::Dropped(e),
    }
}

/// Route a parsed frame by its `type`
///
/// Recognized payloads are passed on verbatim; their shape is not checked here.
pub fn route(frame: InboundFrame) -> Routed {
    let event = match frame.frame_type() {
        FrameType::Pong => return Routed::Heartbeat,
        FrameType::Other => Event::Message(frame.into_value()),
        FrameType::Notification => Event::Notification(Notification::from_value(frame.into_payload())),
        FrameType::UnreadCount => Event::UnreadCount(UnreadCount::from_value(frame.into_payload())),
        FrameType::NotificationCreated => {
            Event::NotificationCreated(Notification::from_value(frame.into_payload()))
        }
        FrameType::NotificationUpdated => {
            Event::NotificationUpdated(NotificationUpdate::from_value(frame.into_payload()))
        }
        FrameType::NotificationDeleted => {
            Event::NotificationDeleted(NotificationDeleted::from_value(frame.into_payload()))
        }
    };
    Routed::Event(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::EventKind;
    use crate::protocol::NotificationId;
    use serde_json::Value;
    use serde_json::json;

    fn routed_event(text: &str) -> Event {
        match route_text(text) {
            Routed::Event(event) => event,
            other => panic!("Expected event, got {:?}", other),
        }
    }

    #[test]
    fn test_pong_is_swallowed() {
        assert!(matches!(route_text(r#"{"type": "pong"}"#), Routed::Heartbeat));
    }

    #[test]
    fn test_malformed_json_dropped() {
        assert!(matches!(
            route_text("{\"type\": \"notification"),
            Routed::Dropped(ProtocolError::Json(_))
        ));
    }

    #[test]
    fn test_typed_routes() {
        let event = routed_event(
            r#"{"type": "notification_created", "payload": {"id": 5, "title": "New lead"}}"#,
        );
        match event {
            Event::NotificationCreated(n) => {
                assert_eq!(n.id(), Some(NotificationId::Int(5)));
                assert_eq!(n.title(), Some("New lead"));
            }
            other => panic!("Expected NotificationCreated, got {:?}", other),
        }

        let event = routed_event(
            r#"{"type": "notification_updated", "payload": {"id": 5, "updates": {"is_read": true}}}"#,
        );
        match event {
            Event::NotificationUpdated(update) => {
                assert_eq!(update.id(), Some(NotificationId::Int(5)));
                assert_eq!(update.updates().unwrap().get("is_read"), Some(&json!(true)));
            }
            other => panic!("Expected NotificationUpdated, got {:?}", other),
        }

        let event = routed_event(r#"{"type": "notification_deleted", "payload": {"id": "n-5"}}"#);
        assert_eq!(event.kind(), EventKind::NotificationDeleted);

        let event = routed_event(r#"{"type": "notification", "payload": {"id": 6}}"#);
        assert_eq!(event.kind(), EventKind::Notification);
    }

    #[test]
    fn test_unread_count_variants() {
        for text in [
            r#"{"type": "unread_count", "payload": {"unread_count": 3}}"#,
            r#"{"type": "unread_count", "payload": {"count": 3}}"#,
            r#"{"type": "unread_count", "payload": 3}"#,
        ] {
            match routed_event(text) {
                Event::UnreadCount(count) => assert_eq!(count.value(), Some(3)),
                other => panic!("Expected UnreadCount, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_unknown_type_falls_back_to_message_with_full_frame() {
        let text = r#"{"type": "campaign_synced", "payload": {"campaign": 12}, "ts": 1}"#;
        let event = routed_event(text);
        assert_eq!(
            event,
            Event::Message(json!({"type": "campaign_synced", "payload": {"campaign": 12}, "ts": 1}))
        );
    }

    #[test]
    fn test_frame_without_type_falls_back_to_message() {
        let event = routed_event(r#"{"hello": "world"}"#);
        assert_eq!(event, Event::Message(json!({"hello": "world"})));
    }

    fn payload_of(event: &Event) -> Value {
        let mut json = serde_json::to_value(event).unwrap();
        json["data"].take()
    }

    #[test]
    fn test_payloads_reach_listeners_unchanged() {
        let frames = [
            json!({"type": "notification_created", "payload": {"id": 1, "title": "Spend alert", "created_at": "2024-03-01T12:00:00"}}),
            json!({"type": "notification_created", "payload": {"id": 2, "title": "Sync done", "message": null}}),
            json!({"type": "notification", "payload": {"id": 3, "created_at": "2024-03-01T12:00:00+05:30"}}),
            json!({"type": "notification_updated", "payload": {"id": 4, "updates": null}}),
            json!({"type": "notification_deleted", "payload": {"uuid": 1}}),
            json!({"type": "unread_count", "payload": {"total": 3}}),
        ];

        for frame in frames {
            let event = routed_event(&frame.to_string());
            assert_eq!(payload_of(&event), frame["payload"], "frame {}", frame);
        }
    }

    #[test]
    fn test_offset_timestamp_not_rewritten() {
        let event = routed_event(
            r#"{"type": "notification_created", "payload": {"id": 3, "created_at": "2024-03-01T12:00:00+05:30"}}"#,
        );
        match event {
            Event::NotificationCreated(n) => {
                assert_eq!(n.created_at(), Some("2024-03-01T12:00:00+05:30"));
                assert_eq!(
                    n.as_value(),
                    &json!({"id": 3, "created_at": "2024-03-01T12:00:00+05:30"})
                );
            }
            other => panic!("Expected NotificationCreated, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_payload_routes_as_null() {
        match routed_event(r#"{"type": "notification_created"}"#) {
            Event::NotificationCreated(n) => {
                assert_eq!(n.as_value(), &Value::Null);
                assert_eq!(n.id(), None);
            }
            other => panic!("Expected NotificationCreated, got {:?}", other),
        }
    }
}
