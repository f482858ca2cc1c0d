//! Notification Protocol
//!
//! JSON text frames exchanged with the notifications endpoint.
//!
//! ## Inbound
//!
//! ```json
//! {"type": "notification_created", "payload": {"id": 1, "title": "...", ...}}
//! {"type": "notification_updated", "payload": {"id": 1, "updates": {"is_read": true}}}
//! {"type": "notification_deleted", "payload": {"id": 1}}
//! {"type": "unread_count", "payload": {"unread_count": 3}}
//! {"type": "pong"}
//! ```
//!
//! ## Outbound
//!
//! ```json
//! {"type": "ping"}
//! ```

mod error;
mod messages;

pub use error::ProtocolError;
pub use messages::{
    FrameType, InboundFrame, Notification, NotificationDeleted, NotificationId,
    NotificationUpdate, OutboundFrame, UnreadCount,
};
