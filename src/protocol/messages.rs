//! Notification Wire Messages
//!
//! Frame shapes exchanged with the notifications endpoint. Inbound frames are
//! JSON objects of the form `{"type": ..., "payload": ...}`; the only outbound
//! frame this client produces on its own is the heartbeat ping.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::error::ProtocolError;

/// Recognized values of an inbound frame's `type` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    /// Heartbeat acknowledgement
    Pong,
    Notification,
    UnreadCount,
    NotificationCreated,
    NotificationUpdated,
    NotificationDeleted,
    /// Missing or unrecognized type
    Other,
}

impl FrameType {
    fn from_wire(value: Option<&str>) -> Self {
        match value {
            Some("pong") => FrameType::Pong,
            Some("notification") => FrameType::Notification,
            Some("unread_count") => FrameType::UnreadCount,
            Some("notification_created") => FrameType::NotificationCreated,
            Some("notification_updated") => FrameType::NotificationUpdated,
            Some("notification_deleted") => FrameType::NotificationDeleted,
            _ => FrameType::Other,
        }
    }

    /// Wire name, `None` for [`FrameType::Other`]
    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            FrameType::Pong => Some("pong"),
            FrameType::Notification => Some("notification"),
            FrameType::UnreadCount => Some("unread_count"),
            FrameType::NotificationCreated => Some("notification_created"),
            FrameType::NotificationUpdated => Some("notification_updated"),
            FrameType::NotificationDeleted => Some("notification_deleted"),
            FrameType::Other => None,
        }
    }
}

/// A parsed inbound text frame
///
/// Any JSON value is accepted; frames that are not objects or have no string
/// `type` are classified as [`FrameType::Other`] and routed to the fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundFrame {
    value: Value,
}

impl InboundFrame {
    /// Parse the text of a WebSocket frame
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value = serde_json::from_str(text)?;
        Ok(Self { value })
    }

    pub fn from_value(value: Value) -> Self {
        Self { value }
    }

    pub fn frame_type(&self) -> FrameType {
        FrameType::from_wire(self.value.get("type").and_then(Value::as_str))
    }

    /// The `payload` field, or `Null` when absent
    pub fn payload(&self) -> &Value {
        self.value.get("payload").unwrap_or(&Value::Null)
    }

    /// Take the `payload` field, `Null` when absent
    pub fn into_payload(self) -> Value {
        match self.value {
            Value::Object(mut fields) => fields.remove("payload").unwrap_or(Value::Null),
            _ => Value::Null,
        }
    }

    pub fn as_value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}

/// Frames sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    /// Heartbeat
    Ping,
}

impl OutboundFrame {
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Notification identifier
///
/// Backends use either integer primary keys or string ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NotificationId {
    Int(i64),
    Str(String),
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationId::Int(id) => write!(f, "{}", id),
            NotificationId::Str(id) => f.write_str(id),
        }
    }
}

impl From<i64> for NotificationId {
    fn from(id: i64) -> Self {
        NotificationId::Int(id)
    }
}

impl From<&str> for NotificationId {
    fn from(id: &str) -> Self {
        NotificationId::Str(id.to_string())
    }
}

impl From<String> for NotificationId {
    fn from(id: String) -> Self {
        NotificationId::Str(id)
    }
}

impl NotificationId {
    /// Read an id from a JSON value; integers and strings are accepted
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(NotificationId::Int),
            Value::String(s) => Some(NotificationId::Str(s.clone())),
            _ => None,
        }
    }

    /// Whether `value` holds this id
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (NotificationId::Int(id), Value::Number(n)) => n.as_i64() == Some(*id),
            (NotificationId::Str(id), Value::String(s)) => id == s,
            _ => false,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            NotificationId::Int(id) => Value::from(*id),
            NotificationId::Str(id) => Value::from(id.as_str()),
        }
    }
}

fn id_of(value: &Value) -> Option<NotificationId> {
    value.get("id").and_then(NotificationId::from_json)
}

/// A notification exactly as pushed by the server
///
/// The payload is kept verbatim: listeners and serialization see the same
/// JSON the server sent. Accessors give a typed view over the common fields
/// and return `None` where a field is missing or has an unexpected shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Notification(Value);

impl Notification {
    pub fn new(id: impl Into<NotificationId>, title: &str, message: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("id".to_string(), id.into().to_json());
        fields.insert("title".to_string(), Value::from(title));
        fields.insert("message".to_string(), Value::from(message));
        fields.insert("is_read".to_string(), Value::Bool(false));
        Self(Value::Object(fields))
    }

    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    pub fn kind(self, notification_type: &str) -> Self {
        self.with("notification_type", Value::from(notification_type))
    }

    pub fn read(self, is_read: bool) -> Self {
        self.with("is_read", Value::Bool(is_read))
    }

    fn with(mut self, key: &str, value: Value) -> Self {
        if let Value::Object(fields) = &mut self.0 {
            fields.insert(key.to_string(), value);
        }
        self
    }

    pub fn id(&self) -> Option<NotificationId> {
        id_of(&self.0)
    }

    /// Whether this notification carries `id`
    pub fn has_id(&self, id: &NotificationId) -> bool {
        self.0.get("id").is_some_and(|value| id.matches(value))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn notification_type(&self) -> Option<&str> {
        self.str_field("notification_type")
    }

    pub fn title(&self) -> Option<&str> {
        self.str_field("title")
    }

    pub fn message(&self) -> Option<&str> {
        self.str_field("message")
    }

    /// `metadata`, unless absent or null
    pub fn metadata(&self) -> Option<&Value> {
        self.0.get("metadata").filter(|value| !value.is_null())
    }

    /// `created_at` as the server wrote it
    pub fn created_at(&self) -> Option<&str> {
        self.str_field("created_at")
    }

    /// `created_at` in UTC
    ///
    /// RFC 3339 timestamps are converted from their offset. Timestamps without
    /// an offset are read as UTC.
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        let raw = self.created_at()?;
        if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
            return Some(at.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|at| at.and_utc())
    }

    pub fn is_read(&self) -> bool {
        self.0
            .get("is_read")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Merge partial fields into this notification
    ///
    /// Values are copied as sent, including nulls. The id is never changed.
    pub fn apply_updates(&mut self, updates: &Map<String, Value>) {
        if let Value::Object(fields) = &mut self.0 {
            for (key, value) in updates {
                if key != "id" {
                    fields.insert(key.clone(), value.clone());
                }
            }
        }
    }
}

/// Payload of `notification_updated`, kept verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationUpdate(Value);

impl NotificationUpdate {
    pub fn new(id: impl Into<NotificationId>, updates: Map<String, Value>) -> Self {
        let mut fields = Map::new();
        fields.insert("id".to_string(), id.into().to_json());
        fields.insert("updates".to_string(), Value::Object(updates));
        Self(Value::Object(fields))
    }

    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    pub fn id(&self) -> Option<NotificationId> {
        id_of(&self.0)
    }

    /// Changed fields; `None` when `updates` is absent, null or not an object
    pub fn updates(&self) -> Option<&Map<String, Value>> {
        self.0.get("updates").and_then(Value::as_object)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

/// Payload of `notification_deleted`, kept verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationDeleted(Value);

impl NotificationDeleted {
    pub fn new(id: impl Into<NotificationId>) -> Self {
        let mut fields = Map::new();
        fields.insert("id".to_string(), id.into().to_json());
        Self(Value::Object(fields))
    }

    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    pub fn id(&self) -> Option<NotificationId> {
        id_of(&self.0)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

/// Payload of `unread_count`, kept verbatim
///
/// Servers send `{"unread_count": n}`, `{"count": n}`, or a bare `n`;
/// [`UnreadCount::value`] reads all three.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnreadCount(Value);

impl UnreadCount {
    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    pub fn value(&self) -> Option<u64> {
        match &self.0 {
            Value::Object(fields) => fields
                .get("unread_count")
                .or_else(|| fields.get("count"))
                .and_then(Value::as_u64),
            other => other.as_u64(),
        }
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<u64> for UnreadCount {
    fn from(count: u64) -> Self {
        let mut fields = Map::new();
        fields.insert("unread_count".to_string(), Value::from(count));
        Self(Value::Object(fields))
    }
}
