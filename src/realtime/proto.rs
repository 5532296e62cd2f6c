//! Wire protocol for the realtime messaging service.
//!
//! Every frame on the socket is a JSON [`Envelope`] carrying an event type
//! from a closed vocabulary, an opaque `data` payload, and an ISO-8601
//! timestamp. Typed payload structs for the known event bodies live here as
//! well; the transport itself never interprets `data`.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Closed set of event types spoken over the realtime connection.
///
/// `connection_established` and `connection_lost` are pseudo-events emitted
/// locally by the transport; the rest originate from the server or from
/// client sends.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum EventKind {
    ConnectionEstablished,
    ConnectionLost,
    MessageSent,
    MessageReceived,
    MessageRead,
    TypingStart,
    TypingStop,
    UserOnline,
    UserOffline,
    ConversationUpdated,
    Error,
}

impl EventKind {
    /// Wire name of the event type.
    pub const fn as_str(&self) -> &'static str {
        match self {
            EventKind::ConnectionEstablished => "connection_established",
            EventKind::ConnectionLost => "connection_lost",
            EventKind::MessageSent => "message_sent",
            EventKind::MessageReceived => "message_received",
            EventKind::MessageRead => "message_read",
            EventKind::TypingStart => "typing_start",
            EventKind::TypingStop => "typing_stop",
            EventKind::UserOnline => "user_online",
            EventKind::UserOffline => "user_offline",
            EventKind::ConversationUpdated => "conversation_updated",
            EventKind::Error => "error",
        }
    }

    /// Resolves a wire name against the closed vocabulary.
    ///
    /// Returns `None` for anything outside the set; callers log and drop such
    /// frames rather than delivering them to subscribers.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "connection_established" => Some(EventKind::ConnectionEstablished),
            "connection_lost" => Some(EventKind::ConnectionLost),
            "message_sent" => Some(EventKind::MessageSent),
            "message_received" => Some(EventKind::MessageReceived),
            "message_read" => Some(EventKind::MessageRead),
            "typing_start" => Some(EventKind::TypingStart),
            "typing_stop" => Some(EventKind::TypingStop),
            "user_online" => Some(EventKind::UserOnline),
            "user_offline" => Some(EventKind::UserOffline),
            "conversation_updated" => Some(EventKind::ConversationUpdated),
            "error" => Some(EventKind::Error),
            _ => None,
        }
    }

    /// Every kind in the vocabulary, in wire order.
    pub const ALL: [EventKind; 11] = [
        EventKind::ConnectionEstablished,
        EventKind::ConnectionLost,
        EventKind::MessageSent,
        EventKind::MessageReceived,
        EventKind::MessageRead,
        EventKind::TypingStart,
        EventKind::TypingStop,
        EventKind::UserOnline,
        EventKind::UserOffline,
        EventKind::ConversationUpdated,
        EventKind::Error,
    ];
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed wrapper around every message sent or received on the socket.
///
/// `kind` stays a plain string so inbound frames with an unknown type survive
/// deserialization and can be logged before being dropped.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub timestamp: String,
    #[serde(
        rename = "conversationId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub conversation_id: Option<String>,
}

impl Envelope {
    /// Builds a fresh outbound envelope with the current UTC timestamp.
    pub fn outbound(kind: EventKind, data: Value, conversation_id: Option<String>) -> Self {
        Self {
            kind: kind.as_str().to_string(),
            data,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            conversation_id,
        }
    }

    pub fn from_text(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Chat message payload carried by `message_received` and `message_sent`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
}

/// Read receipt payload carried by `message_read`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadReceipt {
    pub conversation_id: String,
    pub message_id: String,
    pub reader_id: String,
}

/// Typing indicator payload carried by `typing_start` / `typing_stop`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingNotice {
    pub conversation_id: String,
    pub user_id: String,
}

/// Presence payload carried by `user_online` / `user_offline`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceUpdate {
    pub user_id: String,
}

/// Conversation state payload carried by `conversation_updated`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub conversation_id: String,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub unread_count: u32,
    #[serde(default)]
    pub participant_ids: Vec<String>,
}

/// Error payload carried by the `error` event.
///
/// Transport-local failures reuse this shape with `code` unset.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorNotice {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
}
