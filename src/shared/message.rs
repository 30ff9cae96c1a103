//! Chat message and sender profile types.
//!
//! Messages are append-only and owned by their room. The display and
//! persistence ordering key is `(room_id, created_at, id)`; the id breaks
//! timestamp ties deterministically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

/// Type of message content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Text,
    Image,
    File,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::Image => "image",
            MessageType::File => "file",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "text" => Some(MessageType::Text),
            "image" => Some(MessageType::Image),
            "file" => Some(MessageType::File),
            _ => None,
        }
    }
}

/// A persisted chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub room_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub message_type: MessageType,
    /// Users that have read this message. Initialized to the sender.
    pub read_by: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Total order within a room: creation timestamp, then id for ties.
    pub fn order(&self, other: &ChatMessage) -> Ordering {
        self.created_at
            .cmp(&other.created_at)
            .then(self.id.cmp(&other.id))
    }
}

/// Sender profile embedded in outbound message events.
///
/// Users are owned by the external auth provider; only the fields needed
/// for display travel with the message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
}
