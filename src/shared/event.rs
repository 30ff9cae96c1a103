//! Wire events for the SSE chat stream.
//!
//! Every event is JSON-encoded on a single `data:` line terminated by a
//! blank line. The event kind travels inside the payload as `type`, so
//! clients can dispatch without caring about SSE `event:` names.
//!
//! Stream protocol per connection:
//! 1. `connected` once, immediately after the subscription is accepted
//! 2. `new_message` for each qualifying insert, enriched with the sender
//!    profile and the current `read_by` set
//! 3. `participant_update` when a watermark advances (read receipts)
//! 4. `ping` on the keep-alive interval, so intermediary proxies do not
//!    close the idle connection

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::message::{ChatMessage, UserProfile};

/// A chat message together with its sender's profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageWithSender {
    #[serde(flatten)]
    pub message: ChatMessage,
    pub sender: UserProfile,
}

/// Changed participant fields carried by a `participant_update` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantUpdate {
    pub room_id: Uuid,
    pub user_id: Uuid,
    pub last_read_at: DateTime<Utc>,
}

/// Event sent over the chat event stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    Connected {
        #[serde(rename = "roomId")]
        room_id: Uuid,
        timestamp: DateTime<Utc>,
    },
    NewMessage {
        message: MessageWithSender,
        timestamp: DateTime<Utc>,
    },
    ParticipantUpdate {
        data: ParticipantUpdate,
        timestamp: DateTime<Utc>,
    },
    Ping {
        timestamp: DateTime<Utc>,
    },
}

impl ChatEvent {
    pub fn connected(room_id: Uuid) -> Self {
        ChatEvent::Connected { room_id, timestamp: Utc::now() }
    }

    pub fn new_message(message: MessageWithSender) -> Self {
        ChatEvent::NewMessage { message, timestamp: Utc::now() }
    }

    pub fn participant_update(data: ParticipantUpdate) -> Self {
        ChatEvent::ParticipantUpdate { data, timestamp: Utc::now() }
    }

    pub fn ping() -> Self {
        ChatEvent::Ping { timestamp: Utc::now() }
    }

    /// Encode as a text-event-stream frame: one `data:` line, blank-line
    /// terminated.
    pub fn sse_frame(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(format!("data: {}\n\n", json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::message::MessageType;

    fn sample_message() -> MessageWithSender {
        let sender = Uuid::from_u128(7);
        MessageWithSender {
            message: ChatMessage {
                id: Uuid::from_u128(1),
                room_id: Uuid::from_u128(2),
                sender_id: sender,
                content: "hello".to_string(),
                message_type: MessageType::Text,
                read_by: vec![sender],
                created_at: Utc::now(),
            },
            sender: UserProfile {
                id: sender,
                username: "ada".to_string(),
                avatar_url: None,
            },
        }
    }

    #[test]
    fn connected_event_uses_camel_case_room_id() {
        let room = Uuid::from_u128(42);
        let json = serde_json::to_value(ChatEvent::connected(room)).unwrap();
        assert_eq!(json["type"], "connected");
        assert_eq!(json["roomId"], room.to_string());
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn new_message_event_flattens_message_and_embeds_sender() {
        let json = serde_json::to_value(ChatEvent::new_message(sample_message())).unwrap();
        assert_eq!(json["type"], "new_message");
        assert_eq!(json["message"]["content"], "hello");
        assert_eq!(json["message"]["sender"]["username"], "ada");
        assert_eq!(
            json["message"]["read_by"][0],
            Uuid::from_u128(7).to_string()
        );
    }

    #[test]
    fn sse_frame_is_data_line_with_blank_terminator() {
        let frame = ChatEvent::ping().sse_frame().unwrap();
        assert!(frame.starts_with("data: {"));
        assert!(frame.ends_with("\n\n"));
        assert!(frame.contains("\"type\":\"ping\""));
        // Exactly one data line per frame.
        assert_eq!(frame.matches("data: ").count(), 1);
    }
}
