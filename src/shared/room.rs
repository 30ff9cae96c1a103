//! Room and participant types.
//!
//! A room is the container for a conversation. Direct rooms hold exactly two
//! distinct participants, self rooms exactly one; group rooms are unbounded.
//! Rooms are created on first use and never hard-deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of chat room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomKind {
    Direct,
    Group,
    #[serde(rename = "self")]
    SelfRoom,
}

impl RoomKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomKind::Direct => "direct",
            RoomKind::Group => "group",
            RoomKind::SelfRoom => "self",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "direct" => Some(RoomKind::Direct),
            "group" => Some(RoomKind::Group),
            "self" => Some(RoomKind::SelfRoom),
            _ => None,
        }
    }

    /// Check the participant-count invariant for this room kind.
    ///
    /// Direct rooms require exactly 2 distinct participants, self rooms
    /// exactly 1. Group rooms need at least one member.
    pub fn valid_participant_count(&self, count: usize) -> bool {
        match self {
            RoomKind::Direct => count == 2,
            RoomKind::SelfRoom => count == 1,
            RoomKind::Group => count >= 1,
        }
    }
}

/// A chat room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,
    pub kind: RoomKind,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Bumped on every message append; used for recency ordering.
    pub last_activity_at: DateTime<Utc>,
}

/// Membership of a user in a room, carrying the read watermark.
///
/// `last_read_at` only ever advances (monotonic); it is owned by its user
/// and marks the "read up to" point used by unread accounting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub room_id: Uuid,
    pub user_id: Uuid,
    pub joined_at: DateTime<Utc>,
    pub last_read_at: DateTime<Utc>,
}

/// Room entry as the session controller sees it in the room list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomOverview {
    pub room_id: Uuid,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_message_at: Option<DateTime<Utc>>,
}

impl RoomOverview {
    /// Recency key: last message time, falling back to room creation.
    pub fn recency(&self) -> DateTime<Utc> {
        self.last_message_at.unwrap_or(self.created_at)
    }
}

/// Sort rooms by most-recent-activity, descending.
///
/// Equal timestamps keep their prior relative order (stable sort).
pub fn sort_rooms_by_recency(rooms: &mut [RoomOverview]) {
    rooms.sort_by(|a, b| b.recency().cmp(&a.recency()));
}
