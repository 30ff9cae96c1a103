//! Durable chat store boundary.
//!
//! The relational store is an external collaborator; everything the core
//! needs from it is expressed through the [`ChatStore`] trait so that rows
//! are parsed into typed shapes at the boundary and never consumed raw.
//! [`PgChatStore`] is the Postgres implementation; [`MemChatStore`] backs
//! the server when no database is configured and doubles as the test store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::shared::event::ParticipantUpdate;
use crate::shared::message::{ChatMessage, MessageType, UserProfile};
use crate::shared::room::{Room, RoomKind};

pub mod memory;
pub mod postgres;
pub mod typing;

pub use memory::MemChatStore;
pub use postgres::PgChatStore;

/// Errors from the durable store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("room {0} not found")]
    RoomNotFound(Uuid),

    #[error("user {0} not found")]
    UserNotFound(Uuid),

    #[error("user {user} is not a participant of room {room}")]
    NotParticipant { room: Uuid, user: Uuid },

    #[error("invalid room: {0}")]
    InvalidRoom(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Ephemeral typing state for one (room, user) pair.
///
/// Rows are upserted on keystroke-debounced signals and deleted on an
/// explicit stop. Readers must treat rows older than the liveness window
/// as expired regardless; see [`typing::active_peers`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypingStatus {
    pub room_id: Uuid,
    pub user_id: Uuid,
    pub is_typing: bool,
    pub last_activity: DateTime<Utc>,
}

/// Per-room unread entry in a user's summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomUnread {
    pub room_id: Uuid,
    pub room_name: Option<String>,
    pub unread_count: u64,
    pub latest_message_time: Option<DateTime<Utc>>,
}

/// Typed access to rooms, messages, watermarks, and typing state.
///
/// The store is the single source of truth for message ordering: it assigns
/// ids and timestamps, and concurrent appends into the same room must both
/// be durably ordered. Derived views (unread counts) recompute from message
/// and participant state and never drift permanently.
#[async_trait::async_trait]
pub trait ChatStore: Send + Sync {
    /// Insert or refresh a user profile (synced from the auth provider).
    async fn upsert_user(&self, profile: UserProfile) -> Result<(), StoreError>;

    /// Create a room with its initial participants.
    ///
    /// Enforces the participant-count invariant for the room kind.
    async fn create_room(
        &self,
        kind: RoomKind,
        name: Option<String>,
        participants: &[Uuid],
    ) -> Result<Room, StoreError>;

    async fn is_participant(&self, room: Uuid, user: Uuid) -> Result<bool, StoreError>;

    /// Append a message to a room.
    ///
    /// Fails with `NotParticipant` when the sender is not a member. The
    /// server assigns the id and timestamp; `read_by` starts as the sender
    /// alone. Bumps the room's activity time.
    async fn append_message(
        &self,
        room: Uuid,
        sender: Uuid,
        content: String,
        message_type: MessageType,
    ) -> Result<ChatMessage, StoreError>;

    /// Messages strictly after `watermark`, ascending `(created_at, id)`,
    /// bounded by `limit`. Idempotent: identical arguments return the same
    /// prefix absent new appends.
    async fn messages_since(
        &self,
        room: Uuid,
        watermark: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, StoreError>;

    /// Advance the user's read watermark, monotonically.
    ///
    /// Returns `None` when `upto` is not newer than the current watermark
    /// (a no-op, not an error). On advance, the user is added to `read_by`
    /// of every covered message and the new watermark is returned for
    /// read-receipt propagation.
    async fn mark_read(
        &self,
        room: Uuid,
        user: Uuid,
        upto: DateTime<Utc>,
    ) -> Result<Option<ParticipantUpdate>, StoreError>;

    /// Messages newer than the user's watermark, not authored by the user.
    async fn unread_count(&self, user: Uuid, room: Uuid) -> Result<u64, StoreError>;

    /// Unread entry for a single room, with the latest message time.
    async fn room_unread(&self, user: Uuid, room: Uuid) -> Result<RoomUnread, StoreError>;

    /// One entry per room with unread messages or any activity, ordered by
    /// latest message time descending, capped at `limit`.
    async fn unread_summary(&self, user: Uuid, limit: i64) -> Result<Vec<RoomUnread>, StoreError>;

    /// Upsert (`is_typing = true`) or delete (`is_typing = false`) the
    /// caller's typing row. Keyed on (room, user): writers never touch
    /// another user's row.
    async fn set_typing(&self, room: Uuid, user: Uuid, is_typing: bool) -> Result<(), StoreError>;

    /// Raw typing rows for a room. Liveness expiry is applied by the
    /// caller at read time.
    async fn typing_statuses(&self, room: Uuid) -> Result<Vec<TypingStatus>, StoreError>;

    /// Delete typing rows idle since before `older_than`. Used only by the
    /// periodic cleanup task; read-time expiry never depends on it.
    async fn purge_stale_typing(&self, older_than: DateTime<Utc>) -> Result<u64, StoreError>;

    async fn profile(&self, user: Uuid) -> Result<Option<UserProfile>, StoreError>;
}
