//! Client-side session state.
//!
//! The controller owns what one connected client knows: the room list, the
//! open room, and its message buffer. Every transition is a pure function
//! from old state to new state, so the reducer is testable without a
//! network. Stream events and page loads both funnel through
//! [`SessionState::merge_message`], which deduplicates by id and inserts in
//! `(created_at, id)` order, so replayed or out-of-order delivery converges
//! to the same buffer.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::shared::message::ChatMessage;
use crate::shared::room::{sort_rooms_by_recency, RoomOverview};

/// What one client session currently knows
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Room whose buffer is open, if any.
    pub current_room: Option<Uuid>,
    /// Messages of the open room, ascending `(created_at, id)`.
    pub buffer: Vec<ChatMessage>,
    /// Room list, most recent activity first.
    pub rooms: Vec<RoomOverview>,
    /// Newest message timestamp seen per room; the resume watermark.
    pub last_seen: HashMap<Uuid, DateTime<Utc>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a room. The buffer always starts empty and is filled by a page
    /// load, never carried over from the previous room.
    pub fn open_room(mut self, room: Uuid) -> Self {
        self.current_room = Some(room);
        self.buffer.clear();
        self
    }

    pub fn close_room(mut self) -> Self {
        self.current_room = None;
        self.buffer.clear();
        self
    }

    /// Replace the room list, keeping it in recency order.
    pub fn rooms_loaded(mut self, mut rooms: Vec<RoomOverview>) -> Self {
        sort_rooms_by_recency(&mut rooms);
        self.rooms = rooms;
        self
    }

    /// Merge a fetched message page into the open room's buffer.
    pub fn page_loaded(mut self, room: Uuid, messages: Vec<ChatMessage>) -> Self {
        if self.current_room != Some(room) {
            return self;
        }
        for message in messages {
            self = self.merge_message(message);
        }
        self
    }

    /// Apply our own message after the server accepted it. A failed send
    /// never reaches this transition, so state stays untouched on failure.
    pub fn message_sent(self, message: ChatMessage) -> Self {
        self.message_received(message)
    }

    /// Apply a message from the event stream (or an echo of our own send).
    pub fn message_received(mut self, message: ChatMessage) -> Self {
        self.note_activity(message.room_id, message.created_at);
        if self.current_room == Some(message.room_id) {
            self = self.merge_message(message);
        }
        self
    }

    /// Watermark used when resuming or paging: the newest buffered message
    /// time for the room.
    pub fn resume_watermark(&self, room: Uuid) -> Option<DateTime<Utc>> {
        self.last_seen.get(&room).copied()
    }

    fn note_activity(&mut self, room: Uuid, at: DateTime<Utc>) {
        let entry = self.last_seen.entry(room).or_insert(at);
        if at > *entry {
            *entry = at;
        }
        if let Some(overview) = self.rooms.iter_mut().find(|r| r.room_id == room) {
            if overview.last_message_at.map_or(true, |prev| at > prev) {
                overview.last_message_at = Some(at);
            }
        }
        sort_rooms_by_recency(&mut self.rooms);
    }

    /// Insert in `(created_at, id)` order, dropping duplicates by id.
    fn merge_message(mut self, message: ChatMessage) -> Self {
        if self.buffer.iter().any(|m| m.id == message.id) {
            return self;
        }
        let position = self
            .buffer
            .iter()
            .position(|existing| existing.order(&message) == Ordering::Greater)
            .unwrap_or(self.buffer.len());
        self.buffer.insert(position, message);
        self
    }
}
