//! Per-room change feed.
//!
//! Each room gets its own `tokio::sync::broadcast` channel so events for
//! one room never cross-talk into another's subscribers. Writers publish
//! typed [`RoomEvent`]s after the durable store commits; each SSE
//! connection holds exactly one receiver, dropped on disconnect. Synthetic
//! events can be injected through the same channel in tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::shared::event::{MessageWithSender, ParticipantUpdate};

const FEED_CAPACITY: usize = 256;

/// Typed change-feed event for one room
#[derive(Debug, Clone)]
pub enum RoomEvent {
    /// A message was committed to the room
    MessageCreated(MessageWithSender),
    /// A participant's read watermark advanced
    ParticipantUpdated(ParticipantUpdate),
}

/// Registry of per-room broadcast channels
#[derive(Clone, Default)]
pub struct RoomFeeds {
    channels: Arc<Mutex<HashMap<Uuid, broadcast::Sender<RoomEvent>>>>,
}

impl RoomFeeds {
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self, room: Uuid) -> broadcast::Sender<RoomEvent> {
        let mut channels = self.channels.lock().expect("feed registry poisoned");
        channels
            .entry(room)
            .or_insert_with(|| broadcast::channel(FEED_CAPACITY).0)
            .clone()
    }

    /// Subscribe to a room's feed. One receiver per SSE connection.
    pub fn subscribe(&self, room: Uuid) -> broadcast::Receiver<RoomEvent> {
        self.sender(room).subscribe()
    }

    /// Publish an event to a room's subscribers.
    ///
    /// Returns the number of subscribers reached; a room with no open
    /// connections is not an error.
    pub fn publish(&self, room: Uuid, event: RoomEvent) -> usize {
        match self.sender(room).send(event) {
            Ok(count) => count,
            Err(_) => {
                tracing::debug!("no subscribers for room {room}, event dropped");
                0
            }
        }
    }

    /// Drop channels whose subscribers have all disconnected.
    pub fn cleanup_inactive(&self) {
        self.channels
            .lock()
            .expect("feed registry poisoned")
            .retain(|_, sender| sender.receiver_count() > 0);
    }

    pub fn subscriber_count(&self, room: Uuid) -> usize {
        self.channels
            .lock()
            .expect("feed registry poisoned")
            .get(&room)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::event::ParticipantUpdate;
    use assert_matches::assert_matches;

    fn update(room: Uuid) -> ParticipantUpdate {
        ParticipantUpdate {
            room_id: room,
            user_id: Uuid::from_u128(1),
            last_read_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn publish_reaches_room_subscribers() {
        let feeds = RoomFeeds::new();
        let room = Uuid::from_u128(1);
        let mut rx = feeds.subscribe(room);
        assert_eq!(feeds.publish(room, RoomEvent::ParticipantUpdated(update(room))), 1);
        assert_matches!(rx.recv().await.unwrap(), RoomEvent::ParticipantUpdated(_));
    }

    #[tokio::test]
    async fn rooms_do_not_cross_talk() {
        let feeds = RoomFeeds::new();
        let room_a = Uuid::from_u128(1);
        let room_b = Uuid::from_u128(2);
        let mut rx_b = feeds.subscribe(room_b);
        feeds.publish(room_a, RoomEvent::ParticipantUpdated(update(room_a)));
        assert_matches!(
            rx_b.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        );
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_not_an_error() {
        let feeds = RoomFeeds::new();
        assert_eq!(
            feeds.publish(Uuid::from_u128(3), RoomEvent::ParticipantUpdated(update(Uuid::from_u128(3)))),
            0
        );
    }

    #[tokio::test]
    async fn cleanup_drops_channels_without_receivers() {
        let feeds = RoomFeeds::new();
        let room = Uuid::from_u128(4);
        let rx = feeds.subscribe(room);
        assert_eq!(feeds.subscriber_count(room), 1);
        drop(rx);
        feeds.cleanup_inactive();
        assert_eq!(feeds.subscriber_count(room), 0);
    }
}
