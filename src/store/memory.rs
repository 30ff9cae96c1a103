//! In-memory chat store.
//!
//! Backs the server when `DATABASE_URL` is not configured and serves as the
//! store double in tests. Semantics match [`PgChatStore`]: same ordering
//! key, same watermark monotonicity, same invariant checks.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::shared::event::ParticipantUpdate;
use crate::shared::message::{ChatMessage, MessageType, UserProfile};
use crate::shared::room::{Participant, Room, RoomKind};

use super::{ChatStore, RoomUnread, StoreError, TypingStatus};

#[derive(Default)]
struct MemInner {
    users: HashMap<Uuid, UserProfile>,
    rooms: HashMap<Uuid, Room>,
    participants: HashMap<(Uuid, Uuid), Participant>,
    messages: Vec<ChatMessage>,
    typing: HashMap<(Uuid, Uuid), TypingStatus>,
}

/// In-memory [`ChatStore`] implementation
#[derive(Clone, Default)]
pub struct MemChatStore {
    inner: Arc<RwLock<MemInner>>,
}

impl MemChatStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemInner {
    fn room_messages(&self, room: Uuid) -> Vec<&ChatMessage> {
        let mut messages: Vec<&ChatMessage> =
            self.messages.iter().filter(|m| m.room_id == room).collect();
        messages.sort_by(|a, b| a.order(b));
        messages
    }

    fn unread_in_room(&self, user: Uuid, room: Uuid) -> u64 {
        let watermark = self
            .participants
            .get(&(room, user))
            .map(|p| p.last_read_at)
            .unwrap_or(DateTime::UNIX_EPOCH);
        self.messages
            .iter()
            .filter(|m| m.room_id == room && m.created_at > watermark && m.sender_id != user)
            .count() as u64
    }

    fn latest_message_time(&self, room: Uuid) -> Option<DateTime<Utc>> {
        self.messages
            .iter()
            .filter(|m| m.room_id == room)
            .map(|m| m.created_at)
            .max()
    }
}

#[async_trait::async_trait]
impl ChatStore for MemChatStore {
    async fn upsert_user(&self, profile: UserProfile) -> Result<(), StoreError> {
        self.inner.write().await.users.insert(profile.id, profile);
        Ok(())
    }

    async fn create_room(
        &self,
        kind: RoomKind,
        name: Option<String>,
        participants: &[Uuid],
    ) -> Result<Room, StoreError> {
        let mut distinct = participants.to_vec();
        distinct.sort();
        distinct.dedup();
        if !kind.valid_participant_count(distinct.len()) {
            return Err(StoreError::InvalidRoom(format!(
                "{} room cannot have {} participants",
                kind.as_str(),
                distinct.len()
            )));
        }

        let mut inner = self.inner.write().await;
        for user in &distinct {
            if !inner.users.contains_key(user) {
                return Err(StoreError::UserNotFound(*user));
            }
        }

        let now = Utc::now();
        let room = Room {
            id: Uuid::new_v4(),
            kind,
            name,
            created_at: now,
            last_activity_at: now,
        };
        for user in &distinct {
            inner.participants.insert(
                (room.id, *user),
                Participant {
                    room_id: room.id,
                    user_id: *user,
                    joined_at: now,
                    last_read_at: DateTime::UNIX_EPOCH,
                },
            );
        }
        inner.rooms.insert(room.id, room.clone());
        Ok(room)
    }

    async fn is_participant(&self, room: Uuid, user: Uuid) -> Result<bool, StoreError> {
        Ok(self.inner.read().await.participants.contains_key(&(room, user)))
    }

    async fn append_message(
        &self,
        room: Uuid,
        sender: Uuid,
        content: String,
        message_type: MessageType,
    ) -> Result<ChatMessage, StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.rooms.contains_key(&room) {
            return Err(StoreError::RoomNotFound(room));
        }
        if !inner.participants.contains_key(&(room, sender)) {
            return Err(StoreError::NotParticipant { room, user: sender });
        }

        let now = Utc::now();
        let message = ChatMessage {
            id: Uuid::new_v4(),
            room_id: room,
            sender_id: sender,
            content,
            message_type,
            read_by: vec![sender],
            created_at: now,
        };
        inner.messages.push(message.clone());
        if let Some(r) = inner.rooms.get_mut(&room) {
            r.last_activity_at = now;
        }
        Ok(message)
    }

    async fn messages_since(
        &self,
        room: Uuid,
        watermark: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        let inner = self.inner.read().await;
        if !inner.rooms.contains_key(&room) {
            return Err(StoreError::RoomNotFound(room));
        }
        let after = watermark.unwrap_or(DateTime::UNIX_EPOCH);
        Ok(inner
            .room_messages(room)
            .into_iter()
            .filter(|m| m.created_at > after)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn mark_read(
        &self,
        room: Uuid,
        user: Uuid,
        upto: DateTime<Utc>,
    ) -> Result<Option<ParticipantUpdate>, StoreError> {
        let mut inner = self.inner.write().await;
        let current = match inner.participants.get(&(room, user)) {
            Some(p) => p.last_read_at,
            None => return Err(StoreError::NotParticipant { room, user }),
        };
        // Watermarks never regress; an older mark is a no-op.
        if upto <= current {
            return Ok(None);
        }

        if let Some(p) = inner.participants.get_mut(&(room, user)) {
            p.last_read_at = upto;
        }
        for m in inner
            .messages
            .iter_mut()
            .filter(|m| m.room_id == room && m.created_at <= upto)
        {
            if !m.read_by.contains(&user) {
                m.read_by.push(user);
            }
        }
        Ok(Some(ParticipantUpdate {
            room_id: room,
            user_id: user,
            last_read_at: upto,
        }))
    }

    async fn unread_count(&self, user: Uuid, room: Uuid) -> Result<u64, StoreError> {
        Ok(self.inner.read().await.unread_in_room(user, room))
    }

    async fn room_unread(&self, user: Uuid, room: Uuid) -> Result<RoomUnread, StoreError> {
        let inner = self.inner.read().await;
        let r = inner.rooms.get(&room).ok_or(StoreError::RoomNotFound(room))?;
        if !inner.participants.contains_key(&(room, user)) {
            return Err(StoreError::NotParticipant { room, user });
        }
        Ok(RoomUnread {
            room_id: room,
            room_name: r.name.clone(),
            unread_count: inner.unread_in_room(user, room),
            latest_message_time: inner.latest_message_time(room),
        })
    }

    async fn unread_summary(&self, user: Uuid, limit: i64) -> Result<Vec<RoomUnread>, StoreError> {
        let inner = self.inner.read().await;
        let mut entries: Vec<RoomUnread> = inner
            .participants
            .keys()
            .filter(|(_, u)| *u == user)
            .filter_map(|(room_id, _)| {
                let room = inner.rooms.get(room_id)?;
                let unread = inner.unread_in_room(user, *room_id);
                let latest = inner.latest_message_time(*room_id);
                if unread == 0 && latest.is_none() {
                    return None;
                }
                Some(RoomUnread {
                    room_id: *room_id,
                    room_name: room.name.clone(),
                    unread_count: unread,
                    latest_message_time: latest,
                })
            })
            .collect();
        entries.sort_by(|a, b| b.latest_message_time.cmp(&a.latest_message_time));
        entries.truncate(limit.max(0) as usize);
        Ok(entries)
    }

    async fn set_typing(&self, room: Uuid, user: Uuid, is_typing: bool) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if is_typing {
            inner.typing.insert(
                (room, user),
                TypingStatus {
                    room_id: room,
                    user_id: user,
                    is_typing: true,
                    last_activity: Utc::now(),
                },
            );
        } else {
            inner.typing.remove(&(room, user));
        }
        Ok(())
    }

    async fn typing_statuses(&self, room: Uuid) -> Result<Vec<TypingStatus>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .typing
            .values()
            .filter(|t| t.room_id == room)
            .cloned()
            .collect())
    }

    async fn purge_stale_typing(&self, older_than: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;
        let before = inner.typing.len();
        inner.typing.retain(|_, t| t.last_activity >= older_than);
        Ok((before - inner.typing.len()) as u64)
    }

    async fn profile(&self, user: Uuid) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.inner.read().await.users.get(&user).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    async fn seeded() -> (MemChatStore, Uuid, Uuid, Uuid) {
        let store = MemChatStore::new();
        let alice = Uuid::from_u128(1);
        let bob = Uuid::from_u128(2);
        for (id, name) in [(alice, "alice"), (bob, "bob")] {
            store
                .upsert_user(UserProfile { id, username: name.to_string(), avatar_url: None })
                .await
                .unwrap();
        }
        let room = store
            .create_room(RoomKind::Direct, None, &[alice, bob])
            .await
            .unwrap();
        (store, room.id, alice, bob)
    }

    #[tokio::test]
    async fn direct_room_requires_two_distinct_participants() {
        let store = MemChatStore::new();
        let alice = Uuid::from_u128(1);
        store
            .upsert_user(UserProfile { id: alice, username: "alice".into(), avatar_url: None })
            .await
            .unwrap();
        let err = store
            .create_room(RoomKind::Direct, None, &[alice, alice])
            .await
            .unwrap_err();
        assert_matches!(err, StoreError::InvalidRoom(_));
    }

    #[tokio::test]
    async fn append_rejects_non_participants() {
        let (store, room, _, _) = seeded().await;
        let outsider = Uuid::from_u128(99);
        let err = store
            .append_message(room, outsider, "hi".into(), MessageType::Text)
            .await
            .unwrap_err();
        assert_matches!(err, StoreError::NotParticipant { .. });
    }

    #[tokio::test]
    async fn append_initializes_read_by_to_sender() {
        let (store, room, alice, _) = seeded().await;
        let msg = store
            .append_message(room, alice, "hello".into(), MessageType::Text)
            .await
            .unwrap();
        assert_eq!(msg.read_by, vec![alice]);
    }

    #[tokio::test]
    async fn messages_since_is_idempotent_and_strictly_after() {
        let (store, room, alice, bob) = seeded().await;
        store.append_message(room, alice, "one".into(), MessageType::Text).await.unwrap();
        let second = store
            .append_message(room, bob, "two".into(), MessageType::Text)
            .await
            .unwrap();
        store.append_message(room, alice, "three".into(), MessageType::Text).await.unwrap();

        let first_call = store.messages_since(room, Some(second.created_at), 100).await.unwrap();
        let second_call = store.messages_since(room, Some(second.created_at), 100).await.unwrap();
        assert_eq!(first_call, second_call);
        assert!(first_call.iter().all(|m| m.created_at > second.created_at));
    }

    #[tokio::test]
    async fn unread_count_excludes_own_messages() {
        let (store, room, alice, bob) = seeded().await;
        store.append_message(room, alice, "hi".into(), MessageType::Text).await.unwrap();
        assert_eq!(store.unread_count(bob, room).await.unwrap(), 1);
        assert_eq!(store.unread_count(alice, room).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn append_increments_reader_unread_by_exactly_one() {
        let (store, room, alice, bob) = seeded().await;
        let before = store.unread_count(bob, room).await.unwrap();
        store.append_message(room, alice, "ping".into(), MessageType::Text).await.unwrap();
        assert_eq!(store.unread_count(bob, room).await.unwrap(), before + 1);
    }

    #[tokio::test]
    async fn mark_read_is_monotonic() {
        let (store, room, alice, bob) = seeded().await;
        let msg = store
            .append_message(room, alice, "hi".into(), MessageType::Text)
            .await
            .unwrap();

        let update = store.mark_read(room, bob, msg.created_at).await.unwrap();
        assert!(update.is_some());
        assert_eq!(store.unread_count(bob, room).await.unwrap(), 0);

        // Older watermark is a no-op, not an error, and nothing regresses.
        let older = msg.created_at - chrono::Duration::seconds(10);
        assert!(store.mark_read(room, bob, older).await.unwrap().is_none());
        assert_eq!(store.unread_count(bob, room).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn mark_read_adds_reader_to_covered_messages() {
        let (store, room, alice, bob) = seeded().await;
        let msg = store
            .append_message(room, alice, "hi".into(), MessageType::Text)
            .await
            .unwrap();
        store.mark_read(room, bob, msg.created_at).await.unwrap();
        let messages = store.messages_since(room, None, 10).await.unwrap();
        assert!(messages[0].read_by.contains(&alice));
        assert!(messages[0].read_by.contains(&bob));
    }

    #[tokio::test]
    async fn concurrent_appends_are_both_durable() {
        let (store, room, alice, bob) = seeded().await;
        let (s1, s2) = (store.clone(), store.clone());
        let a = tokio::spawn(async move {
            s1.append_message(room, alice, "from alice".into(), MessageType::Text).await
        });
        let b = tokio::spawn(async move {
            s2.append_message(room, bob, "from bob".into(), MessageType::Text).await
        });
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let messages = store.messages_since(room, None, 10).await.unwrap();
        assert_eq!(messages.len(), 2);
        // Store-assigned order is deterministic under the tie-break key.
        let reread = store.messages_since(room, None, 10).await.unwrap();
        assert_eq!(messages, reread);
    }

    #[tokio::test]
    async fn room_unread_rejects_non_participants() {
        let (store, room, alice, _) = seeded().await;
        store
            .append_message(room, alice, "private".into(), MessageType::Text)
            .await
            .unwrap();

        let outsider = Uuid::from_u128(99);
        let err = store.room_unread(outsider, room).await.unwrap_err();
        assert_matches!(err, StoreError::NotParticipant { .. });

        // Participants still get the entry.
        let entry = store.room_unread(alice, room).await.unwrap();
        assert_eq!(entry.room_id, room);
    }

    #[tokio::test]
    async fn summary_orders_rooms_by_latest_message_and_caps() {
        let (store, room_ab, alice, bob) = seeded().await;
        let carol = Uuid::from_u128(3);
        store
            .upsert_user(UserProfile { id: carol, username: "carol".into(), avatar_url: None })
            .await
            .unwrap();
        let room_ac = store
            .create_room(RoomKind::Direct, None, &[alice, carol])
            .await
            .unwrap();

        store.append_message(room_ab, bob, "early".into(), MessageType::Text).await.unwrap();
        store.append_message(room_ac.id, carol, "late".into(), MessageType::Text).await.unwrap();

        let summary = store.unread_summary(alice, 50).await.unwrap();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].room_id, room_ac.id);
        assert!(summary[0].latest_message_time >= summary[1].latest_message_time);

        let capped = store.unread_summary(alice, 1).await.unwrap();
        assert_eq!(capped.len(), 1);
    }

    #[tokio::test]
    async fn stop_typing_deletes_the_row() {
        let (store, room, alice, _) = seeded().await;
        store.set_typing(room, alice, true).await.unwrap();
        assert_eq!(store.typing_statuses(room).await.unwrap().len(), 1);
        store.set_typing(room, alice, false).await.unwrap();
        assert!(store.typing_statuses(room).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn purge_removes_only_stale_rows() {
        let (store, room, alice, bob) = seeded().await;
        store.set_typing(room, alice, true).await.unwrap();
        store.set_typing(room, bob, true).await.unwrap();
        // Nothing is older than a past cutoff.
        let removed = store
            .purge_stale_typing(Utc::now() - chrono::Duration::seconds(60))
            .await
            .unwrap();
        assert_eq!(removed, 0);
        let removed = store
            .purge_stale_typing(Utc::now() + chrono::Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(removed, 2);
    }
}
