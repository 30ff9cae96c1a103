//! Postgres-backed chat store.
//!
//! All reads go through typed row mapping before any field reaches the core
//! logic; raw row shapes never leave this module.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::shared::event::ParticipantUpdate;
use crate::shared::message::{ChatMessage, MessageType, UserProfile};
use crate::shared::room::{Room, RoomKind};

use super::{ChatStore, RoomUnread, StoreError, TypingStatus};

/// Postgres [`ChatStore`] implementation
#[derive(Clone)]
pub struct PgChatStore {
    pool: PgPool,
}

impl PgChatStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn room_exists(&self, room: Uuid) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM rooms WHERE id = $1")
            .bind(room)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("count") > 0)
    }
}

fn message_from_row(row: &sqlx::postgres::PgRow) -> ChatMessage {
    let message_type: String = row.get("message_type");
    ChatMessage {
        id: row.get("id"),
        room_id: row.get("room_id"),
        sender_id: row.get("sender_id"),
        content: row.get("content"),
        message_type: MessageType::from_str(&message_type).unwrap_or(MessageType::Text),
        read_by: row.get("read_by"),
        created_at: row.get("created_at"),
    }
}

#[async_trait::async_trait]
impl ChatStore for PgChatStore {
    async fn upsert_user(&self, profile: UserProfile) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, avatar_url)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET
                username = EXCLUDED.username,
                avatar_url = EXCLUDED.avatar_url
            "#,
        )
        .bind(profile.id)
        .bind(&profile.username)
        .bind(&profile.avatar_url)
        .execute(&self.pool)
        .await?;
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

        let rows = sqlx::query("SELECT id FROM users WHERE id = ANY($1)")
            .bind(&distinct)
            .fetch_all(&self.pool)
            .await?;
        let known: Vec<Uuid> = rows.iter().map(|r| r.get("id")).collect();
        if let Some(missing) = distinct.iter().find(|u| !known.contains(u)) {
            return Err(StoreError::UserNotFound(*missing));
        }

        let room_id = Uuid::new_v4();
        let row = sqlx::query(
            r#"
            INSERT INTO rooms (id, kind, name)
            VALUES ($1, $2, $3)
            RETURNING created_at, last_activity_at
            "#,
        )
        .bind(room_id)
        .bind(kind.as_str())
        .bind(&name)
        .fetch_one(&self.pool)
        .await?;
        let created_at: DateTime<Utc> = row.get("created_at");
        let last_activity_at: DateTime<Utc> = row.get("last_activity_at");

        for user in &distinct {
            sqlx::query(
                r#"
                INSERT INTO room_participants (room_id, user_id)
                VALUES ($1, $2)
                "#,
            )
            .bind(room_id)
            .bind(user)
            .execute(&self.pool)
            .await?;
        }

        Ok(Room {
            id: room_id,
            kind,
            name,
            created_at,
            last_activity_at,
        })
    }

    async fn is_participant(&self, room: Uuid, user: Uuid) -> Result<bool, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS count
            FROM room_participants
            WHERE room_id = $1 AND user_id = $2
            "#,
        )
        .bind(room)
        .bind(user)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<i64, _>("count") > 0)
    }

    async fn append_message(
        &self,
        room: Uuid,
        sender: Uuid,
        content: String,
        message_type: MessageType,
    ) -> Result<ChatMessage, StoreError> {
        if !self.room_exists(room).await? {
            return Err(StoreError::RoomNotFound(room));
        }
        if !self.is_participant(room, sender).await? {
            return Err(StoreError::NotParticipant { room, user: sender });
        }

        let id = Uuid::new_v4();
        let read_by = vec![sender];
        // The database assigns the timestamp; clients never order messages
        // for persistence.
        let row = sqlx::query(
            r#"
            INSERT INTO chat_messages (id, room_id, sender_id, content, message_type, read_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING created_at
            "#,
        )
        .bind(id)
        .bind(room)
        .bind(sender)
        .bind(&content)
        .bind(message_type.as_str())
        .bind(&read_by)
        .fetch_one(&self.pool)
        .await?;
        let created_at: DateTime<Utc> = row.get("created_at");

        sqlx::query("UPDATE rooms SET last_activity_at = $1 WHERE id = $2")
            .bind(created_at)
            .bind(room)
            .execute(&self.pool)
            .await?;

        Ok(ChatMessage {
            id,
            room_id: room,
            sender_id: sender,
            content,
            message_type,
            read_by,
            created_at,
        })
    }

    async fn messages_since(
        &self,
        room: Uuid,
        watermark: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        if !self.room_exists(room).await? {
            return Err(StoreError::RoomNotFound(room));
        }
        let after = watermark.unwrap_or(DateTime::UNIX_EPOCH);
        let rows = sqlx::query(
            r#"
            SELECT id, room_id, sender_id, content, message_type, read_by, created_at
            FROM chat_messages
            WHERE room_id = $1 AND created_at > $2
            ORDER BY created_at ASC, id ASC
            LIMIT $3
            "#,
        )
        .bind(room)
        .bind(after)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(message_from_row).collect())
    }

    async fn mark_read(
        &self,
        room: Uuid,
        user: Uuid,
        upto: DateTime<Utc>,
    ) -> Result<Option<ParticipantUpdate>, StoreError> {
        // The guard clause makes the advance monotonic: an older watermark
        // matches no row and the mark becomes a no-op.
        let updated = sqlx::query(
            r#"
            UPDATE room_participants
            SET last_read_at = $3
            WHERE room_id = $1 AND user_id = $2 AND last_read_at < $3
            "#,
        )
        .bind(room)
        .bind(user)
        .bind(upto)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            if !self.is_participant(room, user).await? {
                return Err(StoreError::NotParticipant { room, user });
            }
            return Ok(None);
        }

        sqlx::query(
            r#"
            UPDATE chat_messages
            SET read_by = array_append(read_by, $2)
            WHERE room_id = $1
              AND created_at <= $3
              AND NOT (read_by @> ARRAY[$2]::uuid[])
            "#,
        )
        .bind(room)
        .bind(user)
        .bind(upto)
        .execute(&self.pool)
        .await?;

        Ok(Some(ParticipantUpdate {
            room_id: room,
            user_id: user,
            last_read_at: upto,
        }))
    }

    async fn unread_count(&self, user: Uuid, room: Uuid) -> Result<u64, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS count
            FROM chat_messages m
            JOIN room_participants p ON p.room_id = m.room_id AND p.user_id = $1
            WHERE m.room_id = $2
              AND m.created_at > p.last_read_at
              AND m.sender_id <> $1
            "#,
        )
        .bind(user)
        .bind(room)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<i64, _>("count") as u64)
    }

    async fn room_unread(&self, user: Uuid, room: Uuid) -> Result<RoomUnread, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT r.name,
                   COUNT(m.id) FILTER (
                       WHERE m.created_at > p.last_read_at AND m.sender_id <> $2
                   ) AS unread,
                   MAX(m.created_at) AS latest
            FROM rooms r
            JOIN room_participants p ON p.room_id = r.id AND p.user_id = $2
            LEFT JOIN chat_messages m ON m.room_id = r.id
            WHERE r.id = $1
            GROUP BY r.id, r.name
            "#,
        )
        .bind(room)
        .bind(user)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(RoomUnread {
                room_id: room,
                room_name: row.get("name"),
                unread_count: row.get::<i64, _>("unread") as u64,
                latest_message_time: row.get("latest"),
            }),
            None if !self.room_exists(room).await? => Err(StoreError::RoomNotFound(room)),
            None => Err(StoreError::NotParticipant { room, user }),
        }
    }

    async fn unread_summary(&self, user: Uuid, limit: i64) -> Result<Vec<RoomUnread>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT r.id, r.name,
                   COUNT(m.id) FILTER (
                       WHERE m.created_at > p.last_read_at AND m.sender_id <> $1
                   ) AS unread,
                   MAX(m.created_at) AS latest
            FROM rooms r
            JOIN room_participants p ON p.room_id = r.id AND p.user_id = $1
            LEFT JOIN chat_messages m ON m.room_id = r.id
            GROUP BY r.id, r.name
            HAVING COUNT(m.id) FILTER (
                       WHERE m.created_at > p.last_read_at AND m.sender_id <> $1
                   ) > 0
                OR MAX(m.created_at) IS NOT NULL
            ORDER BY MAX(m.created_at) DESC NULLS LAST
            LIMIT $2
            "#,
        )
        .bind(user)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| RoomUnread {
                room_id: row.get("id"),
                room_name: row.get("name"),
                unread_count: row.get::<i64, _>("unread") as u64,
                latest_message_time: row.get("latest"),
            })
            .collect())
    }

    async fn set_typing(&self, room: Uuid, user: Uuid, is_typing: bool) -> Result<(), StoreError> {
        if is_typing {
            sqlx::query(
                r#"
                INSERT INTO typing_status (room_id, user_id, is_typing, last_activity)
                VALUES ($1, $2, TRUE, NOW())
                ON CONFLICT (room_id, user_id) DO UPDATE SET
                    is_typing = TRUE,
                    last_activity = NOW()
                "#,
            )
            .bind(room)
            .bind(user)
            .execute(&self.pool)
            .await?;
        } else {
            sqlx::query("DELETE FROM typing_status WHERE room_id = $1 AND user_id = $2")
                .bind(room)
                .bind(user)
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }

    async fn typing_statuses(&self, room: Uuid) -> Result<Vec<TypingStatus>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT room_id, user_id, is_typing, last_activity
            FROM typing_status
            WHERE room_id = $1
            "#,
        )
        .bind(room)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| TypingStatus {
                room_id: row.get("room_id"),
                user_id: row.get("user_id"),
                is_typing: row.get("is_typing"),
                last_activity: row.get("last_activity"),
            })
            .collect())
    }

    async fn purge_stale_typing(&self, older_than: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM typing_status WHERE last_activity < $1")
            .bind(older_than)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn profile(&self, user: Uuid) -> Result<Option<UserProfile>, StoreError> {
        let row = sqlx::query("SELECT id, username, avatar_url FROM users WHERE id = $1")
            .bind(user)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| UserProfile {
            id: row.get("id"),
            username: row.get("username"),
            avatar_url: row.get("avatar_url"),
        }))
    }
}
