//! Message send, list, and read-watermark handlers.
//!
//! Writes go to the durable store first; the change feed is published only
//! after the commit, so subscribers never see an event for state that did
//! not land.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::sessions;
use crate::error::ApiError;
use crate::realtime::RoomEvent;
use crate::server::state::AppState;
use crate::shared::event::MessageWithSender;
use crate::shared::message::{ChatMessage, MessageType, UserProfile};
use crate::store::ChatStore;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub room_id: Uuid,
    pub content: String,
    #[serde(default)]
    pub message_type: Option<String>,
}

/// POST /chat/messages
pub async fn send_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<ChatMessage>, ApiError> {
    let user = sessions::current_user(&headers)?;

    if request.content.trim().is_empty() {
        return Err(ApiError::InvalidInput("content must not be empty".to_string()));
    }
    let message_type = match request.message_type.as_deref() {
        None => MessageType::Text,
        Some(raw) => MessageType::from_str(raw)
            .ok_or_else(|| ApiError::InvalidInput(format!("unknown message_type: {raw}")))?,
    };

    let message = state
        .store
        .append_message(request.room_id, user, request.content, message_type)
        .await?;

    let sender = sender_profile(state.store.as_ref(), user).await;
    let reached = state.feeds.publish(
        request.room_id,
        RoomEvent::MessageCreated(MessageWithSender {
            message: message.clone(),
            sender,
        }),
    );
    tracing::debug!(
        "message {} in room {} reached {reached} subscribers",
        message.id,
        request.room_id
    );

    Ok(Json(message))
}

/// The feed event is best effort; a missing profile must not fail a send
/// that already committed.
async fn sender_profile(store: &dyn ChatStore, user: Uuid) -> UserProfile {
    match store.profile(user).await {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            tracing::warn!("sender {user} has no stored profile");
            placeholder_profile(user)
        }
        Err(e) => {
            tracing::warn!("sender profile lookup failed: {e:?}");
            placeholder_profile(user)
        }
    }
}

fn placeholder_profile(user: Uuid) -> UserProfile {
    UserProfile {
        id: user,
        username: String::new(),
        avatar_url: None,
    }
}

#[derive(Debug, Deserialize)]
pub struct ListMessagesQuery {
    pub room_id: Option<Uuid>,
    pub after: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessagePage {
    pub messages: Vec<ChatMessage>,
    pub has_more: bool,
}

/// GET /chat/messages?room_id=<uuid>&after=<ts>&limit=<n>
///
/// Pages ascending from the `after` watermark. `has_more` is derived by
/// fetching one row past the requested page.
pub async fn list_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListMessagesQuery>,
) -> Result<Json<MessagePage>, ApiError> {
    let user = sessions::current_user(&headers)?;
    let room_id = query
        .room_id
        .ok_or_else(|| ApiError::InvalidInput("room_id query parameter is required".to_string()))?;

    if !state.store.is_participant(room_id, user).await? {
        return Err(ApiError::Forbidden);
    }

    let limit = query
        .limit
        .unwrap_or(state.config.message_page_limit)
        .clamp(1, state.config.message_page_limit);

    let mut messages = state
        .store
        .messages_since(room_id, query.after, limit + 1)
        .await?;
    let has_more = messages.len() as i64 > limit;
    messages.truncate(limit as usize);

    Ok(Json(MessagePage { messages, has_more }))
}

#[derive(Debug, Deserialize)]
pub struct MarkReadRequest {
    pub room_id: Uuid,
    pub upto: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkReadResponse {
    pub updated: bool,
    pub last_read_at: Option<DateTime<Utc>>,
}

/// POST /chat/messages/read
///
/// Advances the caller's watermark monotonically. A stale `upto` is a
/// successful no-op and publishes nothing.
pub async fn mark_read(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<MarkReadRequest>,
) -> Result<Json<MarkReadResponse>, ApiError> {
    let user = sessions::current_user(&headers)?;

    let update = state
        .store
        .mark_read(request.room_id, user, request.upto)
        .await?;

    match update {
        Some(update) => {
            let last_read_at = update.last_read_at;
            state
                .feeds
                .publish(request.room_id, RoomEvent::ParticipantUpdated(update));
            Ok(Json(MarkReadResponse {
                updated: true,
                last_read_at: Some(last_read_at),
            }))
        }
        None => Ok(Json(MarkReadResponse {
            updated: false,
            last_read_at: None,
        })),
    }
}
