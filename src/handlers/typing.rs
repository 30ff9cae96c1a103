//! Typing indicator handlers.
//!
//! Writers upsert or delete only their own (room, user) row. Readers apply
//! the liveness window at read time, so an abandoned row stops showing as
//! typing the moment it ages out, independent of the purge task.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::sessions;
use crate::error::ApiError;
use crate::server::state::AppState;
use crate::store::typing::active_peers;

#[derive(Debug, Deserialize)]
pub struct TypingQuery {
    pub room_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TypingPeer {
    pub user_id: Uuid,
    pub last_activity: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TypingResponse {
    pub room_id: Uuid,
    pub typing: Vec<TypingPeer>,
}

/// GET /chat/typing?room_id=<uuid>
///
/// Peers currently typing in the room, excluding the caller. The list is
/// cosmetic, so a store failure degrades to an empty list.
pub async fn typing_peers(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<TypingQuery>,
) -> Result<Json<TypingResponse>, ApiError> {
    let user = sessions::current_user(&headers)?;
    let room_id = query
        .room_id
        .ok_or_else(|| ApiError::InvalidInput("room_id query parameter is required".to_string()))?;

    match state.store.is_participant(room_id, user).await {
        Ok(true) => {}
        Ok(false) => return Err(ApiError::Forbidden),
        Err(e) => {
            tracing::warn!("typing membership check failed for room {room_id}: {e:?}");
            return Ok(Json(TypingResponse { room_id, typing: Vec::new() }));
        }
    }

    let rows = match state.store.typing_statuses(room_id).await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!("typing lookup failed for room {room_id}: {e:?}");
            Vec::new()
        }
    };

    let typing = active_peers(rows, user, Utc::now(), state.config.typing_window_chrono())
        .into_iter()
        .map(|status| TypingPeer {
            user_id: status.user_id,
            last_activity: status.last_activity,
        })
        .collect();

    Ok(Json(TypingResponse { room_id, typing }))
}

#[derive(Debug, Deserialize)]
pub struct SetTypingRequest {
    pub room_id: Option<Uuid>,
    pub is_typing: bool,
}

/// POST /chat/typing
pub async fn set_typing(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SetTypingRequest>,
) -> Result<StatusCode, ApiError> {
    let user = sessions::current_user(&headers)?;
    let room_id = request
        .room_id
        .ok_or_else(|| ApiError::InvalidInput("room_id is required".to_string()))?;

    if !state.store.is_participant(room_id, user).await? {
        return Err(ApiError::Forbidden);
    }

    state.store.set_typing(room_id, user, request.is_typing).await?;
    Ok(StatusCode::OK)
}
