//! Unread count handlers.
//!
//! Unread is a derived view, so this endpoint degrades instead of failing:
//! a store error yields zeroed counts with a 200, and a missing session
//! yields zeroed counts with a 401. Clients always get a body they can
//! render. Responses carry a short private `Cache-Control` window to absorb
//! polling bursts.

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::sessions;
use crate::server::state::AppState;
use crate::store::RoomUnread;

#[derive(Debug, Deserialize)]
pub struct UnreadQuery {
    pub room_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoomUnreadBody {
    #[serde(rename = "roomId")]
    pub room_id: Uuid,
    #[serde(rename = "roomName")]
    pub room_name: Option<String>,
    #[serde(rename = "unreadCount")]
    pub unread_count: u64,
    #[serde(rename = "latestMessageTime")]
    pub latest_message_time: Option<DateTime<Utc>>,
}

impl From<RoomUnread> for RoomUnreadBody {
    fn from(entry: RoomUnread) -> Self {
        Self {
            room_id: entry.room_id,
            room_name: entry.room_name,
            unread_count: entry.unread_count,
            latest_message_time: entry.latest_message_time,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnreadSummaryBody {
    #[serde(rename = "hasUnreadMessages")]
    pub has_unread_messages: bool,
    #[serde(rename = "totalUnreadCount")]
    pub total_unread_count: u64,
    #[serde(rename = "roomCounts")]
    pub room_counts: Vec<RoomUnreadBody>,
}

impl UnreadSummaryBody {
    fn zeroed() -> Self {
        Self {
            has_unread_messages: false,
            total_unread_count: 0,
            room_counts: Vec::new(),
        }
    }

    fn from_entries(entries: Vec<RoomUnread>) -> Self {
        let total: u64 = entries.iter().map(|e| e.unread_count).sum();
        Self {
            has_unread_messages: total > 0,
            total_unread_count: total,
            room_counts: entries.into_iter().map(RoomUnreadBody::from).collect(),
        }
    }
}

fn zeroed_room(room_id: Uuid) -> RoomUnreadBody {
    RoomUnreadBody {
        room_id,
        room_name: None,
        unread_count: 0,
        latest_message_time: None,
    }
}

/// GET /chat/unread[?room_id=<uuid>]
pub async fn unread_counts(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<UnreadQuery>,
) -> Response {
    let cache_control = format!("private, max-age={}", state.config.unread_cache_max_age);

    let user = match sessions::current_user(&headers) {
        Ok(user) => user,
        Err(_) => {
            // Unauthenticated callers still get a renderable zeroed body.
            let body: Response = match query.room_id {
                Some(room_id) => Json(zeroed_room(room_id)).into_response(),
                None => Json(UnreadSummaryBody::zeroed()).into_response(),
            };
            return with_cache(StatusCode::UNAUTHORIZED, &cache_control, body);
        }
    };

    match query.room_id {
        Some(room_id) => {
            let body = match state.store.room_unread(user, room_id).await {
                Ok(entry) => RoomUnreadBody::from(entry),
                Err(e) => {
                    tracing::warn!("room unread lookup failed for {room_id}: {e:?}");
                    zeroed_room(room_id)
                }
            };
            with_cache(StatusCode::OK, &cache_control, Json(body).into_response())
        }
        None => {
            let body = match state
                .store
                .unread_summary(user, state.config.unread_page_size)
                .await
            {
                Ok(entries) => UnreadSummaryBody::from_entries(entries),
                Err(e) => {
                    tracing::warn!("unread summary failed for user {user}: {e:?}");
                    UnreadSummaryBody::zeroed()
                }
            };
            with_cache(StatusCode::OK, &cache_control, Json(body).into_response())
        }
    }
}

fn with_cache(status: StatusCode, cache_control: &str, mut response: Response) -> Response {
    *response.status_mut() = status;
    if let Ok(value) = header::HeaderValue::from_str(cache_control) {
        response.headers_mut().insert(header::CACHE_CONTROL, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(count: u64) -> RoomUnread {
        RoomUnread {
            room_id: Uuid::from_u128(1),
            room_name: Some("general".to_string()),
            unread_count: count,
            latest_message_time: Some(Utc::now()),
        }
    }

    #[test]
    fn summary_totals_across_rooms() {
        let summary = UnreadSummaryBody::from_entries(vec![entry(2), entry(3)]);
        assert!(summary.has_unread_messages);
        assert_eq!(summary.total_unread_count, 5);
        assert_eq!(summary.room_counts.len(), 2);
    }

    #[test]
    fn summary_with_only_read_rooms_has_no_unread() {
        let summary = UnreadSummaryBody::from_entries(vec![entry(0)]);
        assert!(!summary.has_unread_messages);
        assert_eq!(summary.total_unread_count, 0);
        // Rooms with activity still appear even when fully read.
        assert_eq!(summary.room_counts.len(), 1);
    }

    #[test]
    fn wire_fields_are_camel_case() {
        let json = serde_json::to_value(UnreadSummaryBody::from_entries(vec![entry(1)])).unwrap();
        assert!(json.get("hasUnreadMessages").is_some());
        assert!(json.get("totalUnreadCount").is_some());
        assert!(json["roomCounts"][0].get("unreadCount").is_some());
        assert!(json["roomCounts"][0].get("latestMessageTime").is_some());
    }
}
