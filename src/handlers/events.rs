//! SSE event stream bridge.
//!
//! One long-lived HTTP response per (client, room). The handler validates
//! the session and room membership, subscribes to the room's change feed,
//! emits a `connected` frame, and then runs two background tasks: a pump
//! forwarding feed events as frames and a keep-alive ping loop. Both tasks
//! stop silently the first time a frame cannot be enqueued, which is how
//! client disconnects are detected.

use std::time::Duration;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde::Deserialize;
use tokio::sync::broadcast;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

use crate::auth::sessions;
use crate::error::ApiError;
use crate::realtime::RoomEvent;
use crate::server::state::AppState;
use crate::shared::event::ChatEvent;

type FrameSender = mpsc::UnboundedSender<Result<Bytes, std::io::Error>>;

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    #[serde(rename = "roomId")]
    pub room_id: Option<Uuid>,
}

/// GET /chat/events?roomId=<uuid>
pub async fn chat_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<EventsQuery>,
) -> Result<Response, ApiError> {
    let user = sessions::current_user(&headers)?;
    let room_id = query
        .room_id
        .ok_or_else(|| ApiError::InvalidInput("roomId query parameter is required".to_string()))?;

    if !state.store.is_participant(room_id, user).await? {
        return Err(ApiError::Forbidden);
    }

    let feed_rx = state.feeds.subscribe(room_id);
    let (tx, rx) = mpsc::unbounded_channel::<Result<Bytes, std::io::Error>>();

    // The connected frame goes out before anything the pump can produce.
    send_frame(&tx, &ChatEvent::connected(room_id));
    tracing::info!("user {user} subscribed to events for room {room_id}");

    tokio::spawn(pump_room_events(feed_rx, tx.clone(), room_id));
    tokio::spawn(keep_alive(tx, state.config.ping_interval));

    let body = Body::from_stream(UnboundedReceiverStream::new(rx));
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
            // Disable proxy buffering so frames reach the client promptly.
            (header::HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        body,
    )
        .into_response())
}

/// Encode and enqueue one frame. Returns false when the connection is gone.
/// An encoding failure is logged and skipped without ending the stream.
fn send_frame(tx: &FrameSender, event: &ChatEvent) -> bool {
    match event.sse_frame() {
        Ok(frame) => tx.send(Ok(Bytes::from(frame))).is_ok(),
        Err(e) => {
            tracing::error!("failed to encode chat event: {e:?}");
            true
        }
    }
}

/// Forward feed events for one room to one connection until either side
/// goes away. Watching `tx.closed()` releases the broadcast subscription
/// the moment the client disconnects, even when the room is quiet.
pub(crate) async fn pump_room_events(
    mut feed_rx: broadcast::Receiver<RoomEvent>,
    tx: FrameSender,
    room_id: Uuid,
) {
    loop {
        tokio::select! {
            received = feed_rx.recv() => match received {
                Ok(event) => {
                    let event = match event {
                        RoomEvent::MessageCreated(message) => ChatEvent::new_message(message),
                        RoomEvent::ParticipantUpdated(update) => {
                            ChatEvent::participant_update(update)
                        }
                    };
                    if !send_frame(&tx, &event) {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("event pump for room {room_id} lagged, skipped {skipped} events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = tx.closed() => {
                tracing::debug!("subscriber for room {room_id} disconnected, dropping feed subscription");
                break;
            }
        }
    }
}

/// Emit a `ping` frame on the configured interval until the connection
/// drops.
pub(crate) async fn keep_alive(tx: FrameSender, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    // interval fires immediately; the first ping waits a full period.
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if !send_frame(&tx, &ChatEvent::ping()) {
                    break;
                }
            }
            _ = tx.closed() => break,
        }
    }
}
