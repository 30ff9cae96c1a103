//! Route table.

use axum::http::{Method, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::handlers::{events, messages, typing, unread, upload};
use crate::server::state::AppState;

/// Build the application router over the given state.
pub fn create_router(state: AppState) -> Router {
    // The event stream is consumed cross-origin by browser EventSource.
    let events_cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/chat/events", get(events::chat_events).layer(events_cors))
        .route(
            "/chat/messages",
            post(messages::send_message).get(messages::list_messages),
        )
        .route("/chat/messages/read", post(messages::mark_read))
        .route("/chat/unread", get(unread::unread_counts))
        .route(
            "/chat/typing",
            get(typing::typing_peers).post(typing::set_typing),
        )
        .route("/chat/upload", post(upload::upload))
        .nest_service("/static", ServeDir::new("public"))
        .fallback(|| async { (StatusCode::NOT_FOUND, "404 Not Found") })
        .with_state(state)
}
