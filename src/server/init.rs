//! Server initialization.
//!
//! Builds the application state, picks the store implementation (Postgres
//! when configured, in-memory otherwise), wires the router, and starts the
//! background maintenance task.

use std::sync::Arc;

use axum::Router;
use chrono::Utc;

use crate::realtime::RoomFeeds;
use crate::routes::create_router;
use crate::server::config::{load_database, ChatConfig};
use crate::server::state::AppState;
use crate::storage::LocalBlobStore;
use crate::store::{ChatStore, MemChatStore, PgChatStore};

/// Create and configure the application.
pub async fn create_app() -> Router<()> {
    tracing::info!("initializing parley server");

    let config = ChatConfig::from_env();

    let store: Arc<dyn ChatStore> = match load_database().await {
        Some(pool) => Arc::new(PgChatStore::new(pool)),
        None => Arc::new(MemChatStore::new()),
    };

    let state = AppState::new(
        store,
        RoomFeeds::new(),
        Arc::new(LocalBlobStore::new("public/uploads", "/static/uploads")),
        config,
    );

    spawn_maintenance(state.clone());
    create_router(state)
}

/// Create the application over explicit state. Used by tests to inject the
/// in-memory store and blob double.
pub fn create_app_with_state(state: AppState) -> Router<()> {
    create_router(state)
}

/// Periodic maintenance: purge typing rows that have sat idle far past the
/// liveness window, and drop feed channels nobody subscribes to anymore.
/// Read-time expiry stays authoritative; this only bounds row accumulation.
pub fn spawn_maintenance(state: AppState) {
    let interval = state.config.typing_purge_interval;
    let purge_age = chrono::Duration::from_std(state.config.typing_purge_age)
        .unwrap_or(chrono::Duration::seconds(60));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match state.store.purge_stale_typing(Utc::now() - purge_age).await {
                Ok(0) => {}
                Ok(removed) => tracing::debug!("purged {removed} stale typing rows"),
                Err(e) => tracing::warn!("typing purge failed: {e:?}"),
            }
            state.feeds.cleanup_inactive();
        }
    });
}
