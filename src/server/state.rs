//! Application state.
//!
//! `AppState` is the central container handed to the router. The store and
//! blob store sit behind trait objects so the same handlers run against
//! Postgres in production and the in-memory doubles in tests. `FromRef`
//! impls let handlers extract just the part they need.

use std::sync::Arc;

use axum::extract::FromRef;

use crate::realtime::RoomFeeds;
use crate::server::config::ChatConfig;
use crate::storage::BlobStore;
use crate::store::ChatStore;

#[derive(Clone)]
pub struct AppState {
    /// Durable store: the single source of truth for message ordering.
    pub store: Arc<dyn ChatStore>,
    /// Per-room change-feed channels for the SSE bridge.
    pub feeds: RoomFeeds,
    /// Attachment storage boundary.
    pub blobs: Arc<dyn BlobStore>,
    pub config: Arc<ChatConfig>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ChatStore>,
        feeds: RoomFeeds,
        blobs: Arc<dyn BlobStore>,
        config: ChatConfig,
    ) -> Self {
        Self {
            store,
            feeds,
            blobs,
            config: Arc::new(config),
        }
    }
}

impl FromRef<AppState> for Arc<dyn ChatStore> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.store.clone()
    }
}

impl FromRef<AppState> for RoomFeeds {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.feeds.clone()
    }
}

impl FromRef<AppState> for Arc<ChatConfig> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.config.clone()
    }
}
