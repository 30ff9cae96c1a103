//! Shared test fixtures.
//!
//! Builds the application over the in-memory store and blob double, and
//! seeds users and rooms through the public store trait.

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;
use uuid::Uuid;

use parley::auth::sessions::create_token;
use parley::realtime::RoomFeeds;
use parley::server::config::ChatConfig;
use parley::server::init::create_app_with_state;
use parley::server::state::AppState;
use parley::shared::message::UserProfile;
use parley::shared::room::RoomKind;
use parley::storage::MemoryBlobStore;
use parley::store::{ChatStore, MemChatStore};

pub struct TestApp {
    pub state: AppState,
    pub store: MemChatStore,
    pub blobs: MemoryBlobStore,
}

impl TestApp {
    pub fn new() -> Self {
        let store = MemChatStore::new();
        let blobs = MemoryBlobStore::new();
        let state = AppState::new(
            Arc::new(store.clone()),
            RoomFeeds::new(),
            Arc::new(blobs.clone()),
            ChatConfig::default(),
        );
        Self { state, store, blobs }
    }

    pub fn router(&self) -> Router {
        create_app_with_state(self.state.clone())
    }

    pub fn server(&self) -> TestServer {
        TestServer::new(self.router()).expect("test server")
    }

    pub async fn seed_user(&self, id: Uuid, username: &str) {
        self.store
            .upsert_user(UserProfile {
                id,
                username: username.to_string(),
                avatar_url: None,
            })
            .await
            .expect("seed user");
    }

    pub async fn seed_direct_room(&self, a: Uuid, b: Uuid) -> Uuid {
        self.store
            .create_room(RoomKind::Direct, None, &[a, b])
            .await
            .expect("seed room")
            .id
    }
}

pub fn bearer(user: Uuid) -> String {
    format!("Bearer {}", create_token(user).expect("test token"))
}
