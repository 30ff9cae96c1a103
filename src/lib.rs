//! Parley - real-time chat delivery core.
//!
//! A chat server built around a durable message store with per-participant
//! read watermarks, ephemeral typing presence, and an SSE bridge that fans
//! committed changes out to connected clients. The crate also ships the
//! client-side session controller: a pure state reducer plus a typed HTTP
//! client.
//!
//! # Module Structure
//!
//! - **`shared`** - Wire types used on both sides: rooms, messages, stream
//!   events
//! - **`store`** - The [`store::ChatStore`] trait with Postgres and
//!   in-memory implementations
//! - **`realtime`** - Per-room broadcast change feeds
//! - **`handlers`** / **`routes`** - Axum HTTP surface, including the
//!   `/chat/events` SSE bridge
//! - **`session`** - Client session reducer, reconnect backoff, API client
//! - **`auth`**, **`storage`**, **`server`** - JWT sessions, attachment
//!   blobs, configuration and assembly

pub mod auth;
pub mod error;
pub mod handlers;
pub mod realtime;
pub mod routes;
pub mod server;
pub mod session;
pub mod shared;
pub mod storage;
pub mod store;
