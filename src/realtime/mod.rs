//! Realtime change-feed plumbing.

pub mod feed;

pub use feed::{RoomEvent, RoomFeeds};
