//! HTTP request handlers.

pub mod events;
pub mod messages;
pub mod typing;
pub mod unread;
pub mod upload;
