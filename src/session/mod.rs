//! Client session: state reducer, reconnect backoff, and API client.

pub mod api;
pub mod backoff;
pub mod controller;

pub use api::{ApiClientError, ChatApi};
pub use backoff::Backoff;
pub use controller::SessionState;
