//! Authentication boundary.

pub mod sessions;
