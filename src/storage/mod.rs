//! External object storage boundary.

pub mod blobs;

pub use blobs::{BlobError, BlobStore, LocalBlobStore, MemoryBlobStore};
