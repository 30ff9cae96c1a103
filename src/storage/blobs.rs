//! Blob storage boundary for chat attachments.
//!
//! The object store is an external collaborator exposing upload-by-path and
//! public-URL retrieval. [`LocalBlobStore`] writes under the directory that
//! the static file service serves; [`MemoryBlobStore`] is the test double.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Upload-by-path object storage
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` at `path` and return the public URL.
    async fn put(&self, path: &str, bytes: Bytes) -> Result<String, BlobError>;
}

/// Blob store backed by a local directory served as static files
pub struct LocalBlobStore {
    root: PathBuf,
    public_base: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.into(),
        }
    }
}

#[async_trait::async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, path: &str, bytes: Bytes) -> Result<String, BlobError> {
        let target = self.root.join(path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, &bytes).await?;
        Ok(format!("{}/{}", self.public_base.trim_end_matches('/'), path))
    }
}

/// In-memory blob store for tests
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    objects: Arc<Mutex<HashMap<String, Bytes>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().expect("blob map poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, path: &str) -> bool {
        self.objects.lock().expect("blob map poisoned").contains_key(path)
    }
}

#[async_trait::async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, path: &str, bytes: Bytes) -> Result<String, BlobError> {
        self.objects
            .lock()
            .expect("blob map poisoned")
            .insert(path.to_string(), bytes);
        Ok(format!("/static/{path}"))
    }
}
