//! Filesystem-backed blob store for raw page content.
//!
//! Blobs are stored verbatim under deterministic keys of the form
//! `{entity_id}/{tournament_id}/{scraped_at_millis}.html`. Every write goes
//! to a fresh key; there are no blind overwrites.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::compute_content_hash;

/// Blob store error kinds.
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob not found: {0}")]
    NotFound(String),
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("transient blob store error: {0}")]
    Transient(String),
}

impl BlobError {
    fn from_io(key: &str, e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(key.to_string()),
            std::io::ErrorKind::PermissionDenied => Self::AccessDenied(key.to_string()),
            _ => Self::Transient(format!("{key}: {e}")),
        }
    }
}

/// Result of a successful put.
#[derive(Debug, Clone)]
pub struct PutResult {
    pub etag: String,
    pub size: u64,
}

/// A fetched blob with its metadata.
#[derive(Debug, Clone)]
pub struct BlobContent {
    pub bytes: Vec<u8>,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Content-addressed blob storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes verbatim under a key. Returns etag (content hash) and size.
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<PutResult, BlobError>;

    /// Fetch the bytes stored under a key.
    async fn get(&self, key: &str) -> Result<BlobContent, BlobError>;

    /// Check whether a key exists.
    async fn exists(&self, key: &str) -> bool;
}

/// Build the deterministic blob key for a scraped page.
pub fn page_blob_key(entity_id: &str, tournament_id: &str, scraped_at: DateTime<Utc>) -> String {
    format!("{}/{}/{}.html", entity_id, tournament_id, scraped_at.timestamp_millis())
}

/// Blob store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<PutResult, BlobError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BlobError::from_io(key, e))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| BlobError::from_io(key, e))?;

        Ok(PutResult {
            etag: compute_content_hash(bytes),
            size: bytes.len() as u64,
        })
    }

    async fn get(&self, key: &str) -> Result<BlobContent, BlobError> {
        let path = self.path_for(key);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| BlobError::from_io(key, e))?;
        let last_modified = tokio::fs::metadata(&path)
            .await
            .ok()
            .and_then(|m| m.modified().ok())
            .map(DateTime::<Utc>::from);

        Ok(BlobContent {
            bytes,
            last_modified,
        })
    }

    async fn exists(&self, key: &str) -> bool {
        self.path_for(key).exists()
    }
}
