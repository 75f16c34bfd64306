//! Remote object store adapters.
//!
//! The reconciler only sees the `ObjectStore` trait. Backends:
//! - `drive`: Google Drive v3, files made publicly readable on upload
//! - `local`: sharded files on disk, served by this process under `/files`
//! - `memory`: process-local map, for development
//!
//! `TimedStore` wraps any backend with a per-call deadline.

pub mod drive;
pub mod local;
pub mod memory;

use crate::models::media::MediaType;
use async_trait::async_trait;
use bytes::Bytes;
use std::{io, sync::Arc, time::Duration};
use thiserror::Error;

/// Result of a successful `put`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredBlob {
    pub remote_id: String,
    pub name: String,
    pub size_bytes: i64,
}

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("upload of `{name}` failed: {reason}")]
    Upload { name: String, reason: String },
    #[error("granting public read on `{remote_id}` failed: {reason}")]
    Permission { remote_id: String, reason: String },
    #[error("delete of `{remote_id}` failed: {reason}")]
    Delete { remote_id: String, reason: String },
    #[error("invalid remote id `{0}`")]
    InvalidRemoteId(String),
    #[error("authorization with the store failed: {0}")]
    Auth(String),
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Narrow contract the publish flow needs from blob storage.
///
/// `put` covers both the upload and the public-read grant: a blob is only
/// reported as stored once readers can fetch it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(
        &self,
        content: Bytes,
        name: &str,
        media_type: MediaType,
    ) -> Result<StoredBlob, ObjectStoreError>;

    /// URL for inline viewing. Pure function of the remote id.
    fn preview_url_for(&self, remote_id: &str) -> String;

    /// URL for downloading. Pure function of the remote id.
    fn download_url_for(&self, remote_id: &str) -> String;

    async fn delete(&self, remote_id: &str) -> Result<(), ObjectStoreError>;

    /// Readiness check; backends without a cheap probe report ready.
    async fn probe(&self) -> Result<(), ObjectStoreError> {
        Ok(())
    }
}

/// Bounds every remote call of the wrapped store by `limit`.
///
/// An elapsed deadline surfaces as `ObjectStoreError::Timeout`, which callers
/// handle exactly like any other failure of that call.
pub struct TimedStore {
    inner: Arc<dyn ObjectStore>,
    limit: Duration,
}

impl TimedStore {
    pub fn new(inner: Arc<dyn ObjectStore>, limit: Duration) -> Self {
        Self { inner, limit }
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, ObjectStoreError>
    where
        F: Future<Output = Result<T, ObjectStoreError>>,
    {
        tokio::time::timeout(self.limit, call)
            .await
            .map_err(|_| ObjectStoreError::Timeout(self.limit))?
    }
}

#[async_trait]
impl ObjectStore for TimedStore {
    async fn put(
        &self,
        content: Bytes,
        name: &str,
        media_type: MediaType,
    ) -> Result<StoredBlob, ObjectStoreError> {
        self.bounded(self.inner.put(content, name, media_type)).await
    }

    fn preview_url_for(&self, remote_id: &str) -> String {
        self.inner.preview_url_for(remote_id)
    }

    fn download_url_for(&self, remote_id: &str) -> String {
        self.inner.download_url_for(remote_id)
    }

    async fn delete(&self, remote_id: &str) -> Result<(), ObjectStoreError> {
        self.bounded(self.inner.delete(remote_id)).await
    }

    async fn probe(&self) -> Result<(), ObjectStoreError> {
        self.bounded(self.inner.probe()).await
    }
}
