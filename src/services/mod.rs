//! Domain services: the edition and post registries, the publish reconciler,
//! read-side retrieval, and the post store.
//!
//! Every mutating flow uploads first, records second and cleans up last. The
//! cleanup step never decides the outcome of a publish; it is reported as a
//! `CleanupOutcome` next to the primary result instead.

pub mod edition_registry;
pub mod post_registry;
pub mod post_service;
pub mod publish_service;
pub mod retrieval_service;

use crate::{models::media::InvalidInput, store::ObjectStore, store::ObjectStoreError};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] InvalidInput),
    #[error("{0}")]
    NotFound(String),
    /// Upload or public-read grant failed; nothing was recorded.
    #[error("remote store failure: {0}")]
    RemoteStore(#[source] ObjectStoreError),
    /// A registry write failed, possibly after a successful upload.
    #[error("registry write failed: {0}")]
    RegistryWrite(#[source] sqlx::Error),
    /// A blob delete failed where the caller must not proceed without it.
    #[error("removing blob `{remote_id}` failed: {source}")]
    RemoteCleanup {
        remote_id: String,
        #[source]
        source: ObjectStoreError,
    },
    #[error(transparent)]
    Registry(#[from] sqlx::Error),
}

impl ServiceError {
    /// Machine-readable kind reported to API callers.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::RemoteStore(_) => "remote_store",
            Self::RegistryWrite(_) => "registry_write",
            Self::RemoteCleanup { .. } => "remote_cleanup",
            Self::Registry(_) => "registry",
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// What happened to a superseded blob after the primary write succeeded.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CleanupOutcome {
    /// Nothing was superseded.
    NotNeeded,
    Deleted {
        remote_id: String,
    },
    /// The blob is now orphaned in the store.
    Failed {
        remote_id: String,
        reason: String,
    },
}

impl CleanupOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Delete a superseded blob, logging instead of failing.
pub(crate) async fn delete_superseded(store: &dyn ObjectStore, remote_id: &str) -> CleanupOutcome {
    match store.delete(remote_id).await {
        Ok(()) => CleanupOutcome::Deleted {
            remote_id: remote_id.to_string(),
        },
        Err(err) => {
            warn!(remote_id, error = %err, "failed to delete superseded blob, leaving it orphaned");
            CleanupOutcome::Failed {
                remote_id: remote_id.to_string(),
                reason: err.to_string(),
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! A failure-injecting store wrapper shared by the service tests.

    use crate::{
        models::media::MediaType,
        store::{ObjectStore, ObjectStoreError, StoredBlob, memory::MemoryObjectStore},
    };
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    };

    #[derive(Default)]
    pub struct FlakyStore {
        pub inner: MemoryObjectStore,
        pub fail_put: AtomicBool,
        pub fail_delete: AtomicBool,
        pub puts: AtomicUsize,
        pub deletes: Mutex<Vec<String>>,
    }

    impl FlakyStore {
        pub fn fail_puts(&self) {
            self.fail_put.store(true, Ordering::SeqCst);
        }

        pub fn fail_deletes(&self) {
            self.fail_delete.store(true, Ordering::SeqCst);
        }

        pub fn put_count(&self) -> usize {
            self.puts.load(Ordering::SeqCst)
        }

        pub fn deleted(&self) -> Vec<String> {
            self.deletes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ObjectStore for FlakyStore {
        async fn put(
            &self,
            content: Bytes,
            name: &str,
            media_type: MediaType,
        ) -> Result<StoredBlob, ObjectStoreError> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            if self.fail_put.load(Ordering::SeqCst) {
                return Err(ObjectStoreError::Upload {
                    name: name.to_string(),
                    reason: "injected".into(),
                });
            }
            self.inner.put(content, name, media_type).await
        }

        fn preview_url_for(&self, remote_id: &str) -> String {
            self.inner.preview_url_for(remote_id)
        }

        fn download_url_for(&self, remote_id: &str) -> String {
            self.inner.download_url_for(remote_id)
        }

        async fn delete(&self, remote_id: &str) -> Result<(), ObjectStoreError> {
            self.deletes.lock().unwrap().push(remote_id.to_string());
            if self.fail_delete.load(Ordering::SeqCst) {
                return Err(ObjectStoreError::Delete {
                    remote_id: remote_id.to_string(),
                    reason: "injected".into(),
                });
            }
            self.inner.delete(remote_id).await
        }
    }
}
