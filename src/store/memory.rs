//! Process-local object store for development runs. Contents vanish on exit.

use super::{ObjectStore, ObjectStoreError, StoredBlob};
use crate::models::media::MediaType;
use async_trait::async_trait;
use bytes::Bytes;
use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryObjectStore {
    blobs: Mutex<HashMap<String, (Bytes, MediaType)>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn blobs(&self) -> MutexGuard<'_, HashMap<String, (Bytes, MediaType)>> {
        self.blobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
impl MemoryObjectStore {
    pub fn contains(&self, remote_id: &str) -> bool {
        self.blobs().contains_key(remote_id)
    }

    pub fn get(&self, remote_id: &str) -> Option<(Bytes, MediaType)> {
        self.blobs().get(remote_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.blobs().len()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(
        &self,
        content: Bytes,
        name: &str,
        media_type: MediaType,
    ) -> Result<StoredBlob, ObjectStoreError> {
        let remote_id = format!("{}.{}", Uuid::new_v4().simple(), media_type.extension());
        let size_bytes = content.len() as i64;
        self.blobs().insert(remote_id.clone(), (content, media_type));
        Ok(StoredBlob {
            remote_id,
            name: name.to_string(),
            size_bytes,
        })
    }

    fn preview_url_for(&self, remote_id: &str) -> String {
        format!("memory://{remote_id}")
    }

    fn download_url_for(&self, remote_id: &str) -> String {
        format!("memory://{remote_id}?download=1")
    }

    async fn delete(&self, remote_id: &str) -> Result<(), ObjectStoreError> {
        self.blobs().remove(remote_id);
        Ok(())
    }
}
