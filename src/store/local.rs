//! On-disk object store.
//!
//! Blobs are written beneath `base_path/{shard}/{shard}/{remote_id}` where the
//! shards are the first two bytes of MD5(remote_id). Writes go to a temp file,
//! are fsynced, then renamed into place, so a blob is either fully present or
//! absent. Everything under the store is publicly readable through the
//! `/files/{remote_id}` route, so the public-read grant is implicit.

use super::{ObjectStore, ObjectStoreError, StoredBlob};
use crate::models::media::MediaType;
use async_trait::async_trait;
use bytes::Bytes;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct LocalObjectStore {
    /// Root directory for blob payloads.
    base_path: PathBuf,

    /// Externally reachable origin of this service, without trailing slash.
    public_base_url: String,
}

impl LocalObjectStore {
    pub fn new(base_path: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Remote ids are `<32 hex>.<ext>`; anything else never reaches the disk.
    fn ensure_remote_id_safe(remote_id: &str) -> Result<MediaType, ObjectStoreError> {
        let invalid = || ObjectStoreError::InvalidRemoteId(remote_id.to_string());
        let (stem, ext) = remote_id.split_once('.').ok_or_else(invalid)?;
        if stem.len() != 32 || !stem.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        MediaType::from_extension(ext).map_err(|_| invalid())
    }

    fn shards(remote_id: &str) -> (String, String) {
        let digest = md5::compute(remote_id);
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    fn blob_path(&self, remote_id: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::shards(remote_id);
        let mut path = self.base_path.clone();
        path.push(shard_a);
        path.push(shard_b);
        path.push(remote_id);
        path
    }

    /// Open a stored blob for streaming to a reader.
    ///
    /// Returns `None` when the id is well-formed but nothing is stored under it.
    pub async fn open(
        &self,
        remote_id: &str,
    ) -> Result<Option<(File, u64, MediaType)>, ObjectStoreError> {
        let media_type = Self::ensure_remote_id_safe(remote_id)?;
        match File::open(self.blob_path(remote_id)).await {
            Ok(file) => {
                let len = file.metadata().await?.len();
                Ok(Some((file, len, media_type)))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn write_atomically(&self, path: &Path, content: &[u8]) -> io::Result<()> {
        let parent = path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| io::Error::other("blob path missing parent directory"))?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));

        let written = async {
            let mut file = File::create(&tmp_path).await?;
            file.write_all(content).await?;
            file.flush().await?;
            file.sync_all().await?;
            fs::rename(&tmp_path, path).await
        }
        .await;

        if written.is_err() {
            let _ = fs::remove_file(&tmp_path).await;
        }
        written
    }

    /// Remove empty shard directories up to the store root.
    async fn prune_empty_dirs(&self, start: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(&self.base_path) && current != self.base_path {
            match fs::remove_dir(&current).await {
                Ok(_) => match current.parent() {
                    Some(parent) => current = parent.to_path_buf(),
                    None => break,
                },
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(
        &self,
        content: Bytes,
        name: &str,
        media_type: MediaType,
    ) -> Result<StoredBlob, ObjectStoreError> {
        let remote_id = format!("{}.{}", Uuid::new_v4().simple(), media_type.extension());
        let path = self.blob_path(&remote_id);

        self.write_atomically(&path, &content)
            .await
            .map_err(|err| ObjectStoreError::Upload {
                name: name.to_string(),
                reason: err.to_string(),
            })?;
        debug!(remote_id = %remote_id, path = %path.display(), "stored blob");

        Ok(StoredBlob {
            remote_id,
            name: name.to_string(),
            size_bytes: content.len() as i64,
        })
    }

    fn preview_url_for(&self, remote_id: &str) -> String {
        format!("{}/files/{}", self.public_base_url, remote_id)
    }

    fn download_url_for(&self, remote_id: &str) -> String {
        format!("{}/files/{}?download=1", self.public_base_url, remote_id)
    }

    async fn delete(&self, remote_id: &str) -> Result<(), ObjectStoreError> {
        Self::ensure_remote_id_safe(remote_id)?;
        let path = self.blob_path(remote_id);
        match fs::remove_file(&path).await {
            Ok(_) => debug!("removed blob {}", path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("blob {} already missing", path.display());
            }
            Err(err) => {
                return Err(ObjectStoreError::Delete {
                    remote_id: remote_id.to_string(),
                    reason: err.to_string(),
                });
            }
        }

        if let Some(parent) = path.parent() {
            self.prune_empty_dirs(parent).await;
        }
        Ok(())
    }

    /// Write, read back and delete a scratch file under the store root.
    async fn probe(&self) -> Result<(), ObjectStoreError> {
        fs::create_dir_all(&self.base_path).await?;
        let tmp_path = self.base_path.join(format!(".readyz-{}", Uuid::new_v4()));
        fs::write(&tmp_path, b"readyz").await?;
        let read_back = fs::read(&tmp_path).await;
        let _ = fs::remove_file(&tmp_path).await;
        if read_back? != b"readyz" {
            return Err(io::Error::other("scratch file content mismatch").into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    fn store(dir: &tempfile::TempDir) -> LocalObjectStore {
        LocalObjectStore::new(dir.path(), "http://localhost:3000/")
    }

    #[tokio::test]
    async fn put_then_open_returns_the_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        let blob = store
            .put(Bytes::from_static(b"%PDF-1.7"), "2025-03-01.pdf", MediaType::Pdf)
            .await
            .unwrap();
        assert_eq!(blob.name, "2025-03-01.pdf");
        assert_eq!(blob.size_bytes, 8);
        assert!(blob.remote_id.ends_with(".pdf"));

        let (mut file, len, media_type) = store.open(&blob.remote_id).await.unwrap().unwrap();
        let mut content = Vec::new();
        file.read_to_end(&mut content).await.unwrap();
        assert_eq!(content, b"%PDF-1.7");
        assert_eq!(len, 8);
        assert_eq!(media_type, MediaType::Pdf);
    }

    #[tokio::test]
    async fn each_put_gets_a_fresh_remote_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let a = store
            .put(Bytes::from_static(b"a"), "2025-03-01.png", MediaType::Png)
            .await
            .unwrap();
        let b = store
            .put(Bytes::from_static(b"b"), "2025-03-01.png", MediaType::Png)
            .await
            .unwrap();
        assert_ne!(a.remote_id, b.remote_id);
    }

    #[tokio::test]
    async fn delete_removes_blob_and_tolerates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let blob = store
            .put(Bytes::from_static(b"img"), "news_1.jpg", MediaType::Jpg)
            .await
            .unwrap();

        store.delete(&blob.remote_id).await.unwrap();
        assert!(store.open(&blob.remote_id).await.unwrap().is_none());
        store.delete(&blob.remote_id).await.unwrap();
    }

    #[tokio::test]
    async fn rejects_unsafe_remote_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        for id in ["../etc/passwd", "abc.pdf", "0123456789abcdef0123456789abcdef.exe"] {
            assert!(matches!(
                store.open(id).await,
                Err(ObjectStoreError::InvalidRemoteId(_))
            ));
        }
    }

    #[tokio::test]
    async fn urls_are_derived_from_the_remote_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        assert_eq!(
            store.preview_url_for("abc.pdf"),
            "http://localhost:3000/files/abc.pdf"
        );
        assert_eq!(
            store.download_url_for("abc.pdf"),
            "http://localhost:3000/files/abc.pdf?download=1"
        );
        store.probe().await.unwrap();
    }
}
