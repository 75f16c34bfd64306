//! src/services/post_service.rs
//!
//! PostService: create, update and delete bilingual posts. Image handling
//! follows the edition publish order (upload, save the row, then delete the
//! replaced image best-effort).

use super::{
    CleanupOutcome, ServiceError, ServiceResult, delete_superseded,
    post_registry::PostRegistry,
};
use crate::{
    models::{
        media::{InvalidInput, MediaType, Upload},
        page::{Page, PageRequest},
        post::{Post, PostDraft, PostImage},
    },
    store::ObjectStore,
};
use bytes::Bytes;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub const DEFAULT_LATEST_LIMIT: u32 = 5;
pub const MAX_LATEST_LIMIT: u32 = 50;

/// A post write plus the fate of any image it replaced.
#[derive(Debug)]
pub struct PostOutcome {
    pub post: Post,
    pub cleanup: CleanupOutcome,
}

#[derive(Clone)]
pub struct PostService {
    registry: PostRegistry,
    store: Arc<dyn ObjectStore>,
}

impl PostService {
    pub fn new(registry: PostRegistry, store: Arc<dyn ObjectStore>) -> Self {
        Self { registry, store }
    }

    pub async fn create(
        &self,
        draft: PostDraft,
        upload: Upload,
        actor: &str,
    ) -> ServiceResult<Post> {
        draft.validate()?;
        let (content, media_type) = image_of(&upload)?.ok_or(InvalidInput::MissingFile)?;
        if actor.trim().is_empty() {
            return Err(InvalidInput::MissingField("actor").into());
        }

        let image = self.upload_image(content, media_type).await?;
        let post = self
            .registry
            .insert(&draft, &image, actor)
            .await
            .map_err(|err| orphaned(&image, err))?;

        info!(post_id = %post.id, remote_id = %post.remote_id, "created post");
        Ok(post)
    }

    /// Replace the text of a post; replace its image only if one is supplied.
    pub async fn update(
        &self,
        id: Uuid,
        draft: PostDraft,
        upload: Upload,
    ) -> ServiceResult<PostOutcome> {
        draft.validate()?;
        let replacement = image_of(&upload)?;

        let existing = self.get(id).await?;

        let image = match replacement {
            Some((content, media_type)) => Some(self.upload_image(content, media_type).await?),
            None => None,
        };

        let saved = match self.registry.update(id, &draft, image.as_ref()).await {
            Ok(saved) => saved,
            Err(err) => {
                return Err(match &image {
                    Some(image) => orphaned(image, err),
                    None => ServiceError::RegistryWrite(err),
                });
            }
        };

        let Some(post) = saved else {
            // Deleted while we were uploading; nothing references the new image.
            if let Some(image) = &image {
                delete_superseded(self.store.as_ref(), &image.remote_id).await;
            }
            return Err(not_found(id));
        };

        let cleanup = match image {
            Some(image) if image.remote_id != existing.remote_id => {
                delete_superseded(self.store.as_ref(), &existing.remote_id).await
            }
            _ => CleanupOutcome::NotNeeded,
        };

        info!(post_id = %post.id, remote_id = %post.remote_id, "updated post");
        Ok(PostOutcome { post, cleanup })
    }

    /// Remove a post: image first, then the row.
    pub async fn delete(&self, id: Uuid) -> ServiceResult<Post> {
        let post = self.get(id).await?;

        self.store
            .delete(&post.remote_id)
            .await
            .map_err(|source| ServiceError::RemoteCleanup {
                remote_id: post.remote_id.clone(),
                source,
            })?;

        let removed = self.registry.delete(id).await.map_err(|err| {
            warn!(post_id = %id, remote_id = %post.remote_id, error = %err, "image deleted but post row remains");
            ServiceError::RegistryWrite(err)
        })?;
        if removed == 0 {
            return Err(not_found(id));
        }

        info!(post_id = %id, "deleted post");
        Ok(post)
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<Post> {
        self.registry.find(id).await?.ok_or_else(|| not_found(id))
    }

    /// Newest posts, `limit` clamped to `1..=MAX_LATEST_LIMIT`.
    pub async fn latest(&self, limit: Option<u32>) -> ServiceResult<Vec<Post>> {
        let limit = limit
            .unwrap_or(DEFAULT_LATEST_LIMIT)
            .clamp(1, MAX_LATEST_LIMIT);
        Ok(self.registry.list(0, i64::from(limit)).await?)
    }

    pub async fn list(&self, page: u32, page_size: u32) -> ServiceResult<Page<Post>> {
        let request = PageRequest::new(page, page_size)?;
        let total = self.registry.count().await?;
        let items = self
            .registry
            .list(request.offset(), request.limit())
            .await?;
        Ok(Page::new(items, total, request))
    }

    async fn upload_image(&self, content: Bytes, media_type: MediaType) -> ServiceResult<PostImage> {
        let name = format!(
            "news_{}.{}",
            Utc::now().timestamp_millis(),
            media_type.extension()
        );
        let blob = self
            .store
            .put(content, &name, media_type)
            .await
            .map_err(ServiceError::RemoteStore)?;
        Ok(PostImage {
            image_url: self.store.preview_url_for(&blob.remote_id),
            remote_id: blob.remote_id,
        })
    }
}

/// Post images must be pictures; a PDF is rejected like any other type.
fn image_of(upload: &Upload) -> Result<Option<(Bytes, MediaType)>, InvalidInput> {
    match upload.validated()? {
        Some((_, media_type)) if !media_type.is_image() => Err(InvalidInput::MediaType(
            media_type.mime().to_string(),
        )),
        other => Ok(other),
    }
}

fn not_found(id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("no post with id {id}"))
}

fn orphaned(image: &PostImage, err: sqlx::Error) -> ServiceError {
    warn!(remote_id = %image.remote_id, error = %err, "post write failed after upload, image is orphaned");
    ServiceError::RegistryWrite(err)
}
