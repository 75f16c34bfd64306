//! src/services/publish_service.rs
//!
//! PublishService: turns an uploaded file into the authoritative edition for
//! a date.
//!
//! Steps run strictly in this order:
//! 1. validate everything (no side effects on failure)
//! 2. look up the prior edition for the date
//! 3. upload the new blob (public-read included)
//! 4. upsert the registry row (the durability point)
//! 5. delete the prior blob, best-effort
//!
//! A crash or registry failure between 3 and 4 leaves an orphaned blob; it is
//! logged with its remote id and never swept automatically.

use super::{
    CleanupOutcome, ServiceError, ServiceResult, delete_superseded,
    edition_registry::EditionRegistry,
};
use crate::{
    models::{
        edition::{Edition, EditionFields},
        media::{InvalidInput, Upload, parse_edition_date},
    },
    store::ObjectStore,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// A publish as received from an authenticated administrator.
#[derive(Clone, Debug)]
pub struct PublishRequest {
    /// Raw `YYYY-MM-DD` date field.
    pub date: String,
    pub upload: Upload,
    /// Administrator id of the caller.
    pub actor: String,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PublishAction {
    Created,
    Replaced,
}

#[derive(Debug)]
pub struct PublishOutcome {
    pub edition: Edition,
    pub action: PublishAction,
    /// Fate of the superseded blob; never affects success.
    pub cleanup: CleanupOutcome,
}

#[derive(Clone)]
pub struct PublishService {
    registry: EditionRegistry,
    store: Arc<dyn ObjectStore>,
}

impl PublishService {
    pub fn new(registry: EditionRegistry, store: Arc<dyn ObjectStore>) -> Self {
        Self { registry, store }
    }

    /// Publish `request.upload` as the edition for `request.date`, creating or
    /// replacing it.
    pub async fn publish(&self, request: PublishRequest) -> ServiceResult<PublishOutcome> {
        let date = parse_edition_date(&request.date)?;
        let (content, media_type) = request
            .upload
            .validated()?
            .ok_or(InvalidInput::MissingFile)?;
        if request.actor.trim().is_empty() {
            return Err(InvalidInput::MissingField("actor").into());
        }

        let prior = self.registry.find_by_date(date).await?;

        let name = format!("{date}.{}", media_type.extension());
        let blob = self
            .store
            .put(content, &name, media_type)
            .await
            .map_err(ServiceError::RemoteStore)?;

        let fields = EditionFields {
            date,
            preview_url: self.store.preview_url_for(&blob.remote_id),
            download_url: self.store.download_url_for(&blob.remote_id),
            remote_id: blob.remote_id,
            file_name: blob.name,
            media_type,
            size_bytes: blob.size_bytes,
            published_by: request.actor,
        };

        let edition = match self.registry.upsert(&fields).await {
            Ok(edition) => edition,
            Err(err) => {
                warn!(
                    date = %date,
                    remote_id = %fields.remote_id,
                    error = %err,
                    "registry write failed after upload, blob is orphaned"
                );
                return Err(ServiceError::RegistryWrite(err));
            }
        };

        let cleanup = match prior.as_ref() {
            Some(prior) if prior.remote_id != edition.remote_id => {
                delete_superseded(self.store.as_ref(), &prior.remote_id).await
            }
            _ => CleanupOutcome::NotNeeded,
        };

        let action = if prior.is_some() {
            PublishAction::Replaced
        } else {
            PublishAction::Created
        };
        info!(
            date = %date,
            remote_id = %edition.remote_id,
            action = ?action,
            "published edition"
        );

        Ok(PublishOutcome {
            edition,
            action,
            cleanup,
        })
    }

    /// Remove an edition by id: blob first, then the row.
    pub async fn delete_by_id(&self, id: Uuid) -> ServiceResult<Edition> {
        let edition = self
            .registry
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("no edition with id {id}")))?;

        self.delete_blob(&edition).await?;
        let removed = self
            .registry
            .delete_by_id(id)
            .await
            .map_err(|err| self.dangling(&edition, err))?;
        self.finish_delete(edition, removed)
    }

    /// Remove the edition for a `YYYY-MM-DD` date: blob first, then the row.
    pub async fn delete_by_date(&self, raw_date: &str) -> ServiceResult<Edition> {
        let date = parse_edition_date(raw_date)?;
        let edition = self
            .registry
            .find_by_date(date)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("no edition for {date}")))?;

        self.delete_blob(&edition).await?;
        let removed = self
            .registry
            .delete_by_date(date)
            .await
            .map_err(|err| self.dangling(&edition, err))?;
        self.finish_delete(edition, removed)
    }

    /// Blob deletion is fatal here; the row is only removed after it succeeds.
    async fn delete_blob(&self, edition: &Edition) -> ServiceResult<()> {
        self.store
            .delete(&edition.remote_id)
            .await
            .map_err(|source| ServiceError::RemoteCleanup {
                remote_id: edition.remote_id.clone(),
                source,
            })
    }

    fn dangling(&self, edition: &Edition, err: sqlx::Error) -> ServiceError {
        warn!(
            date = %edition.date,
            remote_id = %edition.remote_id,
            error = %err,
            "blob deleted but registry row remains, row now references a missing blob"
        );
        ServiceError::RegistryWrite(err)
    }

    fn finish_delete(&self, edition: Edition, removed: u64) -> ServiceResult<Edition> {
        if removed == 0 {
            return Err(ServiceError::NotFound(format!(
                "edition for {} was already removed",
                edition.date
            )));
        }
        info!(date = %edition.date, remote_id = %edition.remote_id, "deleted edition");
        Ok(edition)
    }
}
