//! Represents the single published document for a calendar date.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::media::MediaType;

/// One calendar date's newspaper edition.
///
/// Rows are unique per `date`. A re-upload overwrites the row in place, so
/// `id` and `uploaded_at` survive a replace while everything else changes.
#[derive(Serialize, Clone, FromRow, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Edition {
    /// Internal UUID, stable across replaces.
    pub id: Uuid,

    /// Calendar day this edition is published for.
    pub date: NaiveDate,

    /// Opaque identifier of the blob in the object store.
    pub remote_id: String,

    /// Name the blob was stored under (`<date>.<ext>`).
    pub file_name: String,

    #[sqlx(try_from = "String")]
    pub media_type: MediaType,

    pub size_bytes: i64,

    /// Derived from `remote_id` by the store; cached for readers.
    pub preview_url: String,
    pub download_url: String,

    /// Administrator id of the last publisher.
    pub published_by: String,

    /// When the first edition for this date was published.
    pub uploaded_at: DateTime<Utc>,

    /// When this row was last written.
    pub updated_at: DateTime<Utc>,
}

/// Fields written by a publish, keyed by `date`.
#[derive(Clone, Debug)]
pub struct EditionFields {
    pub date: NaiveDate,
    pub remote_id: String,
    pub file_name: String,
    pub media_type: MediaType,
    pub size_bytes: i64,
    pub preview_url: String,
    pub download_url: String,
    pub published_by: String,
}
