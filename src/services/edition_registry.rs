//! src/services/edition_registry.rs
//!
//! EditionRegistry: the durable date → edition index in SQLite. Uniqueness
//! of `date` is enforced by the `idx_editions_date` unique index, and writes go
//! through a single `INSERT … ON CONFLICT(date) DO UPDATE`, so concurrent
//! publishes for one date are serialized by SQLite instead of racing to insert.

use crate::models::{
    edition::{Edition, EditionFields},
    media::YearMonth,
};
use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

const EDITION_COLUMNS: &str = "id, date, remote_id, file_name, media_type, size_bytes, \
     preview_url, download_url, published_by, uploaded_at, updated_at";

pub type RegistryResult<T> = Result<T, sqlx::Error>;

/// Sort orders exposed for paged listings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditionOrder {
    /// Newest calendar date first (reader archive).
    DateDesc,
    /// Most recently first-published first (admin history).
    UploadedDesc,
}

impl EditionOrder {
    fn sql(self) -> &'static str {
        match self {
            Self::DateDesc => "date DESC",
            Self::UploadedDesc => "uploaded_at DESC, date DESC",
        }
    }
}

#[derive(Clone)]
pub struct EditionRegistry {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

impl EditionRegistry {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    pub async fn find_by_date(&self, date: NaiveDate) -> RegistryResult<Option<Edition>> {
        sqlx::query_as::<_, Edition>(&format!(
            "SELECT {EDITION_COLUMNS} FROM editions WHERE date = ?"
        ))
        .bind(date)
        .fetch_optional(&*self.db)
        .await
    }

    pub async fn find_by_id(&self, id: Uuid) -> RegistryResult<Option<Edition>> {
        sqlx::query_as::<_, Edition>(&format!(
            "SELECT {EDITION_COLUMNS} FROM editions WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&*self.db)
        .await
    }

    /// The edition first published most recently, regardless of its date.
    pub async fn find_latest(&self) -> RegistryResult<Option<Edition>> {
        sqlx::query_as::<_, Edition>(&format!(
            "SELECT {EDITION_COLUMNS} FROM editions \
             ORDER BY uploaded_at DESC, date DESC LIMIT 1"
        ))
        .fetch_optional(&*self.db)
        .await
    }

    /// Editions within `month`, newest date first.
    pub async fn list_by_month(&self, month: YearMonth) -> RegistryResult<Vec<Edition>> {
        sqlx::query_as::<_, Edition>(&format!(
            "SELECT {EDITION_COLUMNS} FROM editions WHERE date LIKE ? ORDER BY date DESC"
        ))
        .bind(month.date_pattern())
        .fetch_all(&*self.db)
        .await
    }

    pub async fn list_page(
        &self,
        order: EditionOrder,
        offset: i64,
        limit: i64,
    ) -> RegistryResult<Vec<Edition>> {
        sqlx::query_as::<_, Edition>(&format!(
            "SELECT {EDITION_COLUMNS} FROM editions ORDER BY {} LIMIT ? OFFSET ?",
            order.sql()
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&*self.db)
        .await
    }

    pub async fn count(&self) -> RegistryResult<u64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM editions")
            .fetch_one(&*self.db)
            .await?;
        Ok(total as u64)
    }

    /// Insert the edition for `fields.date`, or overwrite the existing one.
    ///
    /// On overwrite `id` and `uploaded_at` are kept and `updated_at` is bumped.
    pub async fn upsert(&self, fields: &EditionFields) -> RegistryResult<Edition> {
        let now = Utc::now();
        sqlx::query_as::<_, Edition>(&format!(
            r#"
            INSERT INTO editions (
                id, date, remote_id, file_name, media_type, size_bytes,
                preview_url, download_url, published_by, uploaded_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(date) DO UPDATE SET
                remote_id = excluded.remote_id,
                file_name = excluded.file_name,
                media_type = excluded.media_type,
                size_bytes = excluded.size_bytes,
                preview_url = excluded.preview_url,
                download_url = excluded.download_url,
                published_by = excluded.published_by,
                updated_at = excluded.updated_at
            RETURNING {EDITION_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(fields.date)
        .bind(&fields.remote_id)
        .bind(&fields.file_name)
        .bind(fields.media_type.extension())
        .bind(fields.size_bytes)
        .bind(&fields.preview_url)
        .bind(&fields.download_url)
        .bind(&fields.published_by)
        .bind(now)
        .bind(now)
        .fetch_one(&*self.db)
        .await
    }

    /// Remove the edition for `date`. Returns the number of rows removed.
    pub async fn delete_by_date(&self, date: NaiveDate) -> RegistryResult<u64> {
        let result = sqlx::query("DELETE FROM editions WHERE date = ?")
            .bind(date)
            .execute(&*self.db)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_by_id(&self, id: Uuid) -> RegistryResult<u64> {
        let result = sqlx::query("DELETE FROM editions WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        Ok(result.rows_affected())
    }
}
