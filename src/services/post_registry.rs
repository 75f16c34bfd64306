//! SQLite persistence for announcement posts.

use crate::models::post::{Post, PostDraft, PostImage};
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

use super::edition_registry::RegistryResult;

const POST_COLUMNS: &str = "id, title_mr, title_en, description_mr, description_en, \
     image_url, remote_id, published_by, created_at, updated_at";

#[derive(Clone)]
pub struct PostRegistry {
    pub db: Arc<SqlitePool>,
}

impl PostRegistry {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    pub async fn find(&self, id: Uuid) -> RegistryResult<Option<Post>> {
        sqlx::query_as::<_, Post>(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?"))
            .bind(id)
            .fetch_optional(&*self.db)
            .await
    }

    pub async fn insert(
        &self,
        draft: &PostDraft,
        image: &PostImage,
        published_by: &str,
    ) -> RegistryResult<Post> {
        let now = Utc::now();
        sqlx::query_as::<_, Post>(&format!(
            r#"
            INSERT INTO posts (
                id, title_mr, title_en, description_mr, description_en,
                image_url, remote_id, published_by, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&draft.title_mr)
        .bind(&draft.title_en)
        .bind(&draft.description_mr)
        .bind(&draft.description_en)
        .bind(&image.image_url)
        .bind(&image.remote_id)
        .bind(published_by)
        .bind(now)
        .bind(now)
        .fetch_one(&*self.db)
        .await
    }

    /// Overwrite the text of a post and, when given, its image.
    ///
    /// Returns `None` when the post no longer exists.
    pub async fn update(
        &self,
        id: Uuid,
        draft: &PostDraft,
        image: Option<&PostImage>,
    ) -> RegistryResult<Option<Post>> {
        sqlx::query_as::<_, Post>(&format!(
            r#"
            UPDATE posts SET
                title_mr = ?,
                title_en = ?,
                description_mr = ?,
                description_en = ?,
                image_url = COALESCE(?, image_url),
                remote_id = COALESCE(?, remote_id),
                updated_at = ?
            WHERE id = ?
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(&draft.title_mr)
        .bind(&draft.title_en)
        .bind(&draft.description_mr)
        .bind(&draft.description_en)
        .bind(image.map(|i| i.image_url.as_str()))
        .bind(image.map(|i| i.remote_id.as_str()))
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&*self.db)
        .await
    }

    pub async fn delete(&self, id: Uuid) -> RegistryResult<u64> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        Ok(result.rows_affected())
    }

    /// Newest first.
    pub async fn list(&self, offset: i64, limit: i64) -> RegistryResult<Vec<Post>> {
        sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts ORDER BY created_at DESC LIMIT ? OFFSET ?"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&*self.db)
        .await
    }

    pub async fn count(&self) -> RegistryResult<u64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(&*self.db)
            .await?;
        Ok(total as u64)
    }
}
