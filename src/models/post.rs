//! Bilingual announcement posts, each carrying one image.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::media::InvalidInput;

#[derive(Serialize, Clone, FromRow, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,

    #[serde(rename = "title_mr")]
    pub title_mr: String,
    #[serde(rename = "title_en")]
    pub title_en: String,
    #[serde(rename = "description_mr")]
    pub description_mr: String,
    #[serde(rename = "description_en")]
    pub description_en: String,

    /// Preview URL of the attached image.
    pub image_url: String,

    /// Remote identifier of the attached image.
    pub remote_id: String,

    pub published_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Text content of a post as submitted by an administrator.
#[derive(Clone, Debug, Default)]
pub struct PostDraft {
    pub title_mr: String,
    pub title_en: String,
    pub description_mr: String,
    pub description_en: String,
}

impl PostDraft {
    /// Every text field is required in both languages.
    pub fn validate(&self) -> Result<(), InvalidInput> {
        let fields = [
            ("title_mr", &self.title_mr),
            ("title_en", &self.title_en),
            ("description_mr", &self.description_mr),
            ("description_en", &self.description_en),
        ];
        match fields.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((name, _)) => Err(InvalidInput::MissingField(*name)),
            None => Ok(()),
        }
    }
}

/// A freshly stored image ready to be recorded on a post.
#[derive(Clone, Debug)]
pub struct PostImage {
    pub remote_id: String,
    pub image_url: String,
}
