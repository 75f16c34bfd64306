//! Multipart form decoding shared by the edition and post upload handlers.

use crate::{errors::AppError, models::media::Upload};
use axum::extract::Multipart;
use std::collections::HashMap;

/// Text fields of a submitted form plus its single file part.
#[derive(Debug)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    pub upload: Upload,
}

impl UploadForm {
    /// Drain `multipart`, treating the part named `file_field` as the upload.
    ///
    /// An empty file part counts as no file. Unnamed parts are skipped.
    pub async fn read(mut multipart: Multipart, file_field: &str) -> Result<Self, AppError> {
        let mut fields = HashMap::new();
        let mut upload = Upload::Missing;

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if name == file_field {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let content = field.bytes().await?;
                if !content.is_empty() {
                    upload = Upload::file(content, content_type);
                }
            } else {
                fields.insert(name, field.text().await?);
            }
        }

        Ok(Self { fields, upload })
    }

    /// Text value of `name`, empty when the field was not sent.
    pub fn text(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }
}
