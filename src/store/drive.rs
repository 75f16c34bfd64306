//! Google Drive v3 object store.
//!
//! Uses the OAuth refresh-token flow to obtain access tokens, uploads with a
//! `multipart/related` request into a configured folder, then grants
//! `anyone`/`reader` so the preview and download links work without sign-in.

use super::{ObjectStore, ObjectStoreError, StoredBlob};
use crate::models::media::MediaType;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{StatusCode, header};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::{sync::Mutex, time::Instant};
use tracing::{debug, warn};
use uuid::Uuid;

/// Where the adapter sends its OAuth and Drive calls.
#[derive(Clone, Debug)]
pub struct DriveEndpoints {
    pub token_url: String,
    pub upload_url: String,
    pub files_url: String,
}

impl Default for DriveEndpoints {
    fn default() -> Self {
        Self {
            token_url: "https://oauth2.googleapis.com/token".into(),
            upload_url: "https://www.googleapis.com/upload/drive/v3/files".into(),
            files_url: "https://www.googleapis.com/drive/v3/files".into(),
        }
    }
}

/// Tokens are refreshed this long before Google's stated expiry.
const TOKEN_SLACK: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct DriveCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for DriveCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveCredentials")
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

struct CachedToken {
    access_token: String,
    refresh_at: Instant,
}

pub struct DriveObjectStore {
    http: reqwest::Client,
    credentials: DriveCredentials,
    folder_id: String,
    endpoints: DriveEndpoints,
    token: Mutex<Option<CachedToken>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct DriveFile {
    id: String,
    name: String,
    /// Drive reports sizes as decimal strings.
    size: Option<String>,
}

impl DriveObjectStore {
    pub fn new(http: reqwest::Client, credentials: DriveCredentials, folder_id: String) -> Self {
        Self::with_endpoints(http, credentials, folder_id, DriveEndpoints::default())
    }

    pub fn with_endpoints(
        http: reqwest::Client,
        credentials: DriveCredentials,
        folder_id: String,
        endpoints: DriveEndpoints,
    ) -> Self {
        Self {
            http,
            credentials,
            folder_id,
            endpoints,
            token: Mutex::new(None),
        }
    }

    async fn access_token(&self) -> Result<String, ObjectStoreError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.access_token.clone());
            }
        }

        let response = self
            .http
            .post(&self.endpoints.token_url)
            .form(&[
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("refresh_token", self.credentials.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ObjectStoreError::Auth(failure_reason(response).await));
        }

        let body: TokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(body.expires_in).saturating_sub(TOKEN_SLACK);
        debug!(expires_in = body.expires_in, "refreshed drive access token");
        *cached = Some(CachedToken {
            access_token: body.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(body.access_token)
    }

    async fn grant_public_read(&self, token: &str, remote_id: &str) -> Result<(), ObjectStoreError> {
        let response = self
            .http
            .post(format!("{}/{remote_id}/permissions", self.endpoints.files_url))
            .bearer_auth(token)
            .json(&json!({ "role": "reader", "type": "anyone" }))
            .send()
            .await
            .map_err(|err| ObjectStoreError::Permission {
                remote_id: remote_id.to_string(),
                reason: err.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(ObjectStoreError::Permission {
                remote_id: remote_id.to_string(),
                reason: failure_reason(response).await,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for DriveObjectStore {
    async fn put(
        &self,
        content: Bytes,
        name: &str,
        media_type: MediaType,
    ) -> Result<StoredBlob, ObjectStoreError> {
        let token = self.access_token().await?;
        let boundary = format!("edition-desk-{}", Uuid::new_v4().simple());
        let metadata = json!({ "name": name, "parents": [self.folder_id] });
        let body = related_body(&boundary, &metadata, media_type.mime(), &content);

        let response = self
            .http
            .post(&self.endpoints.upload_url)
            .query(&[("uploadType", "multipart"), ("fields", "id,name,size")])
            .bearer_auth(&token)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .body(body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ObjectStoreError::Upload {
                name: name.to_string(),
                reason: failure_reason(response).await,
            });
        }
        let file: DriveFile = response.json().await?;

        // A put only succeeds once the file is publicly readable.
        if let Err(err) = self.grant_public_read(&token, &file.id).await {
            if let Err(cleanup) = self.delete(&file.id).await {
                warn!(remote_id = %file.id, error = %cleanup, "orphaned drive file after failed permission grant");
            }
            return Err(err);
        }

        let size_bytes = file
            .size
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(content.len() as i64);
        Ok(StoredBlob {
            remote_id: file.id,
            name: file.name,
            size_bytes,
        })
    }

    fn preview_url_for(&self, remote_id: &str) -> String {
        format!("https://drive.google.com/file/d/{remote_id}/preview")
    }

    fn download_url_for(&self, remote_id: &str) -> String {
        format!("https://drive.google.com/uc?export=download&id={remote_id}")
    }

    async fn delete(&self, remote_id: &str) -> Result<(), ObjectStoreError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .delete(format!("{}/{remote_id}", self.endpoints.files_url))
            .bearer_auth(&token)
            .send()
            .await?;
        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => {
                debug!(remote_id, "drive file already gone");
                Ok(())
            }
            _ => Err(ObjectStoreError::Delete {
                remote_id: remote_id.to_string(),
                reason: failure_reason(response).await,
            }),
        }
    }

    async fn probe(&self) -> Result<(), ObjectStoreError> {
        self.access_token().await.map(|_| ())
    }
}

/// Status line plus whatever body Google sent, for the server log.
async fn failure_reason(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    format!("{status}: {body}")
}

/// Build a Drive `multipart/related` upload body: JSON metadata, then media.
fn related_body(
    boundary: &str,
    metadata: &serde_json::Value,
    mime: &str,
    content: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(content.len() + 512);
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("--{boundary}\r\nContent-Type: {mime}\r\n\r\n").as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}
