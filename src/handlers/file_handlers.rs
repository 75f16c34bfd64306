//! Public blob serving for the on-disk store.
//! Streams the file body to avoid buffering whole editions in memory.

use crate::{errors::AppError, state::AppState, store::ObjectStoreError};
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use tracing::error;

#[derive(Debug, Deserialize)]
pub struct FileQuery {
    /// `?download=1` asks for an attachment instead of inline display.
    pub download: Option<u8>,
}

/// GET `/files/{remote_id}`
pub async fn get_file(
    State(state): State<AppState>,
    Path(remote_id): Path<String>,
    WithRejection(Query(query), _): WithRejection<Query<FileQuery>, AppError>,
) -> Result<Response, AppError> {
    let not_found = || AppError::not_found(format!("no file `{remote_id}`"));
    let Some(files) = state.local_files.as_ref() else {
        return Err(not_found());
    };

    let (file, len, media_type) = match files.open(&remote_id).await {
        Ok(Some(found)) => found,
        Ok(None) | Err(ObjectStoreError::InvalidRemoteId(_)) => return Err(not_found()),
        Err(err) => {
            error!(remote_id = %remote_id, error = %err, "failed to open stored blob");
            return Err(AppError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "remote_store",
                "operation failed",
            ));
        }
    };

    let mut response = Response::new(Body::from_stream(ReaderStream::new(file)));
    *response.status_mut() = StatusCode::OK;
    set_file_headers(
        response.headers_mut(),
        media_type.mime(),
        len,
        &remote_id,
        query.download == Some(1),
    );
    Ok(response)
}

fn set_file_headers(
    headers: &mut HeaderMap,
    content_type: &'static str,
    len: u64,
    remote_id: &str,
    attachment: bool,
) {
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));

    let disposition = if attachment { "attachment" } else { "inline" };
    // remote ids are validated as `<hex>.<ext>` before we get here
    if let Ok(value) = HeaderValue::from_str(&format!("{disposition}; filename=\"{remote_id}\"")) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
}
