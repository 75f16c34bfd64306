//! HTTP handlers for bilingual news posts.

use super::{PageQuery, auth::AdminIdentity, form::UploadForm, paginated};
use crate::{errors::AppError, models::post::PostDraft, state::AppState};
use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

pub const DEFAULT_ADMIN_LIMIT: u32 = 20;

#[derive(Debug, Deserialize)]
pub struct LatestQuery {
    pub limit: Option<u32>,
}

fn draft_of(form: &UploadForm) -> PostDraft {
    PostDraft {
        title_mr: form.text("title_mr"),
        title_en: form.text("title_en"),
        description_mr: form.text("description_mr"),
        description_en: form.text("description_en"),
    }
}

/// `GET /api/news/latest?limit=`
pub async fn latest(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<LatestQuery>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let posts = state.posts.latest(query.limit).await?;
    Ok(Json(json!({
        "success": true,
        "count": posts.len(),
        "data": posts,
    })))
}

/// `GET /api/news/{id}`
pub async fn get_post(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let post = state.posts.get(id).await?;
    Ok(Json(json!({ "success": true, "data": post })))
}

/// `GET /api/admin/news/all?page=&limit=`
pub async fn list_all(
    State(state): State<AppState>,
    _admin: AdminIdentity,
    WithRejection(Query(query), _): WithRejection<Query<PageQuery>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let page = state
        .posts
        .list(query.page(), query.limit_or(DEFAULT_ADMIN_LIMIT))
        .await?;
    Ok(paginated(page))
}

/// `POST /api/admin/news/create`
pub async fn create_post(
    State(state): State<AppState>,
    admin: AdminIdentity,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = UploadForm::read(multipart, "image").await?;
    let draft = draft_of(&form);
    let post = state
        .posts
        .create(draft, form.upload, &admin.admin_id)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "post created",
        "data": post,
    })))
}

/// `PUT /api/admin/news/{id}`
///
/// Same form as create; the `image` part is optional and, when present,
/// replaces the current image.
pub async fn update_post(
    State(state): State<AppState>,
    _admin: AdminIdentity,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = UploadForm::read(multipart, "image").await?;
    let draft = draft_of(&form);
    let outcome = state.posts.update(id, draft, form.upload).await?;
    Ok(Json(json!({
        "success": true,
        "message": "post updated",
        "data": outcome.post,
        "cleanup": outcome.cleanup,
    })))
}

/// `DELETE /api/admin/news/{id}`
pub async fn delete_post(
    State(state): State<AppState>,
    _admin: AdminIdentity,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let post = state.posts.delete(id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "post deleted",
        "data": post,
    })))
}
