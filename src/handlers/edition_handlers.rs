//! HTTP handlers for publishing, reading and removing newspaper editions.

use super::{PageQuery, auth::AdminIdentity, form::UploadForm, paginated};
use crate::{
    errors::AppError,
    services::publish_service::{PublishAction, PublishRequest},
    state::AppState,
};
use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use serde_json::json;
use uuid::Uuid;

pub const DEFAULT_ARCHIVE_LIMIT: u32 = 50;
pub const DEFAULT_HISTORY_LIMIT: u32 = 20;

/// `POST /api/admin/newspaper/upload`
///
/// Multipart form with a `date` field and a `file` part. Replaces any edition
/// already published for that date.
pub async fn upload_edition(
    State(state): State<AppState>,
    admin: AdminIdentity,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = UploadForm::read(multipart, "file").await?;
    let outcome = state
        .publisher
        .publish(PublishRequest {
            date: form.text("date"),
            upload: form.upload,
            actor: admin.admin_id,
        })
        .await?;

    let message = match outcome.action {
        PublishAction::Created => "edition published",
        PublishAction::Replaced if outcome.cleanup.is_failed() => {
            "edition replaced, previous file could not be removed"
        }
        PublishAction::Replaced => "edition replaced",
    };
    Ok(Json(json!({
        "success": true,
        "message": message,
        "action": outcome.action,
        "data": outcome.edition,
        "cleanup": outcome.cleanup,
    })))
}

/// `GET /api/newspaper/today`
pub async fn today(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let edition = state.retrieval.today().await?;
    Ok(Json(json!({ "success": true, "data": edition })))
}

/// `GET /api/newspaper/latest`
pub async fn latest(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let edition = state.retrieval.latest().await?;
    Ok(Json(json!({ "success": true, "data": edition })))
}

/// `GET /api/newspaper/date/{date}`
pub async fn by_date(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let edition = state.retrieval.by_date(&date).await?;
    Ok(Json(json!({ "success": true, "data": edition })))
}

/// `GET /api/newspaper/month/{yearMonth}`
pub async fn by_month(
    State(state): State<AppState>,
    Path(year_month): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let editions = state.retrieval.by_month(&year_month).await?;
    Ok(Json(json!({
        "success": true,
        "count": editions.len(),
        "data": editions,
    })))
}

/// `GET /api/newspaper/all?page=&limit=`
pub async fn list_all(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<PageQuery>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let page = state
        .retrieval
        .list_all(query.page(), query.limit_or(DEFAULT_ARCHIVE_LIMIT))
        .await?;
    Ok(paginated(page))
}

/// `GET /api/admin/newspaper/history?page=&limit=`
pub async fn history(
    State(state): State<AppState>,
    _admin: AdminIdentity,
    WithRejection(Query(query), _): WithRejection<Query<PageQuery>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let page = state
        .retrieval
        .history(query.page(), query.limit_or(DEFAULT_HISTORY_LIMIT))
        .await?;
    Ok(paginated(page))
}

/// `DELETE /api/admin/newspaper/{id}`
pub async fn delete_by_id(
    State(state): State<AppState>,
    admin: AdminIdentity,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let edition = state.publisher.delete_by_id(id).await?;
    tracing::info!(admin = %admin.admin_id, date = %edition.date, "edition removed");
    Ok(Json(json!({
        "success": true,
        "message": "edition deleted",
        "data": edition,
    })))
}

/// `DELETE /api/admin/newspaper/date/{date}`
pub async fn delete_by_date(
    State(state): State<AppState>,
    admin: AdminIdentity,
    Path(date): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let edition = state.publisher.delete_by_date(&date).await?;
    tracing::info!(admin = %admin.admin_id, date = %edition.date, "edition removed");
    Ok(Json(json!({
        "success": true,
        "message": "edition deleted",
        "data": edition,
    })))
}
