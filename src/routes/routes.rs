//! Defines routes for the public newspaper API, the admin API and blob serving.
//!
//! ## Structure
//! - **Public editions**
//!   - `GET    /api/newspaper/today`
//!   - `GET    /api/newspaper/latest`
//!   - `GET    /api/newspaper/date/{date}`
//!   - `GET    /api/newspaper/month/{year_month}`
//!   - `GET    /api/newspaper/all?page=&limit=`
//!
//! - **Admin editions** (bearer token)
//!   - `POST   /api/admin/newspaper/upload`
//!   - `GET    /api/admin/newspaper/history?page=&limit=`
//!   - `DELETE /api/admin/newspaper/{id}`
//!   - `DELETE /api/admin/newspaper/date/{date}`
//!   - `GET    /api/admin/verify`
//!
//! - **Posts**
//!   - `GET    /api/news/latest?limit=`, `GET /api/news/{id}`
//!   - `GET    /api/admin/news/all`, `POST /api/admin/news/create`
//!   - `PUT    /api/admin/news/{id}`, `DELETE /api/admin/news/{id}`
//!
//! - **Blobs and health**
//!   - `GET    /files/{remote_id}` (local store only)
//!   - `GET    /healthz`, `GET /readyz`, `GET /api/health`

use crate::{
    handlers::{
        auth::verify,
        edition_handlers, file_handlers,
        health_handlers::{api_health, healthz, readyz},
        post_handlers,
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
};

/// Build the full router. `max_upload_bytes` caps every request body.
pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/api/health", get(api_health))
        // public editions
        .route("/api/newspaper/today", get(edition_handlers::today))
        .route("/api/newspaper/latest", get(edition_handlers::latest))
        .route("/api/newspaper/date/{date}", get(edition_handlers::by_date))
        .route(
            "/api/newspaper/month/{year_month}",
            get(edition_handlers::by_month),
        )
        .route("/api/newspaper/all", get(edition_handlers::list_all))
        // admin editions
        .route("/api/admin/verify", get(verify))
        .route(
            "/api/admin/newspaper/upload",
            post(edition_handlers::upload_edition),
        )
        .route(
            "/api/admin/newspaper/history",
            get(edition_handlers::history),
        )
        .route(
            "/api/admin/newspaper/date/{date}",
            delete(edition_handlers::delete_by_date),
        )
        .route(
            "/api/admin/newspaper/{id}",
            delete(edition_handlers::delete_by_id),
        )
        // posts
        .route("/api/news/latest", get(post_handlers::latest))
        .route("/api/news/{id}", get(post_handlers::get_post))
        .route("/api/admin/news/all", get(post_handlers::list_all))
        .route("/api/admin/news/create", post(post_handlers::create_post))
        .route(
            "/api/admin/news/{id}",
            put(post_handlers::update_post).delete(post_handlers::delete_post),
        )
        // blobs
        .route("/files/{remote_id}", get(file_handlers::get_file))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::test_pool,
        handlers::auth::{AdminKeys, token_for},
        store::{
            MockObjectStore, ObjectStore, ObjectStoreError, local::LocalObjectStore,
            memory::MemoryObjectStore,
        },
    };
    use axum_test::{
        TestServer,
        multipart::{MultipartForm, Part},
    };
    use axum::http::StatusCode;
    use serde_json::Value;
    use std::sync::Arc;

    const SECRET: &str = "router-test-secret";

    async fn server_with(
        store: Arc<dyn ObjectStore>,
        local_files: Option<Arc<LocalObjectStore>>,
    ) -> TestServer {
        let state = AppState::new(
            Arc::new(test_pool().await),
            store,
            AdminKeys::new(SECRET),
            local_files,
        );
        TestServer::builder()
            .build(routes(1024 * 1024).with_state(state))
    }

    async fn server() -> TestServer {
        server_with(Arc::new(MemoryObjectStore::new()), None).await
    }

    fn bearer() -> String {
        token_for(SECRET, "admin-1", None)
    }

    fn edition_form(date: &str, bytes: &'static [u8], mime: &str) -> MultipartForm {
        MultipartForm::new().add_text("date", date.to_string()).add_part(
            "file",
            Part::bytes(bytes).file_name("upload").mime_type(mime.to_string()),
        )
    }

    #[tokio::test]
    async fn upload_requires_a_token() {
        let server = server().await;
        let response = server
            .post("/api/admin/newspaper/upload")
            .multipart(edition_form("2025-03-01", b"%PDF", "application/pdf"))
            .await;
        response.assert_status_unauthorized();

        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["kind"], "unauthorized");
    }

    #[tokio::test]
    async fn replace_then_read_back_by_date() {
        let server = server().await;

        let first = server
            .post("/api/admin/newspaper/upload")
            .authorization_bearer(bearer())
            .multipart(edition_form("2025-03-01", b"%PDF", "application/pdf"))
            .await;
        first.assert_status_ok();
        let first: Value = first.json();
        assert_eq!(first["action"], "created");
        assert_eq!(first["cleanup"]["status"], "not_needed");

        let second = server
            .post("/api/admin/newspaper/upload")
            .authorization_bearer(bearer())
            .multipart(edition_form("2025-03-01", b"jpeg", "image/jpeg"))
            .await;
        second.assert_status_ok();
        let second: Value = second.json();
        assert_eq!(second["action"], "replaced");
        assert_eq!(second["cleanup"]["status"], "deleted");
        assert_eq!(second["data"]["id"], first["data"]["id"]);

        let read: Value = server.get("/api/newspaper/date/2025-03-01").await.json();
        assert_eq!(read["data"]["mediaType"], "jpeg");
        assert_eq!(read["data"]["publishedBy"], "admin-1");
        assert_eq!(read["data"]["remoteId"], second["data"]["remoteId"]);
    }

    #[tokio::test]
    async fn unknown_date_is_404_and_bad_date_is_400() {
        let server = server().await;

        let missing = server.get("/api/newspaper/date/2099-01-01").await;
        missing.assert_status_not_found();
        assert_eq!(missing.json::<Value>()["error"]["kind"], "not_found");

        let malformed = server.get("/api/newspaper/date/2024-13-40").await;
        malformed.assert_status_bad_request();
        assert_eq!(malformed.json::<Value>()["error"]["kind"], "validation");
    }

    #[tokio::test]
    async fn upload_without_file_is_rejected() {
        let server = server().await;
        let response = server
            .post("/api/admin/newspaper/upload")
            .authorization_bearer(bearer())
            .multipart(MultipartForm::new().add_text("date", "2025-03-01"))
            .await;
        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn month_and_archive_envelopes() {
        let server = server().await;
        for date in ["2025-03-01", "2025-03-15", "2025-02-28"] {
            server
                .post("/api/admin/newspaper/upload")
                .authorization_bearer(bearer())
                .multipart(edition_form(date, b"png", "image/png"))
                .await
                .assert_status_ok();
        }

        let month: Value = server.get("/api/newspaper/month/2025-03").await.json();
        assert_eq!(month["count"], 2);
        assert_eq!(month["data"][0]["date"], "2025-03-15");
        assert_eq!(month["data"][1]["date"], "2025-03-01");

        let archive: Value = server
            .get("/api/newspaper/all")
            .add_query_param("page", 2)
            .add_query_param("limit", 2)
            .await
            .json();
        assert_eq!(archive["pagination"]["total"], 3);
        assert_eq!(archive["pagination"]["pages"], 2);
        assert_eq!(archive["data"][0]["date"], "2025-02-28");
    }

    #[tokio::test]
    async fn delete_by_date_removes_the_edition() {
        let server = server().await;
        server
            .post("/api/admin/newspaper/upload")
            .authorization_bearer(bearer())
            .multipart(edition_form("2025-03-01", b"%PDF", "application/pdf"))
            .await
            .assert_status_ok();

        server
            .delete("/api/admin/newspaper/date/2025-03-01")
            .authorization_bearer(bearer())
            .await
            .assert_status_ok();
        server
            .get("/api/newspaper/date/2025-03-01")
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn posts_round_trip_through_the_api() {
        let server = server().await;
        let form = MultipartForm::new()
            .add_text("title_mr", "पूर")
            .add_text("title_en", "Flood")
            .add_text("description_mr", "वर्णन")
            .add_text("description_en", "Details")
            .add_part(
                "image",
                Part::bytes(&b"png"[..]).file_name("a.png").mime_type("image/png"),
            );
        let created: Value = server
            .post("/api/admin/news/create")
            .authorization_bearer(bearer())
            .multipart(form)
            .await
            .json();
        let id = created["data"]["id"].as_str().unwrap().to_string();

        let latest: Value = server.get("/api/news/latest").await.json();
        assert_eq!(latest["count"], 1);
        assert_eq!(latest["data"][0]["title_en"], "Flood");

        server
            .delete(&format!("/api/admin/news/{id}"))
            .authorization_bearer(bearer())
            .await
            .assert_status_ok();
        server
            .get(&format!("/api/news/{id}"))
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn local_blobs_are_served_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let local = Arc::new(LocalObjectStore::new(dir.path(), "http://localhost"));
        let server = server_with(local.clone(), Some(local)).await;

        let published: Value = server
            .post("/api/admin/newspaper/upload")
            .authorization_bearer(bearer())
            .multipart(edition_form("2025-03-01", b"%PDF-1.7", "application/pdf"))
            .await
            .json();
        let remote_id = published["data"]["remoteId"].as_str().unwrap().to_string();

        let file = server
            .get(&format!("/files/{remote_id}"))
            .add_query_param("download", 1)
            .await;
        file.assert_status_ok();
        assert_eq!(&file.as_bytes()[..], b"%PDF-1.7");
        assert_eq!(file.header("content-type"), "application/pdf");
        assert!(
            file.header("content-disposition")
                .to_str()
                .unwrap()
                .starts_with("attachment")
        );

        server
            .get("/files/not-a-blob.pdf")
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn health_and_readiness() {
        let server = server().await;
        server.get("/healthz").await.assert_status_ok();

        let health: Value = server.get("/api/health").await.json();
        assert_eq!(health["status"], "ok");
        assert!(health["timestamp"].is_string());

        let ready = server.get("/readyz").await;
        ready.assert_status_ok();
        let ready: Value = ready.json();
        assert_eq!(ready["checks"]["sqlite"]["ok"], true);
        assert_eq!(ready["checks"]["store"]["ok"], true);
    }

    #[tokio::test]
    async fn verify_echoes_the_identity() {
        let server = server().await;
        let body: Value = server
            .get("/api/admin/verify")
            .authorization_bearer(bearer())
            .await
            .json();
        assert_eq!(body["admin"]["adminId"], "admin-1");

        server
            .get("/api/admin/verify")
            .authorization_bearer("garbage")
            .await
            .assert_status_unauthorized();
    }

    #[tokio::test]
    async fn readiness_failure_keeps_store_details_out_of_the_body() {
        let mut store = MockObjectStore::new();
        store.expect_probe().returning(|| {
            Err(ObjectStoreError::Auth(
                "400 Bad Request: invalid_grant, token revoked".into(),
            ))
        });
        let server = server_with(Arc::new(store), None).await;

        let ready = server.get("/readyz").await;
        ready.assert_status(StatusCode::SERVICE_UNAVAILABLE);
        let body = ready.text();
        assert!(!body.contains("invalid_grant"));

        let ready: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(ready["checks"]["store"]["ok"], false);
        assert_eq!(ready["checks"]["store"]["error"], "store unavailable");
        assert_eq!(ready["checks"]["sqlite"]["ok"], true);
    }

    #[tokio::test]
    async fn huge_page_numbers_are_rejected() {
        let server = server().await;
        let response = server
            .get("/api/newspaper/all")
            .add_query_param("page", u32::MAX)
            .add_query_param("limit", u32::MAX)
            .await;
        response.assert_status_bad_request();
        assert_eq!(response.json::<Value>()["error"]["kind"], "validation");
    }

    #[tokio::test]
    async fn malformed_query_and_ids_use_the_error_envelope() {
        let server = server().await;

        let bad_page = server
            .get("/api/newspaper/all")
            .add_query_param("page", "abc")
            .await;
        bad_page.assert_status_bad_request();
        let body: Value = bad_page.json();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["kind"], "validation");

        let bad_id = server.get("/api/news/not-a-uuid").await;
        bad_id.assert_status_bad_request();
        let body: Value = bad_id.json();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["kind"], "validation");
    }
}
