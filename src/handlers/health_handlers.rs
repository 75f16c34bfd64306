//! Health & readiness handlers.
//!
//! - GET /healthz     -> simple liveness ("ok")
//! - GET /api/health  -> liveness with a server timestamp
//! - GET /readyz      -> readiness that checks SQLite and the object store

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::error;

/// `GET /healthz`
///
/// Always returns 200 OK with a plain JSON body. Performs no I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
            timestamp: None,
        }),
    )
}

/// `GET /api/health`
pub async fn api_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".into(),
        timestamp: Some(Utc::now()),
    })
}

/// `GET /readyz`
///
/// Readiness probe that:
/// 1. Runs a lightweight query against SQLite (`SELECT 1`).
/// 2. Asks the object store backend to prove it can serve requests.
///
/// HTTP 200 when all checks pass, HTTP 503 when any check fails. Failure
/// details go to the log; callers only see which check failed.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let sqlite_check = match sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&*state.db)
        .await
    {
        Ok(1) => CheckStatus::ok(),
        Ok(v) => {
            error!(result = v, "readiness: unexpected SELECT 1 result");
            CheckStatus::failed("database unavailable")
        }
        Err(e) => {
            error!(error = %e, "readiness: sqlite check failed");
            CheckStatus::failed("database unavailable")
        }
    };

    let store_check = match state.store.probe().await {
        Ok(()) => CheckStatus::ok(),
        Err(e) => {
            error!(error = %e, "readiness: store probe failed");
            CheckStatus::failed("store unavailable")
        }
    };

    let overall_ok = sqlite_check.ok && store_check.ok;
    let checks = HashMap::from([("sqlite", sqlite_check), ("store", store_check)]);

    let body = ReadyResponse {
        status: if overall_ok { "ok" } else { "error" }.into(),
        checks,
    };

    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<&'static str>,
}

impl CheckStatus {
    fn ok() -> Self {
        Self {
            ok: true,
            error: None,
        }
    }

    fn failed(error: &'static str) -> Self {
        Self {
            ok: false,
            error: Some(error),
        }
    }
}
