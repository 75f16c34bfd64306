use anyhow::{Context, Result};
use axum::Router;
use std::{io::ErrorKind, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod db;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;
mod state;
mod store;

use config::{AppConfig, StoreBackend};
use handlers::auth::AdminKeys;
use state::AppState;
use store::{
    ObjectStore, TimedStore, drive::DriveObjectStore, local::LocalObjectStore,
    memory::MemoryObjectStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = AppConfig::from_env_and_args()?;

    tracing::info!("Starting edition-desk with config: {:?}", cfg);

    // --- Initialize SQLite connection ---
    let db = Arc::new(db::connect(&cfg.database_url).await?);

    // --- Handle migration mode ---
    if migrate {
        db::run_migrations(&db).await?;
        tracing::info!("Database migration complete.");
        return Ok(()); // exit after migration
    }

    // --- Initialize blob store ---
    let (backend, local_files) = build_store(&cfg)?;
    let store: Arc<dyn ObjectStore> = Arc::new(TimedStore::new(backend, cfg.remote_timeout));

    let state = AppState::new(db, store, AdminKeys::new(&cfg.jwt_secret), local_files);

    // --- Build router ---
    let app: Router = routes::routes::routes(cfg.max_upload_bytes).with_state(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Construct the configured backend. The local backend is also returned on
/// its own so `/files` can stream from it.
fn build_store(
    cfg: &AppConfig,
) -> Result<(Arc<dyn ObjectStore>, Option<Arc<LocalObjectStore>>)> {
    match cfg.store_backend {
        StoreBackend::Local => {
            std::fs::create_dir_all(&cfg.storage_dir)
                .with_context(|| format!("creating storage directory {}", cfg.storage_dir))?;
            let local = Arc::new(LocalObjectStore::new(
                &cfg.storage_dir,
                &cfg.public_base_url,
            ));
            let backend: Arc<dyn ObjectStore> = local.clone();
            Ok((backend, Some(local)))
        }
        StoreBackend::Drive => {
            let drive = cfg
                .drive
                .clone()
                .context("drive store selected without drive settings")?;
            let http = reqwest::Client::builder()
                .timeout(cfg.remote_timeout)
                .build()
                .context("building HTTP client")?;
            let backend: Arc<dyn ObjectStore> = Arc::new(DriveObjectStore::new(
                http,
                drive.credentials,
                drive.folder_id,
            ));
            Ok((backend, None))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; blobs are lost on restart");
            let backend: Arc<dyn ObjectStore> = Arc::new(MemoryObjectStore::new());
            Ok((backend, None))
        }
    }
}
