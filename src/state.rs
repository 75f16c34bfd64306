//! Shared application state handed to every handler.

use crate::{
    handlers::auth::AdminKeys,
    services::{
        edition_registry::EditionRegistry, post_registry::PostRegistry,
        post_service::PostService, publish_service::PublishService,
        retrieval_service::RetrievalService,
    },
    store::{ObjectStore, local::LocalObjectStore},
};
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<SqlitePool>,
    pub store: Arc<dyn ObjectStore>,
    pub publisher: PublishService,
    pub retrieval: RetrievalService,
    pub posts: PostService,
    pub keys: AdminKeys,
    /// Set only when blobs live on this host and `/files` serves them.
    pub local_files: Option<Arc<LocalObjectStore>>,
}

impl AppState {
    pub fn new(
        db: Arc<SqlitePool>,
        store: Arc<dyn ObjectStore>,
        keys: AdminKeys,
        local_files: Option<Arc<LocalObjectStore>>,
    ) -> Self {
        let editions = EditionRegistry::new(db.clone());
        Self {
            publisher: PublishService::new(editions.clone(), store.clone()),
            retrieval: RetrievalService::new(editions),
            posts: PostService::new(PostRegistry::new(db.clone()), store.clone()),
            db,
            store,
            keys,
            local_files,
        }
    }
}
