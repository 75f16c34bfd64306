//! HTTP handlers. Each module maps one route family onto the services in
//! `AppState`; response envelopes are built here, never in the services.

pub mod auth;
pub mod edition_handlers;
pub mod file_handlers;
pub mod form;
pub mod health_handlers;
pub mod post_handlers;

use crate::models::page::Page;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// `?page=&limit=` query accepted by every paginated listing.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1)
    }

    pub fn limit_or(&self, default: u32) -> u32 {
        self.limit.unwrap_or(default)
    }
}

/// `{ success, data, pagination: { page, limit, total, pages } }`
pub fn paginated<T: Serialize>(page: Page<T>) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": page.items,
        "pagination": {
            "page": page.page,
            "limit": page.page_size,
            "total": page.total,
            "pages": page.pages,
        }
    }))
}
