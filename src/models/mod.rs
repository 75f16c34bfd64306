//! Core data models for the edition desk.
//!
//! Editions and posts map to SQLite tables via `sqlx::FromRow` and serialize
//! as JSON via `serde`. Boundary value types live in `media` and `page`.

pub mod edition;
pub mod media;
pub mod page;
pub mod post;
