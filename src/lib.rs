//! Time2Use equipment lending server
//!
//! REST JSON API for browsing shared equipment, staging it in a cart and
//! moving borrow requests through review, return and confirmation.

use std::sync::Arc;

use sqlx::{Pool, Postgres};

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
    /// Used by the readiness check
    pub pool: Pool<Postgres>,
}
