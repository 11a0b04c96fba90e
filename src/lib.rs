//! Book Library
//!
//! A catalog of books stored in SQLite. Books are staged in a [`Session`] and
//! validated as a batch when the session commits. A REST JSON API exposes the
//! catalog over HTTP.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use models::{Book, BookChange, YearPublished};
pub use repository::{Repository, Session};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
