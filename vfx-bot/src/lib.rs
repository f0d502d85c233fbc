//! vfx-bot library - Telegram voice effects bot
//!
//! Receives voice/audio messages over the Telegram Bot API, offers a
//! paginated menu of ffmpeg effects and replies with the processed voice.
//! A small HTTP status page runs alongside the poller.

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use vfx_common::SessionStore;

pub mod api;
pub mod error;
pub mod handlers;
pub mod media;
pub mod poller;
pub mod presentation;
pub mod scratch;
pub mod telegram;
pub mod transport;

pub use error::{Error, Result};
pub use handlers::Bot;

/// State shared across status page handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    /// Catalog size
    pub effects: usize,
    pub page_size: usize,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(sessions: Arc<SessionStore>, effects: usize, page_size: usize) -> Self {
        Self {
            sessions,
            effects,
            page_size,
            startup_time: Utc::now(),
        }
    }
}

/// Build the status page router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;
    use tower_http::cors::CorsLayer;
    use tower_http::trace::TraceLayer;

    Router::new()
        .route("/", get(api::serve_index))
        .route("/status", get(api::get_status))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
