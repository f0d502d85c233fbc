//! Liveness probe
//!
//! Cheap enough for a container health check: reads two counters and the
//! package version, nothing else.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub module: &'static str,
    pub version: &'static str,
    /// Effects the menu can offer
    pub effects: usize,
    /// Users seen since startup
    pub sessions: usize,
}

/// GET /health
///
/// Reports `degraded` when the effect catalog is empty.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: if state.effects > 0 { "ok" } else { "degraded" },
        module: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        effects: state.effects,
        sessions: state.sessions.len().await,
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
