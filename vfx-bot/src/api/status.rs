//! Runtime status endpoint

use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

/// Build identification captured by build.rs
#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub version: String,
    pub git_hash: String,
    pub build_timestamp: String,
    pub build_profile: String,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            git_hash: env!("GIT_HASH").to_string(),
            build_timestamp: env!("BUILD_TIMESTAMP").to_string(),
            build_profile: env!("BUILD_PROFILE").to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub uptime_seconds: i64,
    /// Users seen since startup
    pub sessions: usize,
    pub effects: usize,
    pub page_size: usize,
    pub build: BuildInfo,
}

/// GET /status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);

    Json(StatusResponse {
        uptime_seconds: uptime.num_seconds().max(0),
        sessions: state.sessions.len().await,
        effects: state.effects,
        page_size: state.page_size,
        build: BuildInfo::current(),
    })
}
