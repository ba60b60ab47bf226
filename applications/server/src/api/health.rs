/// Health check API routes
use crate::state::AppState;
use axum::{extract::State, Json};
use juicebox_playback::Mode;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// `none` until the playback device has been brought in sync
    pub mode: Mode,
}

/// GET /api/health - Health check endpoint
pub async fn health(State(app_state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        mode: app_state.controller.mode().await,
    })
}
