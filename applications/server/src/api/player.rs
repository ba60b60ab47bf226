/// Player API routes
///
/// Thin wrappers around the shared [`juicebox_playback::PlaybackController`].
use crate::{
    error::{Result, ServerError},
    state::AppState,
};
use axum::{
    extract::{Path, State},
    Json,
};
use juicebox_core::{PlaylistId, SongId};
use juicebox_playback::{Mode, PlayerAction, PlayerStatus};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct EnqueueRequest {
    #[serde(default)]
    pub song_id: Option<SongId>,
    #[serde(default)]
    pub playlist_id: Option<PlaylistId>,
}

#[derive(Debug, Deserialize)]
pub struct ModeRequest {
    pub mode: String,
}

#[derive(Debug, Deserialize)]
pub struct SeekRequest {
    /// Seconds from the start of the current track
    pub position: f64,
}

#[derive(Debug, Serialize)]
pub struct ModeResponse {
    pub mode: Mode,
}

/// POST /api/player/enqueue - Queue one song or a whole playlist
///
/// Leaves RANDOM mode for QUEUE first.
pub async fn enqueue(
    State(app_state): State<AppState>,
    Json(req): Json<EnqueueRequest>,
) -> Result<Json<ModeResponse>> {
    match (req.song_id, req.playlist_id) {
        (Some(song_id), None) => app_state.controller.add_song(song_id).await?,
        (None, Some(playlist_id)) => app_state.controller.add_playlist(playlist_id).await?,
        _ => {
            return Err(ServerError::BadRequest(
                "Expected exactly one of song_id or playlist_id".to_string(),
            ))
        }
    }

    Ok(Json(ModeResponse {
        mode: app_state.controller.mode().await,
    }))
}

/// POST /api/player/mode - Switch between `random` and `queue`
pub async fn switch_mode(
    State(app_state): State<AppState>,
    Json(req): Json<ModeRequest>,
) -> Result<Json<ModeResponse>> {
    let target: Mode = req.mode.parse()?;
    app_state.controller.switch_mode(target).await?;

    Ok(Json(ModeResponse {
        mode: app_state.controller.mode().await,
    }))
}

/// POST /api/player/control/:action - play, pause, stop, prev, next
pub async fn control(
    Path(action): Path<String>,
    State(app_state): State<AppState>,
) -> Result<Json<PlayerStatus>> {
    let action: PlayerAction = action.parse()?;
    app_state.controller.transport(action).await?;

    let status = app_state.controller.status().await?;
    Ok(Json(status))
}

/// POST /api/player/seek
pub async fn seek(
    State(app_state): State<AppState>,
    Json(req): Json<SeekRequest>,
) -> Result<Json<PlayerStatus>> {
    let position = Duration::try_from_secs_f64(req.position).map_err(|_| {
        ServerError::BadRequest(format!("Invalid seek position: {}", req.position))
    })?;

    app_state.controller.seek(position).await?;

    let status = app_state.controller.status().await?;
    Ok(Json(status))
}

/// GET /api/player/status - Mode, device state, current track and queue
pub async fn status(State(app_state): State<AppState>) -> Result<Json<PlayerStatus>> {
    let status = app_state.controller.status().await?;
    Ok(Json(status))
}
