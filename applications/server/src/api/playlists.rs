/// Playlists API routes
use crate::{
    error::{Result, ServerError},
    middleware::RemoteUser,
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use juicebox_core::{CreatePlaylist, Playlist, PlaylistEntry, PlaylistId, Song, SongId, User};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreatePlaylistRequest {
    pub title: String,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Deserialize)]
pub struct AddEntryRequest {
    pub song_id: SongId,
    /// 1-based; appends when absent
    #[serde(default)]
    pub position: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct MoveEntryRequest {
    pub position: i64,
}

#[derive(Debug, Serialize)]
pub struct PlaylistResponse {
    #[serde(flatten)]
    pub playlist: Playlist,
    pub songs: Vec<Song>,
}

#[derive(Debug, Serialize)]
pub struct AddEntryResponse {
    pub position: i64,
}

/// Fetch a playlist the caller may see; private playlists of others read as missing
async fn visible_playlist(
    app_state: &AppState,
    id: PlaylistId,
    user: &User,
) -> Result<Playlist> {
    match juicebox_storage::playlists::get_by_id(app_state.pool(), id).await? {
        Some(playlist) if playlist.is_public || playlist.owner_id == user.id => Ok(playlist),
        _ => Err(ServerError::NotFound("Playlist not found".to_string())),
    }
}

/// GET /api/playlists
/// Playlists owned by the caller plus every public one
pub async fn list_playlists(
    State(app_state): State<AppState>,
    user: RemoteUser,
) -> Result<Json<Vec<Playlist>>> {
    let playlists =
        juicebox_storage::playlists::get_visible(app_state.pool(), user.user().id).await?;
    Ok(Json(playlists))
}

/// POST /api/playlists
pub async fn create_playlist(
    State(app_state): State<AppState>,
    user: RemoteUser,
    Json(req): Json<CreatePlaylistRequest>,
) -> Result<(StatusCode, Json<Playlist>)> {
    let playlist = juicebox_storage::playlists::create(
        app_state.pool(),
        CreatePlaylist {
            owner_id: user.user().id,
            title: req.title,
            is_public: req.is_public,
        },
    )
    .await?;

    tracing::info!(playlist_id = playlist.id, owner = user.user().id, "Created playlist");
    Ok((StatusCode::CREATED, Json(playlist)))
}

/// GET /api/playlists/:id
/// Playlist details with its songs in position order
pub async fn get_playlist(
    Path(id): Path<PlaylistId>,
    State(app_state): State<AppState>,
    user: RemoteUser,
) -> Result<Json<PlaylistResponse>> {
    let playlist = visible_playlist(&app_state, id, user.user()).await?;
    let songs = juicebox_storage::playlists::get_songs(app_state.pool(), id).await?;

    Ok(Json(PlaylistResponse { playlist, songs }))
}

/// DELETE /api/playlists/:id
/// Owner only; entries go with the playlist
pub async fn delete_playlist(
    Path(id): Path<PlaylistId>,
    State(app_state): State<AppState>,
    user: RemoteUser,
) -> Result<StatusCode> {
    app_state.library.delete_playlist(id, user.user().id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/playlists/:id/entries
pub async fn get_entries(
    Path(id): Path<PlaylistId>,
    State(app_state): State<AppState>,
    user: RemoteUser,
) -> Result<Json<Vec<PlaylistEntry>>> {
    visible_playlist(&app_state, id, user.user()).await?;
    let entries = app_state.library.get_entries(id).await?;
    Ok(Json(entries))
}

/// POST /api/playlists/:id/entries
/// Add a song, recording the caller as contributor
pub async fn add_entry(
    Path(id): Path<PlaylistId>,
    State(app_state): State<AppState>,
    user: RemoteUser,
    Json(req): Json<AddEntryRequest>,
) -> Result<(StatusCode, Json<AddEntryResponse>)> {
    visible_playlist(&app_state, id, user.user()).await?;
    let position = app_state
        .library
        .add_entry(id, req.song_id, Some(user.user().id), req.position)
        .await?;

    Ok((StatusCode::CREATED, Json(AddEntryResponse { position })))
}

/// DELETE /api/playlists/:id/entries/:song_id
pub async fn remove_entry(
    Path((id, song_id)): Path<(PlaylistId, SongId)>,
    State(app_state): State<AppState>,
    user: RemoteUser,
) -> Result<StatusCode> {
    visible_playlist(&app_state, id, user.user()).await?;
    app_state.library.remove_entry(id, song_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/playlists/:id/entries/:song_id
/// Move a song to a new position
pub async fn move_entry(
    Path((id, song_id)): Path<(PlaylistId, SongId)>,
    State(app_state): State<AppState>,
    user: RemoteUser,
    Json(req): Json<MoveEntryRequest>,
) -> Result<Json<Vec<PlaylistEntry>>> {
    visible_playlist(&app_state, id, user.user()).await?;
    app_state.library.move_entry(id, song_id, req.position).await?;
    let entries = app_state.library.get_entries(id).await?;
    Ok(Json(entries))
}
