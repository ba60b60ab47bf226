/// Library browsing API routes
use crate::{
    error::{Result, ServerError},
    state::AppState,
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use juicebox_core::{Song, SongId, SongSummary};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct SongsQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    100
}

#[derive(Debug, Serialize)]
pub struct SongsResponse {
    pub songs: Vec<SongSummary>,
    pub page: u32,
    pub total: i64,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    25
}

/// GET /api/songs?page= - One page of the catalog
pub async fn list_songs(
    State(app_state): State<AppState>,
    Query(query): Query<SongsQuery>,
) -> Result<Json<SongsResponse>> {
    let page = query.page.max(1);
    let songs = juicebox_storage::songs::list_page(app_state.pool(), page, query.per_page).await?;
    let total = juicebox_storage::songs::count(app_state.pool()).await?;

    Ok(Json(SongsResponse { songs, page, total }))
}

/// GET /api/songs/:id
pub async fn get_song(
    Path(id): Path<SongId>,
    State(app_state): State<AppState>,
) -> Result<Json<Song>> {
    let song = juicebox_storage::songs::get_by_id(app_state.pool(), id)
        .await?
        .ok_or_else(|| ServerError::NotFound("Song not found".to_string()))?;
    Ok(Json(song))
}

/// GET /api/search?query= - Substring match over title, album and artist
pub async fn search(
    State(app_state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Song>>> {
    if query.query.trim().is_empty() {
        return Err(ServerError::BadRequest("Empty search query".to_string()));
    }

    let songs = juicebox_storage::songs::search(app_state.pool(), &query.query, query.limit).await?;
    Ok(Json(songs))
}
