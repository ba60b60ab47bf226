//! Song types

use super::user::UserId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub type SongId = i64;

/// A song in the shared library
///
/// Created only by the ingestion pipeline. No two songs share `(artist, title)`
/// or `checksum`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub id: SongId,
    pub owner_id: UserId,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    /// Hex SHA-256 of the stored (normalized) audio bytes
    pub checksum: String,
    /// Canonical storage path
    pub location: PathBuf,
    pub cover_url: Option<String>,
    pub created_at: String,
}

/// Data for creating a new song
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSong {
    pub owner_id: UserId,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub checksum: String,
    pub location: PathBuf,
    pub cover_url: Option<String>,
}

/// Song listing row with the contributor's name denormalized
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SongSummary {
    pub id: SongId,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub owner_name: String,
}
