//! Playlist types

use super::{song::SongId, user::UserId};
use serde::{Deserialize, Serialize};

pub type PlaylistId = i64;
pub type EntryId = i64;

/// Playlist owned by a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: PlaylistId,
    pub owner_id: UserId,
    pub title: String,
    pub is_public: bool,
    pub created_at: String,
}

/// Data for creating a new playlist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlaylist {
    pub owner_id: UserId,
    pub title: String,
    #[serde(default)]
    pub is_public: bool,
}

/// One song in a playlist
///
/// For a playlist with N entries the positions are exactly `1..=N`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    pub id: EntryId,
    pub playlist_id: PlaylistId,
    pub song_id: SongId,
    pub contributor_id: Option<UserId>,
    /// 1-based position
    pub position: i64,
}
