//! Read-only library capability consumed by the playback controller

use crate::error::Result;
use crate::types::{PlaylistId, Song, SongId};
use async_trait::async_trait;

/// Library view used to translate songs and playlists into queue references
///
/// Implemented by the SQLite store; tests provide in-memory fakes.
#[async_trait]
pub trait LibraryReader: Send + Sync {
    /// Every song in the library, in a stable order
    async fn all_songs(&self) -> Result<Vec<Song>>;

    /// Get song by ID
    async fn get_song(&self, id: SongId) -> Result<Option<Song>>;

    /// Songs of a playlist ordered by entry position
    ///
    /// Returns a `NotFound` error for an unknown playlist.
    async fn playlist_songs(&self, playlist_id: PlaylistId) -> Result<Vec<Song>>;

    /// First song whose title matches exactly
    async fn find_song_by_title(&self, title: &str) -> Result<Option<Song>>;
}
