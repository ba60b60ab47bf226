use crate::{playlists, songs};
use async_trait::async_trait;
use juicebox_core::{
    error::Result, JuiceboxError, LibraryReader, PlaylistEntry, PlaylistId, Song, SongId, UserId,
};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;

/// One async lock per playlist
///
/// Editors of the same playlist queue behind each other; editors of different
/// playlists never touch the same lock.
#[derive(Debug, Default)]
pub struct PlaylistLocks {
    locks: Mutex<HashMap<PlaylistId, Arc<tokio::sync::Mutex<()>>>>,
}

impl PlaylistLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive edit access to a playlist
    pub async fn lock(&self, playlist_id: PlaylistId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(playlist_id).or_default())
        };
        lock.lock_owned().await
    }

    /// Drop the lock of a deleted or unknown playlist
    ///
    /// Kept while another editor still holds or waits for it.
    pub fn forget(&self, playlist_id: PlaylistId) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(&playlist_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&playlist_id);
        }
    }

    /// Number of playlists with a live lock
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `edit` under the playlist's lock, forgetting the lock if the playlist
    /// turns out not to exist
    async fn run<T, F>(&self, playlist_id: PlaylistId, edit: F) -> Result<T>
    where
        F: std::future::Future<Output = Result<T>>,
    {
        let guard = self.lock(playlist_id).await;
        let result = edit.await;
        drop(guard);

        if let Err(JuiceboxError::NotFound { entity, .. }) = &result {
            if entity == "Playlist" {
                self.forget(playlist_id);
            }
        }
        result
    }
}

/// Local library backed by `SQLite`
///
/// Owns the pool and the per-playlist edit locks. Playlist edits made through
/// this type are serialized per playlist before they reach the database.
pub struct LocalLibrary {
    pool: SqlitePool,
    locks: PlaylistLocks,
}

impl LocalLibrary {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            locks: PlaylistLocks::new(),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn locks(&self) -> &PlaylistLocks {
        &self.locks
    }

    /// Add a song to a playlist; see [`playlists::add_entry`]
    pub async fn add_entry(
        &self,
        playlist_id: PlaylistId,
        song_id: SongId,
        contributor_id: Option<UserId>,
        position: Option<i64>,
    ) -> Result<i64> {
        self.locks
            .run(
                playlist_id,
                playlists::add_entry(&self.pool, playlist_id, song_id, contributor_id, position),
            )
            .await
    }

    /// Remove a song from a playlist; see [`playlists::remove_entry`]
    pub async fn remove_entry(&self, playlist_id: PlaylistId, song_id: SongId) -> Result<()> {
        self.locks
            .run(
                playlist_id,
                playlists::remove_entry(&self.pool, playlist_id, song_id),
            )
            .await
    }

    /// Move a song within a playlist; see [`playlists::move_entry`]
    pub async fn move_entry(
        &self,
        playlist_id: PlaylistId,
        song_id: SongId,
        new_position: i64,
    ) -> Result<()> {
        self.locks
            .run(
                playlist_id,
                playlists::move_entry(&self.pool, playlist_id, song_id, new_position),
            )
            .await
    }

    pub async fn get_entries(&self, playlist_id: PlaylistId) -> Result<Vec<PlaylistEntry>> {
        playlists::get_entries(&self.pool, playlist_id).await
    }

    /// Delete a playlist owned by `user_id`
    pub async fn delete_playlist(&self, playlist_id: PlaylistId, user_id: UserId) -> Result<()> {
        self.locks
            .run(playlist_id, playlists::delete(&self.pool, playlist_id, user_id))
            .await?;
        self.locks.forget(playlist_id);
        Ok(())
    }
}

#[async_trait]
impl LibraryReader for LocalLibrary {
    async fn all_songs(&self) -> Result<Vec<Song>> {
        songs::get_all(&self.pool).await
    }

    async fn get_song(&self, id: SongId) -> Result<Option<Song>> {
        songs::get_by_id(&self.pool, id).await
    }

    async fn playlist_songs(&self, playlist_id: PlaylistId) -> Result<Vec<Song>> {
        playlists::get_songs(&self.pool, playlist_id).await
    }

    async fn find_song_by_title(&self, title: &str) -> Result<Option<Song>> {
        songs::find_by_title(&self.pool, title).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_playlist_lock_is_exclusive() {
        let locks = Arc::new(PlaylistLocks::new());
        let guard = locks.lock(1).await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _g = locks.lock(1).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn forget_keeps_a_lock_someone_waits_for() {
        let locks = Arc::new(PlaylistLocks::new());
        let guard = locks.lock(1).await;

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _g = locks.lock(1).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(guard);
        locks.forget(1);
        waiter.await.unwrap();
        assert_eq!(locks.len(), 1);

        locks.forget(1);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn different_playlists_do_not_contend() {
        let locks = PlaylistLocks::new();
        let _first = locks.lock(1).await;

        let second = tokio::time::timeout(Duration::from_millis(100), locks.lock(2)).await;
        assert!(second.is_ok());
    }
}
