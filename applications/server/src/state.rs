/// Shared application state
use juicebox_importer::SongIngester;
use juicebox_playback::PlaybackController;
use juicebox_storage::LocalLibrary;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub library: Arc<LocalLibrary>,
    pub controller: Arc<PlaybackController>,
    pub ingester: Arc<SongIngester>,
}

impl AppState {
    pub fn new(
        library: Arc<LocalLibrary>,
        controller: Arc<PlaybackController>,
        ingester: Arc<SongIngester>,
    ) -> Self {
        Self {
            library,
            controller,
            ingester,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        self.library.pool()
    }
}
