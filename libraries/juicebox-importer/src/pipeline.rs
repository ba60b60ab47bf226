//! Ingestion orchestration

use crate::{
    checksum,
    cover::{CoverArtProvider, MusicBrainzCoverArt, NoCoverArt},
    format::AudioFormat,
    metadata::{LoftyTagReader, TagReader},
    normalize::{FfmpegNormalizer, Normalizer},
    path_template::{PathTemplate, TemplateValues},
    relocate::{self, ClaimedPath},
    scratch::ScratchFile,
    ImportError, IngestConfig, IngestOutcome, Result,
};
use juicebox_core::{CreateSong, JuiceboxError, User};
use juicebox_storage::songs;
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncRead;

/// Song ingestion pipeline
///
/// Holds no locks of its own: concurrent uploads of the same song race on the
/// store's UNIQUE constraints and the loser reports [`IngestOutcome::Duplicate`].
pub struct SongIngester {
    pool: SqlitePool,
    config: IngestConfig,
    template: PathTemplate,
    tags: Arc<dyn TagReader>,
    normalizer: Option<Arc<dyn Normalizer>>,
    cover_art: Arc<dyn CoverArtProvider>,
}

impl SongIngester {
    /// Create an ingester with the production collaborators the config asks for
    pub fn new(pool: SqlitePool, config: IngestConfig) -> Result<Self> {
        let normalizer: Option<Arc<dyn Normalizer>> = if config.normalize {
            Some(Arc::new(FfmpegNormalizer::new(config.ffmpeg_path.clone())))
        } else {
            None
        };
        let cover_art: Arc<dyn CoverArtProvider> = if config.cover_art {
            Arc::new(MusicBrainzCoverArt::new(config.cover_art_timeout)?)
        } else {
            Arc::new(NoCoverArt)
        };

        Ok(Self {
            pool,
            template: PathTemplate::new(config.path_template.clone()),
            config,
            tags: Arc::new(LoftyTagReader),
            normalizer,
            cover_art,
        })
    }

    pub fn with_tag_reader(mut self, tags: Arc<dyn TagReader>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_normalizer(mut self, normalizer: Option<Arc<dyn Normalizer>>) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_cover_art(mut self, cover_art: Arc<dyn CoverArtProvider>) -> Self {
        self.cover_art = cover_art;
        self
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Ingest an uploaded byte stream
    ///
    /// # Arguments
    ///
    /// * `reader` - The uploaded bytes
    /// * `filename` - Declared filename; only its extension is used
    /// * `contributor` - Uploading user, becomes the song's owner
    ///
    /// # Errors
    ///
    /// * `UnsupportedFormat` before anything touches the disk
    /// * `InsufficientMetadata` when artist or title tags are missing
    ///
    /// Duplicates are not errors; they return [`IngestOutcome::Duplicate`].
    pub async fn ingest<R>(
        &self,
        mut reader: R,
        filename: &str,
        contributor: &User,
    ) -> Result<IngestOutcome>
    where
        R: AsyncRead + Unpin + Send,
    {
        let format = self.accept(filename)?;

        let mut scratch =
            ScratchFile::write_from(&self.config.scratch_dir, format.extension(), &mut reader)
                .await?;

        let tags = self.tags.read_tags(scratch.path()).await?;
        let (artist, title) = tags.require()?;
        let album = tags.album();

        if let Some(normalizer) = &self.normalizer {
            let normalized = ScratchFile::reserve(&self.config.scratch_dir, format.extension());
            normalizer.normalize(scratch.path(), normalized.path()).await?;
            // Dropping the previous guard removes the raw upload
            scratch = normalized;
        }

        let checksum = checksum::file_checksum(scratch.path()).await?;

        if let Some(existing) = songs::find_duplicate(&self.pool, &artist, &title, &checksum).await? {
            tracing::info!(
                artist = %artist,
                title = %title,
                existing = existing.id,
                "Upload duplicates an existing song"
            );
            return Ok(IngestOutcome::Duplicate {
                existing: Some(existing.id),
            });
        }

        let relative = self.template.resolve(
            &TemplateValues {
                contributor: &contributor.username,
                artist: &artist,
                album: album.as_deref(),
                title: &title,
            },
            format.extension(),
        );
        let dest = ClaimedPath::claim(&self.config.library_dir.join(relative)).await?;

        let cover_url = self.lookup_cover(&artist, &title, album.as_deref()).await;

        let new_song = CreateSong {
            owner_id: contributor.id,
            title,
            artist,
            album,
            checksum,
            location: dest.path().to_path_buf(),
            cover_url,
        };

        self.finalize(scratch, dest, new_song).await
    }

    /// Ingest a file already on local disk (the source file is left in place)
    pub async fn ingest_path(&self, path: &Path, contributor: &User) -> Result<IngestOutcome> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                ImportError::UnsupportedFormat(format!("Invalid filename: {}", path.display()))
            })?;
        self.accept(filename)?;

        let file = tokio::fs::File::open(path).await?;
        self.ingest(file, filename, contributor).await
    }

    fn accept(&self, filename: &str) -> Result<AudioFormat> {
        AudioFormat::from_filename(filename)
            .filter(|format| self.config.formats.contains(format))
            .ok_or_else(|| ImportError::UnsupportedFormat(filename.to_string()))
    }

    async fn lookup_cover(&self, artist: &str, title: &str, album: Option<&str>) -> Option<String> {
        let lookup = self.cover_art.lookup(artist, title, album);
        match tokio::time::timeout(self.config.cover_art_timeout, lookup).await {
            Ok(Ok(url)) => url,
            Ok(Err(e)) => {
                tracing::warn!(artist, title, error = %e, "Cover art lookup failed");
                None
            }
            Err(_) => {
                tracing::warn!(artist, title, "Cover art lookup timed out");
                None
            }
        }
    }

    /// Insert the row, move the file onto its claimed path, then commit
    ///
    /// A failed move rolls the insert back; a lost insert race becomes a duplicate.
    /// Either way the claim is released.
    async fn finalize(
        &self,
        scratch: ScratchFile,
        dest: ClaimedPath,
        new_song: CreateSong,
    ) -> Result<IngestOutcome> {
        let mut tx = self.pool.begin().await?;

        let song = match songs::insert(&mut tx, &new_song).await {
            Ok(song) => song,
            Err(JuiceboxError::Conflict(reason)) => {
                drop(tx);
                tracing::info!(reason = %reason, "Lost insert race to a concurrent upload");
                let existing = songs::find_duplicate(
                    &self.pool,
                    &new_song.artist,
                    &new_song.title,
                    &new_song.checksum,
                )
                .await?;
                return Ok(IngestOutcome::Duplicate {
                    existing: existing.map(|s| s.id),
                });
            }
            Err(e) => return Err(e.into()),
        };

        relocate::move_file(scratch.path(), dest.path()).await?;
        scratch.disarm();

        tx.commit().await?;
        dest.keep();

        tracing::info!(
            song_id = song.id,
            artist = %song.artist,
            title = %song.title,
            location = %song.location.display(),
            "Ingested song"
        );
        Ok(IngestOutcome::Created(song))
    }
}
