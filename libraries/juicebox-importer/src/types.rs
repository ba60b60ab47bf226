//! Common types for the importer

use crate::format::AudioFormat;
use crate::path_template::DEFAULT_TEMPLATE;
use juicebox_core::{Song, SongId};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Result of a successful ingestion call
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IngestOutcome {
    /// A new song was added to the library
    Created(Song),

    /// The upload matched a song already in the library; nothing was stored
    Duplicate { existing: Option<SongId> },
}

impl IngestOutcome {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, IngestOutcome::Duplicate { .. })
    }
}

/// Configuration for the ingestion pipeline
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Directory under which canonical song paths are created
    pub library_dir: PathBuf,

    /// Directory for in-flight uploads; should share a filesystem with `library_dir`
    pub scratch_dir: PathBuf,

    /// Accepted upload formats
    pub formats: Vec<AudioFormat>,

    /// Canonical path template, e.g. `{Contributor}/{Artist}/{Album}/{Title}`
    pub path_template: String,

    /// Run loudness normalization before checksumming
    pub normalize: bool,

    pub ffmpeg_path: PathBuf,

    /// Look up cover art on MusicBrainz / Cover Art Archive
    pub cover_art: bool,

    /// Upper bound for the whole cover art lookup
    pub cover_art_timeout: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            library_dir: PathBuf::from("./music"),
            scratch_dir: PathBuf::from("./music/.scratch"),
            formats: AudioFormat::defaults(),
            path_template: DEFAULT_TEMPLATE.to_string(),
            normalize: false,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            cover_art: false,
            cover_art_timeout: Duration::from_secs(5),
        }
    }
}
