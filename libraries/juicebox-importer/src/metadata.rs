//! Tag extraction from audio files

use crate::{ImportError, Result};
use async_trait::async_trait;
use lofty::{Accessor, Probe, TaggedFileExt};
use std::path::{Path, PathBuf};

/// Tags the library cares about
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SongTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
}

impl SongTags {
    /// Artist and title, both trimmed and non-blank
    ///
    /// # Errors
    ///
    /// `ImportError::InsufficientMetadata` if either is missing or blank
    pub fn require(&self) -> Result<(String, String)> {
        let artist = non_blank(self.artist.as_deref());
        let title = non_blank(self.title.as_deref());

        match (artist, title) {
            (Some(artist), Some(title)) => Ok((artist, title)),
            (None, Some(_)) => Err(ImportError::InsufficientMetadata(
                "missing artist tag".to_string(),
            )),
            (Some(_), None) => Err(ImportError::InsufficientMetadata(
                "missing title tag".to_string(),
            )),
            (None, None) => Err(ImportError::InsufficientMetadata(
                "missing artist and title tags".to_string(),
            )),
        }
    }

    /// Album, or `None` when absent or blank
    pub fn album(&self) -> Option<String> {
        non_blank(self.album.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Reads tags from a file on disk
#[async_trait]
pub trait TagReader: Send + Sync {
    async fn read_tags(&self, path: &Path) -> Result<SongTags>;
}

/// [`TagReader`] backed by lofty
///
/// Parsing is blocking work and runs on the blocking thread pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoftyTagReader;

#[async_trait]
impl TagReader for LoftyTagReader {
    async fn read_tags(&self, path: &Path) -> Result<SongTags> {
        let path: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || extract_tags(&path))
            .await
            .map_err(|e| ImportError::Metadata(format!("Tag reader task failed: {}", e)))?
    }
}

/// Extract artist, title and album from an audio file
pub fn extract_tags(path: &Path) -> Result<SongTags> {
    let tagged_file = Probe::open(path)
        .map_err(|e| ImportError::Metadata(format!("Failed to open file: {}", e)))?
        .read()
        .map_err(|e| ImportError::Metadata(format!("Failed to read file: {}", e)))?;

    // Prefer the format's native tag (ID3v2 for MP3, Vorbis comments for OGG/FLAC)
    let Some(tag) = tagged_file.primary_tag().or(tagged_file.first_tag()) else {
        return Ok(SongTags::default());
    };

    Ok(SongTags {
        title: tag.title().map(|s| s.to_string()),
        artist: tag.artist().map(|s| s.to_string()),
        album: tag.album().map(|s| s.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(artist: Option<&str>, title: Option<&str>) -> SongTags {
        SongTags {
            title: title.map(String::from),
            artist: artist.map(String::from),
            album: None,
        }
    }

    #[test]
    fn test_require_trims_values() {
        let (artist, title) = tags(Some(" Queen "), Some("Bohemian Rhapsody\n"))
            .require()
            .unwrap();
        assert_eq!(artist, "Queen");
        assert_eq!(title, "Bohemian Rhapsody");
    }

    #[test]
    fn test_require_rejects_missing_or_blank() {
        for t in [
            tags(None, Some("Title")),
            tags(Some("Artist"), None),
            tags(Some("   "), Some("Title")),
            tags(None, None),
        ] {
            assert!(matches!(
                t.require(),
                Err(ImportError::InsufficientMetadata(_))
            ));
        }
    }

    #[test]
    fn test_blank_album_is_absent() {
        let t = SongTags {
            album: Some("  ".to_string()),
            ..tags(Some("A"), Some("B"))
        };
        assert_eq!(t.album(), None);
    }
}
