//! Cover art lookup
//!
//! Cover art is decoration: the pipeline bounds every lookup with a timeout and
//! treats any failure as "no cover".

use crate::{ImportError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub const MUSICBRAINZ_URL: &str = "https://musicbrainz.org";
pub const COVER_ART_ARCHIVE_URL: &str = "https://coverartarchive.org";

/// Finds a cover image URL for a song
#[async_trait]
pub trait CoverArtProvider: Send + Sync {
    async fn lookup(&self, artist: &str, title: &str, album: Option<&str>)
        -> Result<Option<String>>;
}

/// Provider used when cover art is disabled
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCoverArt;

#[async_trait]
impl CoverArtProvider for NoCoverArt {
    async fn lookup(
        &self,
        _artist: &str,
        _title: &str,
        _album: Option<&str>,
    ) -> Result<Option<String>> {
        Ok(None)
    }
}

/// MusicBrainz recording search resolved to a Cover Art Archive front image
#[derive(Debug, Clone)]
pub struct MusicBrainzCoverArt {
    http: Client,
    musicbrainz_url: String,
    cover_art_url: String,
}

impl MusicBrainzCoverArt {
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_endpoints(timeout, MUSICBRAINZ_URL, COVER_ART_ARCHIVE_URL)
    }

    /// Point the provider at other endpoints (mirrors, test servers)
    pub fn with_endpoints(
        timeout: Duration,
        musicbrainz_url: impl Into<String>,
        cover_art_url: impl Into<String>,
    ) -> Result<Self> {
        // MusicBrainz rejects anonymous clients
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(format!(
                "Juicebox/{} ( https://github.com/juicebox-audio/juicebox )",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|e| ImportError::CoverArt(e.to_string()))?;

        Ok(Self {
            http,
            musicbrainz_url: musicbrainz_url.into().trim_end_matches('/').to_string(),
            cover_art_url: cover_art_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl CoverArtProvider for MusicBrainzCoverArt {
    async fn lookup(
        &self,
        artist: &str,
        title: &str,
        album: Option<&str>,
    ) -> Result<Option<String>> {
        let url = format!("{}/ws/2/recording", self.musicbrainz_url);
        let query = search_query(artist, title);

        tracing::debug!(url = %url, query = %query, "Searching MusicBrainz");

        let response = self
            .http
            .get(&url)
            .query(&[("query", query.as_str()), ("fmt", "json"), ("limit", "5")])
            .send()
            .await
            .map_err(|e| ImportError::CoverArt(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ImportError::CoverArt(format!(
                "MusicBrainz returned {}",
                response.status()
            )));
        }

        let body: RecordingSearch = response
            .json()
            .await
            .map_err(|e| ImportError::CoverArt(format!("Failed to parse response: {}", e)))?;

        Ok(pick_release(&body, album)
            .map(|release_id| format!("{}/release/{}/front-250", self.cover_art_url, release_id)))
    }
}

#[derive(Debug, Deserialize)]
struct RecordingSearch {
    #[serde(default)]
    recordings: Vec<Recording>,
}

#[derive(Debug, Deserialize)]
struct Recording {
    #[serde(default)]
    releases: Vec<Release>,
}

#[derive(Debug, Deserialize)]
struct Release {
    id: String,
    #[serde(default)]
    title: String,
}

/// Lucene query for a recording by artist and title
fn search_query(artist: &str, title: &str) -> String {
    format!(
        "recording:\"{}\" AND artist:\"{}\"",
        escape_phrase(title),
        escape_phrase(artist)
    )
}

fn escape_phrase(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Prefer a release whose title matches the album tag, else the first release
fn pick_release<'a>(search: &'a RecordingSearch, album: Option<&str>) -> Option<&'a str> {
    let releases = || search.recordings.iter().flat_map(|r| r.releases.iter());

    album
        .and_then(|album| {
            releases()
                .find(|r| r.title.eq_ignore_ascii_case(album))
                .map(|r| r.id.as_str())
        })
        .or_else(|| releases().next().map(|r| r.id.as_str()))
}
