//! Juicebox Song Ingestion
//!
//! Turns an uploaded byte stream into a deduplicated library song.
//!
//! # Pipeline
//!
//! 1. Format gate on the declared filename (no side effects on rejection)
//! 2. Stream into a UUID-named scratch file, removed on every early return
//! 3. Tag extraction (artist, title, album)
//! 4. Optional loudness normalization (ffmpeg `loudnorm`)
//! 5. SHA-256 content checksum of the bytes that will be stored
//! 6. Duplicate check on (artist, title) or checksum
//! 7. Canonical path from a template of sanitized segments
//! 8. Best-effort cover art lookup
//! 9. Finalize: insert row, move file, commit
//!
//! # Architecture
//!
//! - `format`: Supported audio formats
//! - `scratch`: Scratch file guard
//! - `metadata`: Tag extraction behind the [`TagReader`] trait
//! - `normalize`: Loudness normalization behind the [`Normalizer`] trait
//! - `checksum`: Content hashing
//! - `path_template`: Canonical library paths
//! - `cover`: Cover art lookup behind the [`CoverArtProvider`] trait
//! - `relocate`: Moving files into the library
//! - `pipeline`: Orchestration ([`SongIngester`])

mod error;
mod types;

pub mod checksum;
pub mod cover;
pub mod format;
pub mod metadata;
pub mod normalize;
pub mod path_template;
pub mod pipeline;
pub mod relocate;
pub mod scratch;

pub use cover::{CoverArtProvider, MusicBrainzCoverArt, NoCoverArt};
pub use error::ImportError;
pub use format::AudioFormat;
pub use metadata::{LoftyTagReader, SongTags, TagReader};
pub use normalize::{FfmpegNormalizer, Normalizer};
pub use path_template::PathTemplate;
pub use pipeline::SongIngester;
pub use types::*;

/// Re-export commonly used types
pub type Result<T> = std::result::Result<T, ImportError>;
