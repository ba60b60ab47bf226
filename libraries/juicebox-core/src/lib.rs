//! Juicebox Core
//!
//! Domain types, capability traits, and error handling shared by every Juicebox crate.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Song`, `Playlist`, `PlaylistEntry`, `User`
//! - **Queue references**: `QueueRef` and `MediaRoot`, the bridge between a song's
//!   canonical storage path and something the playback daemon can resolve
//! - **Capabilities**: `LibraryReader`, the read-only view of the library consumed
//!   by the playback controller
//! - **Error Handling**: Unified `JuiceboxError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use juicebox_core::MediaRoot;
//! use std::path::Path;
//!
//! let root = MediaRoot::new("/data/music");
//! let queue_ref = root.queue_ref(Path::new("/data/music/alice/Queen/Bohemian Rhapsody.mp3"));
//! assert_eq!(queue_ref.as_str(), "alice/Queen/Bohemian Rhapsody.mp3");
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod library;
pub mod types;

// Re-export commonly used types
pub use error::{JuiceboxError, Result};
pub use library::LibraryReader;
pub use types::{
    CreatePlaylist, CreateSong, EntryId, MediaRoot, Playlist, PlaylistEntry, PlaylistId, QueueRef,
    Song, SongId, SongSummary, User, UserId,
};
