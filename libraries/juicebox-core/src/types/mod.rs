mod playlist;
mod queue_ref;
mod song;
mod user;

pub use playlist::{CreatePlaylist, EntryId, Playlist, PlaylistEntry, PlaylistId};
pub use queue_ref::{MediaRoot, QueueRef};
pub use song::{CreateSong, Song, SongId, SongSummary};
pub use user::{User, UserId};
