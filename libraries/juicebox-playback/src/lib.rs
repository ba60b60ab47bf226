//! Juicebox - Playback Control
//!
//! Drives one shared, queue-based playback daemon (MPD) on behalf of every user.
//!
//! This crate provides:
//! - The playback mode state machine (`NONE`, `QUEUE`, `RANDOM`)
//! - Queue population from the library (whole library or single songs/playlists)
//! - Transport passthroughs (play, pause, stop, previous, next, seek)
//! - A merged status view of device, current track and library metadata
//! - An MPD device built on the `mpd` client crate
//!
//! # Architecture
//!
//! The controller talks to the daemon through the [`MediaQueueDevice`] trait and
//! reads the library through [`juicebox_core::LibraryReader`], so neither a
//! database nor a running daemon is needed to exercise it.
//!
//! Every device round-trip is bounded by a timeout. A connection failure causes at
//! most one reconnect (after a short backoff) and one retry; a second failure is
//! reported as unavailability.
//!
//! # Example
//!
//! ```rust,no_run
//! use juicebox_playback::{Mode, MpdConnector, PlaybackConfig, PlaybackController, PlayerAction};
//! # use juicebox_core::{LibraryReader, MediaRoot};
//! # use std::sync::Arc;
//! # async fn example(library: Arc<dyn LibraryReader>) -> Result<(), Box<dyn std::error::Error>> {
//! let config = PlaybackConfig::default();
//! let connector = MpdConnector::new("/run/mpd/socket".parse()?, config.timeout);
//! let controller = PlaybackController::new(
//!     Arc::new(connector),
//!     library,
//!     MediaRoot::new("/srv/music"),
//!     config,
//! );
//!
//! controller.initialize().await?; // starts in RANDOM
//! controller.add_song(42).await?; // promotes to QUEUE
//! controller.transport(PlayerAction::Next).await?;
//! assert_eq!(controller.mode().await, Mode::Queue);
//! # Ok(())
//! # }
//! ```

pub mod controller;
pub mod device;
pub mod error;
pub mod mpd_device;
pub mod types;

pub use controller::{PlaybackConfig, PlaybackController};
pub use device::{DeviceConnector, MediaQueueDevice};
pub use error::{PlaybackError, Result};
pub use mpd_device::{DeviceAddress, MpdConnector, MpdDevice};
pub use types::{
    DeviceStatus, Mode, PlayerAction, PlayerStatus, QueueFlag, TrackDescriptor, TransportState,
};
