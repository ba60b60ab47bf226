//! Device capability traits
//!
//! The controller never speaks a wire protocol itself. Anything that can hold a
//! sequential queue of references and play through it can sit behind these traits.

use crate::error::Result;
use crate::types::{DeviceStatus, QueueFlag, TrackDescriptor};
use async_trait::async_trait;
use juicebox_core::QueueRef;
use std::time::Duration;

/// An open connection to a sequential media-queue player
#[async_trait]
pub trait MediaQueueDevice: Send + Sync {
    async fn set_flag(&mut self, flag: QueueFlag, on: bool) -> Result<()>;

    /// Empty the queue
    async fn clear(&mut self) -> Result<()>;

    /// Append one reference to the queue
    async fn add(&mut self, uri: &QueueRef) -> Result<()>;

    /// Append references in order
    ///
    /// Implementations may batch; the default sends one `add` per reference.
    async fn add_all(&mut self, uris: &[QueueRef]) -> Result<()> {
        for uri in uris {
            self.add(uri).await?;
        }
        Ok(())
    }

    async fn status(&mut self) -> Result<DeviceStatus>;

    /// The track at the play head, `None` when nothing is loaded
    async fn current_track(&mut self) -> Result<Option<TrackDescriptor>>;

    /// The whole queue in play order
    async fn queue(&mut self) -> Result<Vec<TrackDescriptor>>;

    async fn play(&mut self) -> Result<()>;

    async fn pause(&mut self) -> Result<()>;

    async fn stop(&mut self) -> Result<()>;

    async fn previous(&mut self) -> Result<()>;

    async fn next(&mut self) -> Result<()>;

    /// Seek within the current track
    async fn seek(&mut self, position: Duration) -> Result<()>;
}

/// Opens device connections; used for the first connect and every reconnect
#[async_trait]
pub trait DeviceConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn MediaQueueDevice>>;
}
