//! Playback controller: the mode state machine over one shared device

use crate::device::{DeviceConnector, MediaQueueDevice};
use crate::error::{PlaybackError, Result};
use crate::types::{Mode, PlayerAction, PlayerStatus, QueueFlag, TrackDescriptor};
use futures_util::future::{BoxFuture, FutureExt};
use juicebox_core::{JuiceboxError, LibraryReader, MediaRoot, PlaylistId, QueueRef, SongId};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Flags applied when entering RANDOM
const RANDOM_FLAGS: &[(QueueFlag, bool)] = &[
    (QueueFlag::Consume, false),
    (QueueFlag::Random, true),
    (QueueFlag::Repeat, true),
    (QueueFlag::Single, false),
];

/// Flags applied when entering QUEUE
const QUEUE_FLAGS: &[(QueueFlag, bool)] = &[
    (QueueFlag::Consume, true),
    (QueueFlag::Random, false),
    (QueueFlag::Repeat, false),
    (QueueFlag::Single, false),
];

/// Controller configuration
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Upper bound for one device round-trip
    pub timeout: Duration,

    /// Pause before the single reconnect attempt
    pub reconnect_backoff: Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            reconnect_backoff: Duration::from_millis(250),
        }
    }
}

/// Process-wide playback session
struct Session {
    mode: Mode,
    device: Option<Box<dyn MediaQueueDevice>>,
}

/// Owns the playback session
///
/// Mode and device connection sit behind one async mutex, held for the whole
/// device round-trip of every operation, so concurrent callers never interleave
/// commands on the shared queue.
///
/// Mode is only written by mode switches. A switch first records [`Mode::None`] and
/// records the target only after all device traffic succeeded, so a failed or
/// cancelled switch reads as "not in sync" instead of claiming the target.
pub struct PlaybackController {
    connector: Arc<dyn DeviceConnector>,
    library: Arc<dyn LibraryReader>,
    media_root: MediaRoot,
    config: PlaybackConfig,
    session: Mutex<Session>,
}

impl PlaybackController {
    pub fn new(
        connector: Arc<dyn DeviceConnector>,
        library: Arc<dyn LibraryReader>,
        media_root: MediaRoot,
        config: PlaybackConfig,
    ) -> Self {
        Self {
            connector,
            library,
            media_root,
            config,
            session: Mutex::new(Session {
                mode: Mode::None,
                device: None,
            }),
        }
    }

    /// Connect to the device and start in RANDOM
    pub async fn initialize(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        session.device = Some(self.connector.connect().await?);
        self.apply_mode(&mut session, Mode::Random).await
    }

    /// Current mode
    pub async fn mode(&self) -> Mode {
        self.session.lock().await.mode
    }

    /// Switch mode, reapplying flags and queue contents even if already in `target`
    pub async fn switch_mode(&self, target: Mode) -> Result<()> {
        let mut session = self.session.lock().await;
        self.apply_mode(&mut session, target).await
    }

    /// Queue one song, leaving RANDOM (or an unknown state) for QUEUE first
    pub async fn add_song(&self, song_id: SongId) -> Result<()> {
        let song = self
            .library
            .get_song(song_id)
            .await?
            .ok_or_else(|| JuiceboxError::not_found("Song", song_id))?;
        let uri = self.media_root.queue_ref(&song.location);

        let mut session = self.session.lock().await;
        self.promote_to_queue(&mut session).await?;

        tracing::info!(song_id, uri = %uri, "Queueing song");
        self.append(&mut session, Arc::from(vec![uri])).await
    }

    /// Queue a playlist's songs in position order
    pub async fn add_playlist(&self, playlist_id: PlaylistId) -> Result<()> {
        let uris: Arc<[QueueRef]> = self
            .library
            .playlist_songs(playlist_id)
            .await?
            .iter()
            .map(|song| self.media_root.queue_ref(&song.location))
            .collect();

        let mut session = self.session.lock().await;
        self.promote_to_queue(&mut session).await?;

        tracing::info!(playlist_id, songs = uris.len(), "Queueing playlist");
        self.append(&mut session, uris).await
    }

    /// Pass a transport action through to the device
    pub async fn transport(&self, action: PlayerAction) -> Result<()> {
        let mut session = self.session.lock().await;
        tracing::debug!(?action, "Transport action");
        self.with_device(&mut session, move |device| match action {
            PlayerAction::Play => device.play(),
            PlayerAction::Pause => device.pause(),
            PlayerAction::Stop => device.stop(),
            PlayerAction::Previous => device.previous(),
            PlayerAction::Next => device.next(),
        })
        .await
    }

    /// Seek within the current track
    pub async fn seek(&self, position: Duration) -> Result<()> {
        let mut session = self.session.lock().await;
        self.with_device(&mut session, move |device| device.seek(position))
            .await
    }

    /// Device state, current track, matching library song and queue snapshot
    ///
    /// Read-only: never changes the mode.
    pub async fn status(&self) -> Result<PlayerStatus> {
        let mut session = self.session.lock().await;

        let (device, current, queue) = self
            .with_device(&mut session, |device| {
                async move {
                    let status = device.status().await?;
                    let current = device.current_track().await?;
                    let queue = device.queue().await?;
                    Ok::<_, PlaybackError>((status, current, queue))
                }
                .boxed()
            })
            .await?;

        let title = current.as_ref().and_then(|track| track.title.as_deref());
        let song = match title {
            Some(title) => match self.library.find_song_by_title(title).await {
                Ok(song) => song,
                Err(e) => {
                    tracing::warn!(title, error = %e, "Library lookup for current track failed");
                    None
                }
            },
            None => None,
        };

        Ok(PlayerStatus {
            mode: session.mode,
            device,
            current,
            song,
            queue,
        })
    }

    /// Append to the device queue
    ///
    /// Adding is not idempotent: a reply lost after the daemon applied the adds
    /// must not queue them twice. The retry after a reconnect therefore only adds
    /// what the queue does not already end with.
    async fn append(&self, session: &mut Session, uris: Arc<[QueueRef]>) -> Result<()> {
        self.run_on_device(
            session,
            |device| {
                let uris = Arc::clone(&uris);
                async move { device.add_all(&uris).await }.boxed()
            },
            |device| {
                let uris = Arc::clone(&uris);
                async move { add_missing(device, &uris).await }.boxed()
            },
        )
        .await
    }

    async fn promote_to_queue(&self, session: &mut Session) -> Result<()> {
        if matches!(session.mode, Mode::Random | Mode::None) {
            tracing::info!(from = %session.mode, "Promoting to queue mode");
            self.apply_mode(session, Mode::Queue).await?;
        }
        Ok(())
    }

    async fn apply_mode(&self, session: &mut Session, target: Mode) -> Result<()> {
        let (flags, uris): (&'static [(QueueFlag, bool)], Arc<[QueueRef]>) = match target {
            Mode::None => {
                session.mode = Mode::None;
                tracing::info!("Playback mode set to none");
                return Ok(());
            }
            Mode::Queue => (QUEUE_FLAGS, Arc::from(Vec::new())),
            Mode::Random => {
                let songs = self.library.all_songs().await?;
                let uris: Arc<[QueueRef]> = songs
                    .iter()
                    .map(|song| self.media_root.queue_ref(&song.location))
                    .collect();
                (RANDOM_FLAGS, uris)
            }
        };

        session.mode = Mode::None;

        let result = self
            .with_device(session, move |device| {
                let uris = Arc::clone(&uris);
                async move {
                    for &(flag, on) in flags {
                        device.set_flag(flag, on).await?;
                    }
                    device.clear().await?;
                    device.add_all(&uris).await
                }
                .boxed()
            })
            .await;

        match result {
            Ok(()) => {
                session.mode = target;
                tracing::info!(mode = %target, "Playback mode switched");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(mode = %target, error = %e, "Mode switch failed, mode is now none");
                Err(e)
            }
        }
    }

    /// Run an idempotent `op` against the device, reconnecting at most once
    async fn with_device<T, F>(&self, session: &mut Session, op: F) -> Result<T>
    where
        F: for<'d> Fn(&'d mut (dyn MediaQueueDevice + 'static)) -> BoxFuture<'d, Result<T>>,
    {
        self.run_on_device(session, &op, &op).await
    }

    /// Run `op` against the device, reconnecting at most once
    ///
    /// Every attempt is bounded by the configured timeout. A connection failure
    /// drops the device, waits for the backoff, reconnects and runs `resume` once.
    /// `resume` must cope with `op` having been applied before the failure. When
    /// there was no connection to begin with, `op` itself runs after connecting.
    /// Any other error is returned unchanged.
    async fn run_on_device<T, F, R>(&self, session: &mut Session, op: F, resume: R) -> Result<T>
    where
        F: for<'d> Fn(&'d mut (dyn MediaQueueDevice + 'static)) -> BoxFuture<'d, Result<T>>,
        R: for<'d> Fn(&'d mut (dyn MediaQueueDevice + 'static)) -> BoxFuture<'d, Result<T>>,
    {
        let interrupted = match session.device.as_mut() {
            Some(device) => match self.bounded(op(device.as_mut())).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_connection_failure() => {
                    tracing::warn!(error = %e, "Playback device connection lost, reconnecting");
                    true
                }
                Err(e) => return Err(e),
            },
            None => {
                tracing::debug!("No playback device connection, connecting");
                false
            }
        };

        session.device = None;
        if interrupted {
            tokio::time::sleep(self.config.reconnect_backoff).await;
        }

        let device = session
            .device
            .insert(self.bounded(self.connector.connect()).await?);
        let retry = if interrupted {
            resume(device.as_mut())
        } else {
            op(device.as_mut())
        };
        match self.bounded(retry).await {
            Err(e) if e.is_connection_failure() => {
                session.device = None;
                Err(e)
            }
            other => other,
        }
    }

    async fn bounded<T>(&self, attempt: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.config.timeout, attempt)
            .await
            .map_err(|_| PlaybackError::Timeout(self.config.timeout))?
    }
}

/// Add whatever part of `uris` the queue does not already end with
async fn add_missing(device: &mut (dyn MediaQueueDevice + 'static), uris: &[QueueRef]) -> Result<()> {
    let queue = device.queue().await?;
    let applied = already_queued(&queue, uris);
    if applied > 0 {
        tracing::info!(
            applied,
            total = uris.len(),
            "Skipping references queued before the connection dropped"
        );
    }
    device.add_all(&uris[applied..]).await
}

/// Length of the longest prefix of `uris` that ends the queue
fn already_queued(queue: &[TrackDescriptor], uris: &[QueueRef]) -> usize {
    (1..=uris.len().min(queue.len()))
        .rev()
        .find(|&k| {
            queue[queue.len() - k..]
                .iter()
                .zip(&uris[..k])
                .all(|(track, uri)| track.file == uri.as_str())
        })
        .unwrap_or(0)
}
