//! Fakes for controller tests
//!
//! `FakeDaemon` is the shared daemon state; every `FakeDevice` handed out by
//! `FakeConnector` is a connection to it, so the queue survives reconnects just
//! like a real daemon's would.

#![allow(dead_code)]

use async_trait::async_trait;
use juicebox_core::{
    JuiceboxError, LibraryReader, PlaylistId, QueueRef, Song, SongId,
};
use juicebox_playback::{
    DeviceConnector, DeviceStatus, MediaQueueDevice, PlaybackError, QueueFlag, TrackDescriptor,
    TransportState,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct DaemonState {
    pub flags: HashMap<QueueFlag, bool>,
    pub queue: Vec<QueueRef>,
    pub transport: Option<TransportState>,
    pub seek: Option<Duration>,
    /// Titles the daemon reports for queued references
    pub titles: HashMap<String, String>,
    /// Commands received, in order
    pub log: Vec<String>,
    /// Successful connects
    pub connects: usize,
    /// Refuse new connections
    pub refuse_connections: bool,
    /// Fail this many upcoming commands with a dropped connection
    pub fail_commands: usize,
    /// Fail commands once this many more have succeeded
    pub fail_after: Option<usize>,
    /// Apply this many upcoming commands, then drop the connection before replying
    pub lose_replies: usize,
    /// Never answer this many upcoming commands
    pub stall_commands: usize,
}

#[derive(Debug, Clone, Default)]
pub struct FakeDaemon {
    pub state: Arc<Mutex<DaemonState>>,
}

impl FakeDaemon {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connector(&self) -> Arc<FakeConnector> {
        Arc::new(FakeConnector {
            daemon: self.clone(),
        })
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut DaemonState) -> R) -> R {
        f(&mut *self.state.lock().unwrap())
    }

    pub fn queue(&self) -> Vec<String> {
        self.with(|s| s.queue.iter().map(|r| r.as_str().to_string()).collect())
    }

    pub fn flag(&self, flag: QueueFlag) -> Option<bool> {
        self.with(|s| s.flags.get(&flag).copied())
    }

    pub fn connects(&self) -> usize {
        self.with(|s| s.connects)
    }

    pub fn log(&self) -> Vec<String> {
        self.with(|s| s.log.clone())
    }

    pub fn clear_log(&self) {
        self.with(|s| s.log.clear());
    }
}

pub struct FakeConnector {
    daemon: FakeDaemon,
}

#[async_trait]
impl DeviceConnector for FakeConnector {
    async fn connect(&self) -> Result<Box<dyn MediaQueueDevice>, PlaybackError> {
        let refused = self.daemon.with(|s| {
            if s.refuse_connections {
                true
            } else {
                s.connects += 1;
                false
            }
        });
        if refused {
            return Err(PlaybackError::Unavailable("connection refused".to_string()));
        }
        Ok(Box::new(FakeDevice {
            daemon: self.daemon.clone(),
            broken: false,
        }))
    }
}

pub struct FakeDevice {
    daemon: FakeDaemon,
    broken: bool,
}

impl FakeDevice {
    async fn run<T>(
        &mut self,
        command: String,
        f: impl FnOnce(&mut DaemonState) -> T + Send,
    ) -> Result<T, PlaybackError> {
        let stall = self.daemon.with(|s| {
            if s.stall_commands > 0 {
                s.stall_commands -= 1;
                true
            } else {
                false
            }
        });
        if stall {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        self.apply(command, f)
    }

    fn apply<T>(
        &mut self,
        command: String,
        f: impl FnOnce(&mut DaemonState) -> T,
    ) -> Result<T, PlaybackError> {
        if self.broken {
            return Err(PlaybackError::Unavailable("connection is broken".to_string()));
        }
        let mut state = self.daemon.state.lock().unwrap();

        let fail = if state.fail_commands > 0 {
            state.fail_commands -= 1;
            true
        } else {
            match state.fail_after {
                Some(0) => {
                    state.fail_after = None;
                    true
                }
                Some(n) => {
                    state.fail_after = Some(n - 1);
                    false
                }
                None => false,
            }
        };
        if fail {
            drop(state);
            self.broken = true;
            return Err(PlaybackError::Timeout(Duration::from_secs(10)));
        }

        state.log.push(command);
        let value = f(&mut *state);

        if state.lose_replies > 0 {
            state.lose_replies -= 1;
            drop(state);
            self.broken = true;
            return Err(PlaybackError::Timeout(Duration::from_secs(10)));
        }
        Ok(value)
    }

    fn descriptor(state: &DaemonState, pos: usize, uri: &QueueRef) -> TrackDescriptor {
        TrackDescriptor {
            file: uri.as_str().to_string(),
            title: state.titles.get(uri.as_str()).cloned(),
            position: Some(pos as u32),
            id: Some(pos as u32 + 1),
            ..TrackDescriptor::default()
        }
    }
}

#[async_trait]
impl MediaQueueDevice for FakeDevice {
    async fn set_flag(&mut self, flag: QueueFlag, on: bool) -> Result<(), PlaybackError> {
        self.run(format!("{} {}", flag.command(), on as u8), |s| {
            s.flags.insert(flag, on);
        })
        .await
    }

    async fn clear(&mut self) -> Result<(), PlaybackError> {
        self.run("clear".to_string(), |s| s.queue.clear()).await
    }

    async fn add(&mut self, uri: &QueueRef) -> Result<(), PlaybackError> {
        let uri = uri.clone();
        self.run(format!("add {}", uri), |s| s.queue.push(uri)).await
    }

    async fn status(&mut self) -> Result<DeviceStatus, PlaybackError> {
        self.run("status".to_string(), |s| DeviceStatus {
            state: s.transport.unwrap_or_default(),
            consume: s.flags.get(&QueueFlag::Consume).copied().unwrap_or(false),
            random: s.flags.get(&QueueFlag::Random).copied().unwrap_or(false),
            repeat: s.flags.get(&QueueFlag::Repeat).copied().unwrap_or(false),
            single: s.flags.get(&QueueFlag::Single).copied().unwrap_or(false),
            queue_length: s.queue.len() as u32,
            song_position: if s.queue.is_empty() { None } else { Some(0) },
            ..DeviceStatus::default()
        })
        .await
    }

    async fn current_track(&mut self) -> Result<Option<TrackDescriptor>, PlaybackError> {
        self.run("currentsong".to_string(), |s| {
            s.queue.first().map(|uri| FakeDevice::descriptor(s, 0, uri))
        })
        .await
    }

    async fn queue(&mut self) -> Result<Vec<TrackDescriptor>, PlaybackError> {
        self.run("playlistinfo".to_string(), |s| {
            s.queue
                .iter()
                .enumerate()
                .map(|(i, uri)| FakeDevice::descriptor(s, i, uri))
                .collect()
        })
        .await
    }

    async fn play(&mut self) -> Result<(), PlaybackError> {
        self.run("play".to_string(), |s| s.transport = Some(TransportState::Play))
            .await
    }

    async fn pause(&mut self) -> Result<(), PlaybackError> {
        self.run("pause".to_string(), |s| s.transport = Some(TransportState::Pause))
            .await
    }

    async fn stop(&mut self) -> Result<(), PlaybackError> {
        self.run("stop".to_string(), |s| s.transport = Some(TransportState::Stop))
            .await
    }

    async fn previous(&mut self) -> Result<(), PlaybackError> {
        self.run("previous".to_string(), |_| ()).await
    }

    async fn next(&mut self) -> Result<(), PlaybackError> {
        self.run("next".to_string(), |_| ()).await
    }

    async fn seek(&mut self, position: Duration) -> Result<(), PlaybackError> {
        self.run(format!("seekcur {}", position.as_secs_f64()), |s| {
            s.seek = Some(position)
        })
        .await
    }
}

/// In-memory library
#[derive(Default)]
pub struct FakeLibrary {
    songs: Mutex<Vec<Song>>,
    playlists: Mutex<HashMap<PlaylistId, Vec<SongId>>>,
}

impl FakeLibrary {
    /// Library whose songs live under `/music/<title>.mp3`, ids from 1
    pub fn with_titles(titles: &[&str]) -> Self {
        let library = Self::default();
        for title in titles {
            library.upload(title);
        }
        library
    }

    /// Add a song, returning its id
    pub fn upload(&self, title: &str) -> SongId {
        let mut songs = self.songs.lock().unwrap();
        let id = songs.len() as SongId + 1;
        songs.push(song(id, title));
        id
    }

    pub fn set_playlist(&self, playlist_id: PlaylistId, songs: Vec<SongId>) {
        self.playlists.lock().unwrap().insert(playlist_id, songs);
    }

    fn find(&self, pred: impl Fn(&Song) -> bool) -> Option<Song> {
        self.songs.lock().unwrap().iter().find(|s| pred(s)).cloned()
    }
}

pub fn song(id: SongId, title: &str) -> Song {
    Song {
        id,
        owner_id: 1,
        title: title.to_string(),
        artist: "Artist".to_string(),
        album: None,
        checksum: format!("checksum-{}", id),
        location: PathBuf::from(format!("/music/{}.mp3", title)),
        cover_url: None,
        created_at: "2024-03-01 00:00:00".to_string(),
    }
}

#[async_trait]
impl LibraryReader for FakeLibrary {
    async fn all_songs(&self) -> juicebox_core::Result<Vec<Song>> {
        Ok(self.songs.lock().unwrap().clone())
    }

    async fn get_song(&self, id: SongId) -> juicebox_core::Result<Option<Song>> {
        Ok(self.find(|s| s.id == id))
    }

    async fn playlist_songs(&self, playlist_id: PlaylistId) -> juicebox_core::Result<Vec<Song>> {
        let ids = self
            .playlists
            .lock()
            .unwrap()
            .get(&playlist_id)
            .cloned()
            .ok_or_else(|| JuiceboxError::not_found("Playlist", playlist_id))?;
        Ok(ids.iter().filter_map(|id| self.find(|s| s.id == *id)).collect())
    }

    async fn find_song_by_title(&self, title: &str) -> juicebox_core::Result<Option<Song>> {
        Ok(self.find(|s| s.title == title))
    }
}
