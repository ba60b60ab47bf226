//! Core types for playback control

use crate::error::PlaybackError;
use juicebox_core::Song;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the shared queue is being driven
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Device state unknown or not yet established
    #[default]
    None,

    /// Explicit user-directed queue, consumed as it plays
    Queue,

    /// Whole library on shuffle and repeat
    Random,
}

impl FromStr for Mode {
    type Err = PlaybackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Mode::None),
            "queue" => Ok(Mode::Queue),
            "random" => Ok(Mode::Random),
            other => Err(PlaybackError::InvalidArgument(format!(
                "unknown mode: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::None => "none",
            Mode::Queue => "queue",
            Mode::Random => "random",
        })
    }
}

/// Transport actions that pass straight through to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerAction {
    Play,
    Pause,
    Stop,
    Previous,
    Next,
}

impl FromStr for PlayerAction {
    type Err = PlaybackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "play" => Ok(PlayerAction::Play),
            "pause" => Ok(PlayerAction::Pause),
            "stop" => Ok(PlayerAction::Stop),
            "previous" | "prev" => Ok(PlayerAction::Previous),
            "next" => Ok(PlayerAction::Next),
            other => Err(PlaybackError::UnknownAction(other.to_string())),
        }
    }
}

/// Queue behaviour flags of the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueFlag {
    /// Remove songs from the queue once played
    Consume,
    Random,
    Repeat,
    /// Stop after the current song
    Single,
}

impl QueueFlag {
    /// Protocol command that sets this flag
    pub fn command(&self) -> &'static str {
        match self {
            QueueFlag::Consume => "consume",
            QueueFlag::Random => "random",
            QueueFlag::Repeat => "repeat",
            QueueFlag::Single => "single",
        }
    }
}

/// Playback state reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportState {
    Play,
    Pause,
    #[default]
    Stop,
}

/// Device-level status
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub state: TransportState,
    /// 0-100, `None` when the device has no mixer
    pub volume: Option<u32>,
    pub consume: bool,
    pub random: bool,
    pub repeat: bool,
    pub single: bool,
    pub queue_length: u32,
    /// 0-based queue position of the current song
    pub song_position: Option<u32>,
    /// Seconds into the current song
    pub elapsed: Option<f64>,
    /// Length of the current song in seconds
    pub duration: Option<f64>,
}

impl DeviceStatus {
    /// Whether a flag is currently set
    pub fn flag(&self, flag: QueueFlag) -> bool {
        match flag {
            QueueFlag::Consume => self.consume,
            QueueFlag::Random => self.random,
            QueueFlag::Repeat => self.repeat,
            QueueFlag::Single => self.single,
        }
    }
}

/// A track as the device describes it
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrackDescriptor {
    /// Queue reference the track was added with
    pub file: String,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    /// 0-based queue position
    pub position: Option<u32>,
    /// Device-assigned queue entry id
    pub id: Option<u32>,
    /// Seconds
    pub duration: Option<f64>,
}

/// Merged view returned by [`crate::PlaybackController::status`]
#[derive(Debug, Clone, Serialize)]
pub struct PlayerStatus {
    pub mode: Mode,
    pub device: DeviceStatus,
    pub current: Option<TrackDescriptor>,
    /// Library song matching the current track's title, if any
    pub song: Option<Song>,
    pub queue: Vec<TrackDescriptor>,
}
