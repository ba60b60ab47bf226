//! Error types for playback control

use juicebox_core::JuiceboxError;
use std::time::Duration;
use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// No connection to the device
    #[error("Not connected to playback device")]
    NotConnected,

    /// Connecting failed or the connection dropped
    #[error("Playback device unavailable: {0}")]
    Unavailable(String),

    /// Device did not answer within the deadline
    #[error("Playback device timed out after {0:?}")]
    Timeout(Duration),

    /// Device answered something we could not parse
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Device refused a command
    #[error("Device rejected {command}: {message}")]
    Rejected { command: String, message: String },

    /// Argument cannot be sent to the device
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Transport action name not recognised
    #[error("Unknown player action: {0}")]
    UnknownAction(String),

    /// Library lookup failed
    #[error(transparent)]
    Library(#[from] JuiceboxError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlaybackError {
    /// Whether the connection is unusable and worth re-establishing
    pub fn is_connection_failure(&self) -> bool {
        matches!(
            self,
            PlaybackError::NotConnected
                | PlaybackError::Unavailable(_)
                | PlaybackError::Timeout(_)
                | PlaybackError::Protocol(_)
                | PlaybackError::Io(_)
        )
    }
}

impl From<PlaybackError> for JuiceboxError {
    fn from(err: PlaybackError) -> Self {
        match err {
            PlaybackError::Library(inner) => inner,
            PlaybackError::InvalidArgument(_) | PlaybackError::UnknownAction(_) => {
                JuiceboxError::validation(err.to_string())
            }
            other => JuiceboxError::device_unavailable(other.to_string()),
        }
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
