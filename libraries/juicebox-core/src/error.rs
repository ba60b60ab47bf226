/// Core error types for Juicebox
use thiserror::Error;

/// Result type alias using `JuiceboxError`
pub type Result<T> = std::result::Result<T, JuiceboxError>;

/// Core error type for Juicebox
///
/// `Validation`, `NotFound` and `Conflict` are expected outcomes of user requests.
/// `DeviceUnavailable` means the playback daemon could not be reached in time.
/// `State` is an invariant violation and always indicates a defect.
#[derive(Error, Debug)]
pub enum JuiceboxError {
    /// Bad input (unsupported extension, missing tags, duplicate playlist entry, ...)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Entity not found
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Duplicate song on ingestion
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Queue device unreachable or timed out
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Invariant violation
    #[error("Invariant violated: {0}")]
    State(String),

    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl JuiceboxError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a device unavailable error
    pub fn device_unavailable(msg: impl Into<String>) -> Self {
        Self::DeviceUnavailable(msg.into())
    }

    /// Create an invariant violation error
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Whether this is an expected outcome of a user request rather than a failure
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::NotFound { .. } | Self::Conflict(_)
        )
    }
}

#[cfg(feature = "sqlx-support")]
impl From<sqlx::Error> for JuiceboxError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.to_string())
    }
}
