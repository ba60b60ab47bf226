/// Server error types
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use juicebox_core::JuiceboxError;
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    /// Caller could not be identified
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Library(#[from] JuiceboxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<juicebox_storage::StorageError> for ServerError {
    fn from(err: juicebox_storage::StorageError) -> Self {
        ServerError::Library(err.into())
    }
}

impl From<juicebox_importer::ImportError> for ServerError {
    fn from(err: juicebox_importer::ImportError) -> Self {
        ServerError::Library(err.into())
    }
}

impl From<juicebox_playback::PlaybackError> for ServerError {
    fn from(err: juicebox_playback::PlaybackError) -> Self {
        ServerError::Library(err.into())
    }
}

impl ServerError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ServerError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ServerError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ServerError::Library(e) => match e {
                JuiceboxError::Validation(_) => (StatusCode::BAD_REQUEST, e.to_string()),
                JuiceboxError::NotFound { .. } => (StatusCode::NOT_FOUND, e.to_string()),
                JuiceboxError::Conflict(_) => (StatusCode::CONFLICT, e.to_string()),
                JuiceboxError::DeviceUnavailable(_) => {
                    tracing::warn!("Device unavailable: {}", e);
                    (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
                }
                JuiceboxError::State(_) => {
                    tracing::error!("Invariant violated: {}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal server error".to_string(),
                    )
                }
                JuiceboxError::Storage(_) | JuiceboxError::Io(_) => {
                    tracing::error!("Storage error: {:?}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Storage error".to_string(),
                    )
                }
            },
            ServerError::Config(msg) => {
                tracing::error!("Config error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Configuration error".to_string(),
                )
            }
            ServerError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ServerError::Io(e) => {
                tracing::error!("IO error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "IO error".to_string())
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, error_message) = self.status_and_message();

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
