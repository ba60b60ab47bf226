//! Error types for the importer

use juicebox_core::JuiceboxError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Library(#[from] JuiceboxError),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Insufficient metadata: {0}")]
    InsufficientMetadata(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Normalization failed: {0}")]
    Normalization(String),

    #[error("Cover art lookup failed: {0}")]
    CoverArt(String),
}

impl From<ImportError> for JuiceboxError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Library(inner) => inner,
            ImportError::Io(e) => JuiceboxError::Io(e),
            ImportError::Database(e) => JuiceboxError::storage(e.to_string()),
            ImportError::UnsupportedFormat(_)
            | ImportError::InsufficientMetadata(_)
            | ImportError::Metadata(_) => JuiceboxError::validation(err.to_string()),
            ImportError::Normalization(_) | ImportError::CoverArt(_) => {
                JuiceboxError::storage(err.to_string())
            }
        }
    }
}
