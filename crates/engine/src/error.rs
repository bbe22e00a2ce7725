//! Workflow error taxonomy.
//!
//! Every variant maps to an item-level outcome: a `Validation`, `Decode` or
//! backend failure on one file never aborts the rest of an upload batch.

use larder_metadata::MetadataError;
use larder_storage::StorageError;
use thiserror::Error;

/// Errors surfaced by the action layer.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The file may not be stored (oversize, empty, disallowed type).
    #[error("{0}")]
    Validation(String),

    /// Unknown record id or payload key; a 404-equivalent outcome.
    #[error("file not found: {0}")]
    NotFound(String),

    /// Payload backend failure (I/O, auth, connectivity).
    #[error("storage backend error: {0}")]
    Storage(StorageError),

    /// Metadata backend failure.
    #[error("metadata backend error: {0}")]
    Metadata(MetadataError),

    /// The payload could not be decoded as an image.
    #[error("unable to decode image: {0}")]
    Decode(String),

    /// Invalid instance configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl EngineError {
    /// Stable error class string, reported in upload failure outcomes.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Storage(_) => "storage_backend",
            Self::Metadata(_) => "metadata_backend",
            Self::Decode(_) => "decode",
            Self::Config(_) => "config",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<StorageError> for EngineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => Self::NotFound(key),
            other => Self::Storage(other),
        }
    }
}

impl From<MetadataError> for EngineError {
    fn from(err: MetadataError) -> Self {
        match err {
            MetadataError::NotFound(what) => Self::NotFound(what),
            other => Self::Metadata(other),
        }
    }
}

/// Result type for workflow operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;
