//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid hash: {0}")]
    InvalidHash(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid metadata patch: {0}")]
    InvalidPatch(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
