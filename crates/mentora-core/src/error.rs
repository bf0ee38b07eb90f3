//! Error types for mentora.

use thiserror::Error;

/// Result type alias using mentora's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for mentora operations.
///
/// `Database` wraps the underlying store error so connectivity failures stay
/// distinguishable from job-processing failures: health checks and the
/// diagnostic binaries match on it to report "disconnected" instead of
/// retrying silently.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Chapter not found
    #[error("Chapter not found: {0}")]
    ChapterNotFound(uuid::Uuid),

    /// Job not found
    #[error("Job not found: {0}")]
    JobNotFound(uuid::Uuid),

    /// Inference/generation failed
    #[error("Inference error: {0}")]
    Inference(String),

    /// Video search failed
    #[error("Video search error: {0}")]
    VideoSearch(String),

    /// Job queue error
    #[error("Job error: {0}")]
    Job(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

impl Error {
    /// Whether this error indicates the backing store is unreachable rather
    /// than a logical failure. Used by health checks and diagnostics.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Error::Database(_))
    }
}
