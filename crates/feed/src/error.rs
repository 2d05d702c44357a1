//! Error types for feed operations.

use thiserror::Error;

/// Result type for feed operations.
pub type Result<T> = std::result::Result<T, FeedError>;

/// Errors surfaced by the content store and its backends.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FeedError {
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid document {id}: {reason}")]
    InvalidDocument { id: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Identity error: {0}")]
    Identity(String),
}

impl FeedError {
    pub fn invalid_document(id: impl Into<String>, reason: impl Into<String>) -> Self {
        FeedError::InvalidDocument {
            id: id.into(),
            reason: reason.into(),
        }
    }
}
