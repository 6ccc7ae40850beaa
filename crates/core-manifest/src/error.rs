//! Error types for manifest operations

use std::io;
use thiserror::Error;

/// Result type for manifest operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during manifest operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A rule pattern failed to compile
    #[error("invalid rule pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    /// Unrecognized load mode string
    #[error("invalid load mode: {0:?} (expected sync, defer or async)")]
    InvalidMode(String),
}

impl Error {
    /// Create an invalid pattern error
    pub fn invalid_pattern<S: Into<String>>(pattern: S, source: regex::Error) -> Self {
        Error::InvalidPattern {
            pattern: pattern.into(),
            source,
        }
    }
}
