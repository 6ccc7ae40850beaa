//! Error types for the control plane server

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Bucket error: {0}")]
    Bucket(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type ServerResult<T> = Result<T, ServerError>;
