//! Error types for flora.

use thiserror::Error;

/// Result type alias using flora's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for flora operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (missing credentials, missing files)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed or returned a non-success status
    #[error("Request error: {0}")]
    Request(String),

    /// A record could not be aligned to the insert columns
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// A field name outside the canonical schema
    #[error("Unknown canonical field: {0}")]
    UnknownField(String),

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
