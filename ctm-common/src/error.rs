//! Common error types for the curriculum manager

use thiserror::Error;

/// Common result type for curriculum operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the store, the sync jobs and the web layer
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested curriculum, course or row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid form input (empty field, malformed code, bad number)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Wrong password or wrong access mode
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Error::NotFound(what.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }
}
