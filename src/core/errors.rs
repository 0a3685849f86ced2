//! Failures shared by services, repositories and the completion client.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Missing or malformed input.
    #[error("{0}")]
    Validation(String),

    /// The referenced entity does not exist or does not belong to the caller.
    #[error("{0}")]
    NotFound(String),

    /// The operation would break a reference held by another entity.
    #[error("{0}")]
    Conflict(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("completion API error: {status} {body}")]
    Upstream { status: u16, body: String },

    #[error("completion API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid completion API response: {0}")]
    Protocol(String),

    #[error("transaction failed: {0}")]
    Transaction(#[source] sqlx::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }
}
