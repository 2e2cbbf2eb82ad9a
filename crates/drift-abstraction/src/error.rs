//! Errors raised by platform collaborators.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Represents an error that can occur when talking to the ML platform or its
/// satellite services (secret store, storage, token endpoint).
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlatformError {
    /// An error occurred while sending the request (network issues, invalid URL).
    #[error("Request Error: {0}")]
    Request(String),

    /// The platform answered with a non-success status.
    #[error("Platform Response Error ({status}): {message}")]
    Response {
        /// HTTP status code returned by the platform.
        status: u16,
        /// Body or reason returned with the status.
        message: String,
    },

    /// The requested resource does not exist.
    #[error("Not Found: {0}")]
    NotFound(String),

    /// Token acquisition or authentication failed.
    #[error("Authentication Error: {0}")]
    Auth(String),

    /// Secret retrieval failed.
    #[error("Secret Error: {0}")]
    Secret(String),

    /// An error occurred during serialization or deserialization.
    #[error("Serialization Error: {0}")]
    Serialization(String),

    /// Local filesystem access failed (staging, uploads).
    #[error("I/O Error: {0}")]
    Io(String),
}

impl From<std::io::Error> for PlatformError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for PlatformError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for platform operations.
pub type PlatformResult<T> = std::result::Result<T, PlatformError>;
