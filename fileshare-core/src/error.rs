//! Error types for the fileshare client

use thiserror::Error;

/// Message shown when a session token is rejected by the backend
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please login again.";

/// Every failure a client operation can surface.
///
/// Errors are plain values: they are cloned into error areas and compared in
/// tests, so no variant wraps a non-`Clone` source error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The backend rejected a token that was sent with the request.
    #[error("Session expired. Please login again.")]
    SessionExpired,

    /// Any other non-success response; the message is the backend's own.
    #[error("{0}")]
    RequestFailed(String),

    /// Network failure, or a body that could not be read.
    #[error("{0}")]
    TransportFailure(String),

    /// Backend field validation errors, one message per entry.
    #[error("{}", .0.join("\n"))]
    ValidationRejected(Vec<String>),

    /// A JSON body that does not have the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The persisted key-value store failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl ClientError {
    /// Build a validation error from a newline-separated backend message
    pub fn validation(message: &str) -> Self {
        ClientError::ValidationRejected(split_lines(message))
    }

    /// The message split into display lines, never concatenated
    pub fn lines(&self) -> Vec<String> {
        match self {
            ClientError::ValidationRejected(lines) => lines.clone(),
            other => split_lines(&other.to_string()),
        }
    }

    /// Whether this error ends the session rather than being shown locally
    pub fn is_session_expired(&self) -> bool {
        matches!(self, ClientError::SessionExpired)
    }
}

fn split_lines(message: &str) -> Vec<String> {
    message
        .split('\n')
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
