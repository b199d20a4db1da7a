//! API Error Types
//!
//! Errors surfaced by the REST client and the recovered-error value used by
//! read paths that keep running after a failure.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur when talking to the backend
#[derive(Error, Debug)]
pub enum ApiError {
    /// Network-level failure (DNS, connection refused, reset...)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// The HTTP client could not be constructed
    #[error("Client setup error: {0}")]
    Client(String),
}

impl ApiError {
    /// HTTP status code, if the backend produced one
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Duplicate email or username on registration
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    /// Oversized upload (profile image)
    pub fn is_payload_too_large(&self) -> bool {
        self.status() == Some(413)
    }

    /// Message suitable for an inline error or toast
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Status { status: 409, .. } => {
                "An account with that email or username already exists".to_string()
            }
            ApiError::Status { status: 413, .. } => "The uploaded image is too large".to_string(),
            ApiError::Status { message, .. } if !message.is_empty() => message.clone(),
            ApiError::Transport(_) => "Unable to reach the server, please try again".to_string(),
            _ => "Something went wrong, please try again".to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

/// Result type alias for API calls
pub type ApiResult<T> = Result<T, ApiError>;

/// A read-path failure that was logged and otherwise swallowed.
///
/// Views keep showing stale data; this value records what went wrong.
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveredError {
    pub context: &'static str,
    pub message: String,
    pub status: Option<u16>,
    pub at: DateTime<Utc>,
}

impl RecoveredError {
    /// Log the error at warn level and wrap it
    pub fn record(context: &'static str, err: &ApiError) -> Self {
        tracing::warn!(context, error = %err, "Recovered from API failure");
        Self {
            context,
            message: err.to_string(),
            status: err.status(),
            at: Utc::now(),
        }
    }
}

impl std::fmt::Display for RecoveredError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.context, self.message)
    }
}
