//! Error types for the upload tracker
//!
//! This module provides a unified error type using thiserror so that decode,
//! export and control-channel failures carry their context up to the caller.

use thiserror::Error;

/// Tracker error type that wraps all possible errors
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Inbound event could not be decoded
    #[error("Invalid event '{name}': {reason}")]
    InvalidEvent {
        /// Wire name of the rejected event
        name: String,
        /// Why decoding failed
        reason: String,
    },

    /// Clipboard access failed
    #[error("Clipboard error: {0}")]
    Clipboard(String),

    /// Control or event channel has no receiver left
    #[error("Channel closed: {0}")]
    ChannelClosed(&'static str),

    /// Background task could not be joined
    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Lock acquisition failed
    #[error("Failed to acquire lock")]
    LockFailed,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, AppError>;

/// Convert `AppError` to String for display surfaces that only take text
impl From<AppError> for String {
    fn from(err: AppError) -> Self {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::InvalidEvent {
            name: "ThreadStatus".to_owned(),
            reason: "missing field `WorkerID`".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid event 'ThreadStatus': missing field `WorkerID`"
        );
    }

    #[test]
    fn test_error_conversion_to_string() {
        let err = AppError::ChannelClosed("control");
        let s: String = err.into();
        assert_eq!(s, "Channel closed: control");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let app_err: AppError = io_err.into();
        assert!(app_err.to_string().contains("IO error"));
    }
}
