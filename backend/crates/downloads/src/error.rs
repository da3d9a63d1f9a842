//! Download Accounting Error Types
//!
//! Every failure here is operational: there is no caller to report to, so
//! errors end up in logs at the per-notification or per-sweep boundary.

use thiserror::Error;

/// Download-accounting result type alias
pub type DownloadResult<T> = Result<T, DownloadError>;

/// Download-accounting error variants
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Notification transport failure (connect, HTTP status, stream read)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Notification payload could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Configuration value rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DownloadError {
    /// Log the error with appropriate level
    pub fn log(&self) {
        match self {
            DownloadError::Database(e) => {
                tracing::error!(error = %e, "Download accounting database error");
            }
            DownloadError::Transport(msg) => {
                tracing::warn!(message = %msg, "Notification transport error");
            }
            DownloadError::Decode(e) => {
                tracing::warn!(error = %e, "Undecodable notification payload");
            }
            DownloadError::InvalidConfig(msg) => {
                tracing::error!(message = %msg, "Invalid download accounting configuration");
            }
            DownloadError::Internal(msg) => {
                tracing::error!(message = %msg, "Download accounting internal error");
            }
        }
    }
}

impl From<reqwest::Error> for DownloadError {
    fn from(err: reqwest::Error) -> Self {
        DownloadError::Transport(err.to_string())
    }
}

impl From<platform::config::ConfigError> for DownloadError {
    fn from(err: platform::config::ConfigError) -> Self {
        DownloadError::InvalidConfig(err.to_string())
    }
}

impl From<platform::sigv4::SigningError> for DownloadError {
    fn from(err: platform::sigv4::SigningError) -> Self {
        DownloadError::Transport(err.to_string())
    }
}
