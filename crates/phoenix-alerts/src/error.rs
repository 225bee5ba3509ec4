//! Alert delivery error types.

use thiserror::Error;

/// Result type for alert operations.
pub type AlertResult<T> = Result<T, AlertError>;

/// Errors that can occur while notifying or recording events.
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("Notification failed: {0}")]
    NotificationFailed(String),

    #[error("Notifier returned HTTP {0}")]
    HttpStatus(u16),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Event store error: {0}")]
    Store(String),

    #[error("Alert queue full")]
    QueueFull,

    #[error("Alert queue closed")]
    QueueClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Media error: {0}")]
    Media(#[from] phoenix_media::MediaError),
}

impl AlertError {
    pub fn notification_failed(msg: impl Into<String>) -> Self {
        Self::NotificationFailed(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }
}
