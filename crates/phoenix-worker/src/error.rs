//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Camera {camera} failed: {message}")]
    CameraFailed { camera: String, message: String },

    #[error("Worker thread panicked: {0}")]
    ThreadPanicked(String),

    #[error("Media error: {0}")]
    Media(#[from] phoenix_media::MediaError),

    #[error("Alert error: {0}")]
    Alert(#[from] phoenix_alerts::AlertError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn camera_failed(camera: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::CameraFailed {
            camera: camera.into(),
            message: msg.into(),
        }
    }
}
