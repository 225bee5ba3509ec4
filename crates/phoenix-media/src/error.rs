//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during capture, detection and recording.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        exit_code: Option<i32>,
    },

    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Frame read timed out after {0} seconds")]
    Timeout(u64),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Detection failed: {0}")]
    DetectionFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Recording failed: {0}")]
    RecordingFailed(String),
}

impl MediaError {
    /// Create a detection failure error.
    pub fn detection_failed(message: impl Into<String>) -> Self {
        Self::DetectionFailed(message.into())
    }

    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(message: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a source failure error.
    pub fn source_unavailable(message: impl Into<String>) -> Self {
        Self::SourceUnavailable(message.into())
    }

    /// Create a model not found error.
    pub fn model_not_found(path: impl Into<String>) -> Self {
        Self::ModelNotFound(path.into())
    }

    /// Create a recording failure error.
    pub fn recording_failed(message: impl Into<String>) -> Self {
        Self::RecordingFailed(message.into())
    }

    /// Check if a failed read is worth retrying.
    ///
    /// Missing binaries and files will not appear between two reads.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            MediaError::FfmpegNotFound | MediaError::FileNotFound(_) | MediaError::ModelNotFound(_)
        )
    }
}
