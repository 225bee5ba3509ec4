//! Structured camera logging utilities.
//!
//! Every camera worker runs inside a `camera` span, so events emitted by
//! the detectors and controllers below it carry the camera name.

use std::path::Path;

use tracing::{info, warn, Span};

use phoenix_models::{AlertState, CameraStatus};

/// Logger for one camera's lifecycle events.
#[derive(Debug, Clone)]
pub struct CameraLogger {
    camera: String,
}

impl CameraLogger {
    pub fn new(camera: impl Into<String>) -> Self {
        Self {
            camera: camera.into(),
        }
    }

    pub fn camera(&self) -> &str {
        &self.camera
    }

    /// Create the tracing span a camera worker runs in.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("camera", camera = %self.camera)
    }

    pub fn log_transition(&self, from: AlertState, to: AlertState) {
        if to.is_alert() {
            warn!(camera = %self.camera, from = %from, to = %to, "Suspicious activity detected");
        } else {
            info!(camera = %self.camera, from = %from, to = %to, "Back to monitoring");
        }
    }

    pub fn log_recording_started(&self, path: &Path) {
        info!(camera = %self.camera, path = %path.display(), "Recording started");
    }

    pub fn log_recording_stopped(&self, path: &Path, frames: u64) {
        info!(camera = %self.camera, path = %path.display(), frames, "Recording stopped");
    }

    pub fn log_status(&self, status: CameraStatus) {
        info!(camera = %self.camera, status = status.label(), "Camera status changed");
    }

    pub fn log_source_failure(&self, error: &dyn std::fmt::Display, attempts: u32) {
        warn!(camera = %self.camera, error = %error, attempts, "Camera source failed");
    }
}
