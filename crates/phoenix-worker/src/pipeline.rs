//! One camera's per-tick composition of detection, alerting, recording and
//! notification.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::trace;

use phoenix_alerts::AlertOutbox;
use phoenix_media::{DetectionCascade, Frame, RecorderBackend};
use phoenix_models::{AlertState, DetectionSample, Overlay};

use crate::alert::{AlertStateMachine, CachedDetection};
use crate::logging::CameraLogger;
use crate::metrics::names;
use crate::recording::RecordingController;
use crate::throttle::AlertThrottle;

/// Runs detection on a sampled frame.
pub trait FrameDetector: Send {
    fn sample(&mut self, frame: &Frame) -> DetectionSample;
}

impl FrameDetector for DetectionCascade {
    fn sample(&mut self, frame: &Frame) -> DetectionSample {
        DetectionCascade::sample(self, frame)
    }
}

/// What one tick hands to a display.
#[derive(Debug, Clone)]
pub struct PublishedFrame {
    /// Frame at the processing resolution, undrawn
    pub frame: Frame,
    pub state: AlertState,
    pub status_label: &'static str,
    /// Shapes to draw, empty outside the persistence window
    pub overlay: Overlay,
}

/// Pipeline settings that do not depend on the camera.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub frame_width: u32,
    pub frame_height: u32,
    pub sample_every: u64,
    pub persistence_window: Duration,
    pub throttle_window: Duration,
    pub recording_fps: f64,
    pub videos_dir: std::path::PathBuf,
    pub snapshots_dir: std::path::PathBuf,
}

impl From<&crate::config::WorkerConfig> for PipelineSettings {
    fn from(config: &crate::config::WorkerConfig) -> Self {
        Self {
            frame_width: config.frame_width,
            frame_height: config.frame_height,
            sample_every: config.sample_every,
            persistence_window: config.persistence_window,
            throttle_window: config.throttle_window,
            recording_fps: config.recording_fps,
            videos_dir: config.videos_dir.clone(),
            snapshots_dir: config.snapshots_dir.clone(),
        }
    }
}

/// Drives one camera's components in lockstep, one tick per frame.
pub struct PipelineDriver {
    detector: Box<dyn FrameDetector>,
    cache: CachedDetection,
    state_machine: AlertStateMachine,
    recorder: RecordingController,
    throttle: AlertThrottle,
    width: u32,
    height: u32,
    sample_every: u64,
    tick: u64,
}

impl PipelineDriver {
    pub fn new(
        camera: &str,
        settings: &PipelineSettings,
        detector: Box<dyn FrameDetector>,
        recorder_backend: Box<dyn RecorderBackend>,
        outbox: Arc<dyn AlertOutbox>,
    ) -> Self {
        let logger = CameraLogger::new(camera);
        Self {
            detector,
            cache: CachedDetection::new(),
            state_machine: AlertStateMachine::new(settings.persistence_window, logger.clone()),
            recorder: RecordingController::new(
                recorder_backend,
                settings.videos_dir.clone(),
                (settings.frame_width, settings.frame_height),
                settings.recording_fps,
                logger,
            ),
            throttle: AlertThrottle::new(
                camera,
                settings.throttle_window,
                outbox,
                settings.snapshots_dir.clone(),
            ),
            width: settings.frame_width,
            height: settings.frame_height,
            sample_every: settings.sample_every.max(1),
            tick: 0,
        }
    }

    /// Process one frame captured at `now`.
    pub fn tick(&mut self, frame: Frame, now: Instant) -> PublishedFrame {
        let frame = if frame.dimensions() == (self.width, self.height) {
            frame
        } else {
            frame.resized(self.width, self.height)
        };

        if self.tick % self.sample_every == 0 {
            let sample = self.detector.sample(&frame);
            metrics::counter!(names::SAMPLED_TICKS_TOTAL).increment(1);
            if self.cache.update(sample, now) {
                trace!(tick = self.tick, "Detection cache updated");
            }
        }
        self.tick = self.tick.wrapping_add(1);

        let state = self.state_machine.evaluate(&self.cache, now);
        self.recorder.on_tick(state, &frame);
        self.throttle
            .maybe_notify(state, &frame, self.recorder.current_path(), now);
        metrics::counter!(names::FRAMES_PROCESSED_TOTAL).increment(1);

        let overlay = if self.cache.is_persisting(now, self.state_machine.persistence_window()) {
            Overlay::describe(self.cache.sample())
        } else {
            Overlay::default()
        };

        PublishedFrame {
            frame,
            state,
            status_label: state.label(),
            overlay,
        }
    }

    /// Ticks processed so far.
    pub fn ticks(&self) -> u64 {
        self.tick
    }

    pub fn cache(&self) -> &CachedDetection {
        &self.cache
    }

    pub fn state(&self) -> AlertState {
        self.state_machine.state()
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    /// Close any open recording.
    pub fn finish(&mut self) {
        self.recorder.close();
    }
}

impl std::fmt::Debug for PipelineDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineDriver")
            .field("tick", &self.tick)
            .field("state", &self.state_machine.state())
            .field("recorder", &self.recorder)
            .field("throttle", &self.throttle)
            .finish()
    }
}
