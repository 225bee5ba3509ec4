//! The per-camera worker loop.
//!
//! A worker owns its source and pipeline outright and shares nothing
//! mutable with other cameras. It checks the stop signal once per tick and
//! releases the source and any open recording on every exit path.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tracing::info;

use phoenix_alerts::AlertOutbox;
use phoenix_media::{
    backends, DetectionCascade, FaceMatcher, FfmpegRecorder, FrameSource, Gallery, MediaResult, MotionDetector,
    PoseEstimator, RecorderBackend,
};
use phoenix_models::CameraStatus;

use crate::config::{CameraConfig, WorkerConfig};
use crate::logging::CameraLogger;
use crate::metrics::names;
use crate::pipeline::{FrameDetector, PipelineDriver, PipelineSettings, PublishedFrame};
use crate::retry::{retry_blocking, stop_requested, RetryConfig, RetryResult};

/// Builds everything a camera worker owns.
pub trait CameraFactory: Send + Sync {
    fn open_source(&self, camera: &CameraConfig) -> MediaResult<Box<dyn FrameSource>>;

    fn detector(&self, camera: &CameraConfig) -> Box<dyn FrameDetector>;

    fn recorder(&self, camera: &CameraConfig) -> Box<dyn RecorderBackend>;
}

/// Real sources, models and FFmpeg recording.
#[derive(Debug, Clone)]
pub struct BackendFactory {
    config: WorkerConfig,
    gallery: Arc<Gallery>,
}

impl BackendFactory {
    pub fn new(config: WorkerConfig, gallery: Arc<Gallery>) -> Self {
        Self { config, gallery }
    }
}

impl CameraFactory for BackendFactory {
    fn open_source(&self, camera: &CameraConfig) -> MediaResult<Box<dyn FrameSource>> {
        backends::open_source(
            &camera.source,
            self.config.frame_width,
            self.config.frame_height,
            self.config.read_timeout,
        )
    }

    fn detector(&self, _camera: &CameraConfig) -> Box<dyn FrameDetector> {
        let pose = PoseEstimator::new(backends::pose_model(self.config.pose_model.as_deref()));
        let face = FaceMatcher::new(
            backends::face_model(
                self.config.face_detector_model.as_deref(),
                self.config.face_recognizer_model.as_deref(),
            ),
            self.gallery.clone(),
        )
        .with_tolerance(self.config.face_tolerance);
        Box::new(DetectionCascade::new(MotionDetector::default(), pose, face))
    }

    fn recorder(&self, _camera: &CameraConfig) -> Box<dyn RecorderBackend> {
        Box::new(FfmpegRecorder::new())
    }
}

/// Where a worker publishes its output.
#[derive(Debug)]
pub struct CameraOutputs {
    pub status: watch::Sender<CameraStatus>,
    pub frames: watch::Sender<Option<PublishedFrame>>,
}

impl CameraOutputs {
    pub fn channel() -> (Self, watch::Receiver<CameraStatus>, watch::Receiver<Option<PublishedFrame>>) {
        let (status, status_rx) = watch::channel(CameraStatus::Starting);
        let (frames, frames_rx) = watch::channel(None);
        (Self { status, frames }, status_rx, frames_rx)
    }
}

/// One camera's running state.
pub struct CameraWorker {
    logger: CameraLogger,
    driver: PipelineDriver,
    retry: RetryConfig,
    stop: watch::Receiver<bool>,
    outputs: CameraOutputs,
}

impl CameraWorker {
    pub fn new(
        camera: &str,
        driver: PipelineDriver,
        retry: RetryConfig,
        stop: watch::Receiver<bool>,
        outputs: CameraOutputs,
    ) -> Self {
        Self {
            logger: CameraLogger::new(camera),
            driver,
            retry,
            stop,
            outputs,
        }
    }

    /// Tick until stopped, the stream ends or the source is given up on.
    pub fn run(mut self, mut source: Box<dyn FrameSource>) -> CameraStatus {
        let exit = loop {
            if stop_requested(&self.stop) {
                info!(camera = %self.logger.camera(), "Stop requested");
                break CameraStatus::Stopped;
            }

            let read = retry_blocking(&self.retry, &self.stop, |attempt| {
                if attempt > 0 {
                    source.reopen()?;
                }
                source.next_frame()
            });

            match read {
                RetryResult::Success(Some(frame)) => {
                    let published = self.driver.tick(frame, Instant::now());
                    self.publish_status(CameraStatus::Live(published.state));
                    self.outputs.frames.send_replace(Some(published));
                }
                RetryResult::Success(None) => {
                    info!(camera = %self.logger.camera(), ticks = self.driver.ticks(), "End of stream");
                    break CameraStatus::Stopped;
                }
                RetryResult::Failed { error, attempts } => {
                    self.logger.log_source_failure(&error, attempts);
                    metrics::counter!(names::SOURCE_FAILURES_TOTAL).increment(1);
                    break CameraStatus::NoSignal;
                }
                RetryResult::Cancelled => break CameraStatus::Stopped,
            }
        };

        self.driver.finish();
        drop(source);
        self.publish_status(exit);
        exit
    }

    fn publish_status(&self, status: CameraStatus) {
        let logger = &self.logger;
        self.outputs.status.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            logger.log_status(status);
            *current = status;
            true
        });
    }
}

/// Open the camera's source and run its worker to completion.
pub fn run_camera(
    camera: &CameraConfig,
    factory: &dyn CameraFactory,
    settings: &PipelineSettings,
    retry: RetryConfig,
    outbox: Arc<dyn AlertOutbox>,
    stop: watch::Receiver<bool>,
    outputs: CameraOutputs,
) -> CameraStatus {
    let logger = CameraLogger::new(&camera.name);
    info!(camera = %camera.name, source = %camera.source, "Opening camera");

    let source = match retry_blocking(&retry, &stop, |_| factory.open_source(camera)) {
        RetryResult::Success(source) => source,
        RetryResult::Failed { error, attempts } => {
            logger.log_source_failure(&error, attempts);
            return finish_without_source(&outputs, &logger, CameraStatus::NoSignal);
        }
        RetryResult::Cancelled => return finish_without_source(&outputs, &logger, CameraStatus::Stopped),
    };

    let driver = PipelineDriver::new(
        &camera.name,
        settings,
        factory.detector(camera),
        factory.recorder(camera),
        outbox,
    );
    CameraWorker::new(&camera.name, driver, retry, stop, outputs).run(source)
}

fn finish_without_source(outputs: &CameraOutputs, logger: &CameraLogger, status: CameraStatus) -> CameraStatus {
    logger.log_status(status);
    outputs.status.send_replace(status);
    status
}

/// Retry policy for a camera's source, as configured.
pub fn source_retry(camera: &CameraConfig, config: &WorkerConfig) -> RetryConfig {
    RetryConfig::new(format!("{} source", camera.name)).with_max_retries(config.source_max_retries)
}
