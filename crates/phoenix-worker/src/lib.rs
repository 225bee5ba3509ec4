//! Per-camera surveillance pipeline.
//!
//! This crate provides:
//! - The sticky detection cache and persistence-window alert state machine
//! - Episode recording and alert throttling
//! - The per-tick pipeline driver and camera worker loop
//! - A supervisor running one worker thread per camera
//! - Configuration, logging and metrics for the `phoenix-worker` binary

pub mod alert;
pub mod camera;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod recording;
pub mod retry;
pub mod supervisor;
pub mod throttle;

pub use alert::{decide, AlertStateMachine, CachedDetection};
pub use camera::{run_camera, BackendFactory, CameraFactory, CameraOutputs, CameraWorker};
pub use config::{parse_cameras, CameraConfig, WorkerConfig};
pub use error::{WorkerError, WorkerResult};
pub use logging::CameraLogger;
pub use pipeline::{FrameDetector, PipelineDriver, PipelineSettings, PublishedFrame};
pub use recording::RecordingController;
pub use retry::{RetryConfig, RetryResult};
pub use supervisor::{CameraHandle, CameraSupervisor};
pub use throttle::{AlertThrottle, ThrottleTimer};
