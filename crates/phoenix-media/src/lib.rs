#![deny(unreachable_patterns)]
//! Frame handling and detection for the Phoenix Vision pipeline.
//!
//! This crate provides:
//! - An owned RGB `Frame` at the pipeline's processing resolution
//! - Frame-differencing motion detection
//! - Pose and face capability interfaces with gated wrappers
//! - The known-identity gallery
//! - The motion → pose → face detection cascade
//! - FFmpeg-backed frame sources and episode recorders
//! - Alert snapshot writing

pub mod backends;
pub mod cascade;
pub mod command;
pub mod error;
pub mod face;
pub mod frame;
pub mod gallery;
pub mod motion;
pub mod pose;
pub mod recorder;
pub mod snapshot;
pub mod source;

pub use cascade::{DetectionCascade, Stage};
pub use command::FfmpegCommand;
pub use error::{MediaError, MediaResult};
pub use face::{DisabledFaceModel, FaceEncoding, FaceMatcher, FaceModel, LocatedFace};
pub use frame::Frame;
pub use gallery::{Gallery, KnownIdentity};
pub use motion::{MotionConfig, MotionDetector};
pub use pose::{DisabledPoseModel, PoseEstimator, PoseModel};
pub use recorder::{numbered_file_name, recording_file_name, FfmpegRecorder, RecorderBackend, VideoSink};
pub use snapshot::{snapshot_path, write_snapshot};
pub use source::{FfmpegFrameSource, FrameSource, SourceSpec};
