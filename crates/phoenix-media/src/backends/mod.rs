//! Concrete model and capture backends, selected by cargo feature.
//!
//! The constructors here never fail: a missing feature or model falls back
//! to the disabled model with a warning, so a camera keeps running with
//! motion detection only.

use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::MediaResult;
use crate::face::{DisabledFaceModel, FaceModel};
use crate::pose::{DisabledPoseModel, PoseModel};
use crate::source::{FfmpegFrameSource, FrameSource, SourceSpec};

#[cfg(feature = "onnx")]
pub mod ort_pose;

#[cfg(feature = "opencv")]
pub mod opencv_face;

#[cfg(feature = "opencv")]
pub mod opencv_motion;

#[cfg(feature = "opencv")]
pub mod opencv_source;

#[cfg(feature = "opencv")]
fn cv_err(context: &str) -> impl Fn(opencv::Error) -> crate::error::MediaError + '_ {
    move |e| crate::error::MediaError::detection_failed(format!("{}: {}", context, e))
}

/// Pose model for `model_path`, or the disabled model.
pub fn pose_model(model_path: Option<&Path>) -> Box<dyn PoseModel> {
    let Some(path) = model_path else {
        warn!("No pose model configured, pose estimation disabled");
        return Box::new(DisabledPoseModel);
    };

    #[cfg(feature = "onnx")]
    {
        match ort_pose::OrtPoseModel::load(path, ort_pose::OrtPoseConfig::default()) {
            Ok(model) => return Box::new(model),
            Err(e) => warn!(path = %path.display(), error = %e, "Pose model failed to load, pose estimation disabled"),
        }
    }
    #[cfg(not(feature = "onnx"))]
    warn!(path = %path.display(), "Built without the onnx feature, pose estimation disabled");

    Box::new(DisabledPoseModel)
}

/// Face model for the detector/recognizer pair, or the disabled model.
pub fn face_model(detector_path: Option<&Path>, recognizer_path: Option<&Path>) -> Box<dyn FaceModel> {
    let (Some(detector), Some(recognizer)) = (detector_path, recognizer_path) else {
        warn!("Face models not configured, every face will be unknown");
        return Box::new(DisabledFaceModel);
    };

    #[cfg(feature = "opencv")]
    {
        match opencv_face::OpenCvFaceModel::load(detector, recognizer) {
            Ok(model) => return Box::new(model),
            Err(e) => warn!(error = %e, "Face models failed to load, face recognition disabled"),
        }
    }
    #[cfg(not(feature = "opencv"))]
    warn!(
        detector = %detector.display(),
        recognizer = %recognizer.display(),
        "Built without the opencv feature, face recognition disabled"
    );

    Box::new(DisabledFaceModel)
}

/// Open a camera. Prefers `VideoCapture` when built with opencv, FFmpeg
/// otherwise or when capture fails to open.
pub fn open_source(
    spec: &SourceSpec,
    width: u32,
    height: u32,
    read_timeout: Duration,
) -> MediaResult<Box<dyn FrameSource>> {
    #[cfg(feature = "opencv")]
    {
        match opencv_source::OpenCvFrameSource::open(spec.clone(), width, height, read_timeout) {
            Ok(source) => return Ok(Box::new(source)),
            Err(e) => warn!(source = %spec, error = %e, "VideoCapture failed, falling back to FFmpeg"),
        }
    }

    let source = FfmpegFrameSource::open(spec.clone(), width, height, read_timeout)?;
    info!(source = %spec, "Using FFmpeg frame source");
    Ok(Box::new(source))
}
