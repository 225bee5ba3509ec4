//! Pose estimation capability.
//!
//! The pipeline only depends on [`PoseModel`]; concrete models live in
//! [`crate::backends`] behind cargo features.

use tracing::warn;

use phoenix_models::Keypoints;

use crate::error::MediaResult;
use crate::frame::Frame;

/// A model that returns body keypoints for every subject in a frame.
pub trait PoseModel: Send {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Keypoints per detected subject, in frame coordinates.
    fn detect_poses(&mut self, frame: &Frame) -> MediaResult<Vec<Keypoints>>;
}

/// Placeholder used when no pose backend is compiled in or configured.
/// Never finds anyone.
#[derive(Debug, Default, Clone)]
pub struct DisabledPoseModel;

impl PoseModel for DisabledPoseModel {
    fn name(&self) -> &'static str {
        "disabled"
    }

    fn detect_poses(&mut self, _frame: &Frame) -> MediaResult<Vec<Keypoints>> {
        Ok(Vec::new())
    }
}

/// Wraps a [`PoseModel`] so model failures never reach the pipeline.
pub struct PoseEstimator {
    model: Box<dyn PoseModel>,
}

impl PoseEstimator {
    pub fn new(model: Box<dyn PoseModel>) -> Self {
        Self { model }
    }

    pub fn disabled() -> Self {
        Self::new(Box::new(DisabledPoseModel))
    }

    /// Estimate poses on `frame`. A model error yields an empty result.
    pub fn estimate(&mut self, frame: &Frame) -> Vec<Keypoints> {
        match self.model.detect_poses(frame) {
            Ok(poses) => poses,
            Err(e) => {
                warn!(model = self.model.name(), error = %e, "Pose estimation failed");
                metrics::counter!("phoenix_detector_errors_total", "detector" => "pose")
                    .increment(1);
                Vec::new()
            }
        }
    }
}

impl std::fmt::Debug for PoseEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoseEstimator")
            .field("model", &self.model.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phoenix_models::Point2;

    struct FixedPose(Vec<Keypoints>);

    impl PoseModel for FixedPose {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn detect_poses(&mut self, _frame: &Frame) -> MediaResult<Vec<Keypoints>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_model_output_is_forwarded() {
        let kp = Keypoints::new(vec![Point2::new(5.0, 6.0)]);
        let mut estimator = PoseEstimator::new(Box::new(FixedPose(vec![kp.clone()])));
        assert_eq!(estimator.estimate(&Frame::solid(8, 8, [0, 0, 0])), vec![kp]);
    }

    struct BrokenPose;

    impl PoseModel for BrokenPose {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn detect_poses(&mut self, _frame: &Frame) -> MediaResult<Vec<Keypoints>> {
            Err(crate::MediaError::detection_failed("tensor shape mismatch"))
        }
    }

    #[test]
    fn test_failure_becomes_empty() {
        let mut estimator = PoseEstimator::new(Box::new(BrokenPose));
        let frame = Frame::solid(8, 8, [0, 0, 0]);
        assert!(estimator.estimate(&frame).is_empty());
        assert!(estimator.estimate(&frame).is_empty());
    }

    #[test]
    fn test_disabled_finds_nobody() {
        let mut estimator = PoseEstimator::disabled();
        assert!(estimator.estimate(&Frame::solid(8, 8, [0, 0, 0])).is_empty());
    }
}
