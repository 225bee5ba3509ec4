//! The motion → pose → face detection cascade.
//!
//! Stages run in [`Stage::ORDER`]; each stage only runs when the stage
//! before it found something. The first closed stage ends the run.

use tracing::trace;

use phoenix_models::DetectionSample;

use crate::face::FaceMatcher;
use crate::frame::Frame;
use crate::motion::MotionDetector;
use crate::pose::PoseEstimator;

/// One detector in the cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Motion,
    Pose,
    Face,
}

impl Stage {
    /// Execution order.
    pub const ORDER: [Stage; 3] = [Stage::Motion, Stage::Pose, Stage::Face];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Motion => "motion",
            Stage::Pose => "pose",
            Stage::Face => "face",
        }
    }

    /// Whether this stage may run given what earlier stages produced.
    pub fn is_open(&self, sample: &DetectionSample) -> bool {
        match self {
            Stage::Motion => true,
            Stage::Pose => !sample.motion.is_empty(),
            Stage::Face => !sample.poses.is_empty(),
        }
    }
}

/// Owns one camera's detectors.
#[derive(Debug)]
pub struct DetectionCascade {
    motion: MotionDetector,
    pose: PoseEstimator,
    face: FaceMatcher,
}

impl DetectionCascade {
    pub fn new(motion: MotionDetector, pose: PoseEstimator, face: FaceMatcher) -> Self {
        Self { motion, pose, face }
    }

    /// Run the cascade on one sampled frame.
    pub fn sample(&mut self, frame: &Frame) -> DetectionSample {
        let mut sample = DetectionSample::default();

        for stage in Stage::ORDER {
            if !stage.is_open(&sample) {
                trace!(stage = stage.as_str(), "Cascade stage gated off");
                break;
            }
            match stage {
                Stage::Motion => sample.motion = self.motion.detect(frame),
                Stage::Pose => sample.poses = self.pose.estimate(frame),
                Stage::Face => sample.faces = self.face.recognize(frame),
            }
        }

        sample
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use phoenix_models::{Keypoints, Point2, Region};

    use super::*;
    use crate::error::MediaResult;
    use crate::face::{FaceEncoding, FaceModel, LocatedFace};
    use crate::gallery::Gallery;
    use crate::pose::PoseModel;

    struct CountingPose {
        calls: Arc<AtomicUsize>,
        subjects: usize,
    }

    impl PoseModel for CountingPose {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn detect_poses(&mut self, _frame: &Frame) -> MediaResult<Vec<Keypoints>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Keypoints::new(vec![Point2::new(10.0, 10.0)]); self.subjects])
        }
    }

    struct CountingFaces {
        calls: Arc<AtomicUsize>,
    }

    impl FaceModel for CountingFaces {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn locate_and_encode(&mut self, _frame: &Frame) -> MediaResult<Vec<LocatedFace>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![LocatedFace::new(
                Region::new(1, 1, 5, 5),
                FaceEncoding::new(vec![9.0]),
            )])
        }
    }

    fn cascade(subjects: usize) -> (DetectionCascade, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let pose_calls = Arc::new(AtomicUsize::new(0));
        let face_calls = Arc::new(AtomicUsize::new(0));
        let cascade = DetectionCascade::new(
            MotionDetector::default(),
            PoseEstimator::new(Box::new(CountingPose {
                calls: pose_calls.clone(),
                subjects,
            })),
            FaceMatcher::new(
                Box::new(CountingFaces {
                    calls: face_calls.clone(),
                }),
                Arc::new(Gallery::empty()),
            ),
        );
        (cascade, pose_calls, face_calls)
    }

    fn scene(square: bool) -> Frame {
        let mut frame = Frame::solid(640, 360, [0, 0, 0]);
        if square {
            frame.fill_rect(100, 100, 120, 120, [255, 255, 255]);
        }
        frame
    }

    #[test]
    fn test_stage_gates() {
        let empty = DetectionSample::default();
        assert!(Stage::Motion.is_open(&empty));
        assert!(!Stage::Pose.is_open(&empty));
        assert!(!Stage::Face.is_open(&empty));

        let moving = DetectionSample {
            motion: vec![Region::new(0, 0, 50, 50)],
            ..Default::default()
        };
        assert!(Stage::Pose.is_open(&moving));
        assert!(!Stage::Face.is_open(&moving));
    }

    #[test]
    fn test_no_motion_skips_pose_and_face() {
        let (mut cascade, pose_calls, face_calls) = cascade(1);
        cascade.sample(&scene(false));
        let sample = cascade.sample(&scene(false));

        assert!(sample.is_empty());
        assert_eq!(pose_calls.load(Ordering::SeqCst), 0);
        assert_eq!(face_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_motion_without_bodies_skips_face() {
        let (mut cascade, pose_calls, face_calls) = cascade(0);
        cascade.sample(&scene(false));
        let sample = cascade.sample(&scene(true));

        assert_eq!(sample.motion.len(), 1);
        assert!(sample.poses.is_empty());
        assert!(sample.faces.is_empty());
        assert_eq!(pose_calls.load(Ordering::SeqCst), 1);
        assert_eq!(face_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_full_cascade_runs_every_stage() {
        let (mut cascade, pose_calls, face_calls) = cascade(1);
        cascade.sample(&scene(false));
        let sample = cascade.sample(&scene(true));

        assert_eq!(sample.poses.len(), 1);
        assert_eq!(sample.faces.len(), 1);
        assert!(sample.faces[0].is_unknown());
        assert_eq!(pose_calls.load(Ordering::SeqCst), 1);
        assert_eq!(face_calls.load(Ordering::SeqCst), 1);
    }
}
