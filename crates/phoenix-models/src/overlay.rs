//! What a display should draw over a published frame.
//!
//! The overlay is derived from a cached detection sample alone, so any
//! consumer can reproduce it without access to the detectors.

use serde::{Deserialize, Serialize};

use crate::constants::POSE_BOX_PADDING;
use crate::detection::DetectionSample;
use crate::region::Region;

/// Which detector produced a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Motion,
    Pose,
    KnownFace,
    UnknownFace,
}

/// One box to draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayShape {
    pub kind: ShapeKind,
    pub region: Region,
    /// Text drawn next to the box (face labels only)
    pub label: Option<String>,
}

/// Shapes drawn for one published frame.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Overlay {
    pub shapes: Vec<OverlayShape>,
}

impl Overlay {
    /// Describe a detection sample: motion boxes, a padded box per pose,
    /// and labelled face boxes, in that order.
    pub fn describe(sample: &DetectionSample) -> Self {
        let motion = sample.motion.iter().map(|region| OverlayShape {
            kind: ShapeKind::Motion,
            region: *region,
            label: None,
        });

        let poses = sample
            .poses
            .iter()
            .filter_map(|kp| kp.bounding_box())
            .map(|region| OverlayShape {
                kind: ShapeKind::Pose,
                region: region.pad(POSE_BOX_PADDING),
                label: None,
            });

        let faces = sample.faces.iter().map(|face| OverlayShape {
            kind: if face.is_unknown() {
                ShapeKind::UnknownFace
            } else {
                ShapeKind::KnownFace
            },
            region: face.region,
            label: Some(face.label.clone()),
        });

        Self {
            shapes: motion.chain(poses).chain(faces).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{FaceMatch, Keypoints, Point2};

    #[test]
    fn test_describe_orders_and_labels_shapes() {
        let sample = DetectionSample {
            motion: vec![Region::new(0, 0, 40, 40)],
            poses: vec![Keypoints::new(vec![
                Point2::new(20.0, 30.0),
                Point2::new(60.0, 90.0),
            ])],
            faces: vec![
                FaceMatch::new(Region::new(10, 10, 20, 20), "Davi"),
                FaceMatch::unknown(Region::new(50, 10, 20, 20)),
            ],
        };

        let overlay = Overlay::describe(&sample);
        let kinds: Vec<_> = overlay.shapes.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ShapeKind::Motion,
                ShapeKind::Pose,
                ShapeKind::KnownFace,
                ShapeKind::UnknownFace
            ]
        );
        assert_eq!(overlay.shapes[1].region, Region::from_corners(10, 20, 70, 100));
        assert_eq!(overlay.shapes[3].label.as_deref(), Some("Unknown"));
    }

    #[test]
    fn test_pose_without_located_points_draws_nothing() {
        let sample = DetectionSample {
            motion: vec![],
            poses: vec![Keypoints::default()],
            faces: vec![],
        };
        assert!(Overlay::describe(&sample).is_empty());
    }
}
