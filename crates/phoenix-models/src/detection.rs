//! Detection primitives produced by one run of the detector cascade.

use serde::{Deserialize, Serialize};

use crate::region::Region;

/// Label given to a face that matches no known identity.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// A 2D point in frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Body keypoints of one detected subject.
///
/// Points follow the 17-point COCO index scheme. Undetected points are
/// reported by the models as (0, 0).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Keypoints {
    pub points: Vec<Point2>,
}

impl Keypoints {
    /// Number of points in the COCO scheme.
    pub const COUNT: usize = 17;

    pub fn new(points: Vec<Point2>) -> Self {
        Self { points }
    }

    /// Tight box around the located points.
    ///
    /// Coordinates that are not strictly positive are treated as missing,
    /// per axis. Returns `None` when no point was located.
    pub fn bounding_box(&self) -> Option<Region> {
        let xs = self.points.iter().map(|p| p.x).filter(|x| *x > 0.0);
        let ys = self.points.iter().map(|p| p.y).filter(|y| *y > 0.0);

        let (x_min, x_max) = min_max(xs)?;
        let (y_min, y_max) = min_max(ys)?;

        Some(Region::from_corners(
            x_min as i32,
            y_min as i32,
            x_max as i32,
            y_max as i32,
        ))
    }
}

fn min_max(values: impl Iterator<Item = f32>) -> Option<(f32, f32)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

/// A located face and the identity it was resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceMatch {
    /// Face box in frame coordinates
    pub region: Region,
    /// Gallery label, or [`UNKNOWN_LABEL`]
    pub label: String,
}

impl FaceMatch {
    pub fn new(region: Region, label: impl Into<String>) -> Self {
        Self {
            region,
            label: label.into(),
        }
    }

    pub fn unknown(region: Region) -> Self {
        Self::new(region, UNKNOWN_LABEL)
    }

    pub fn is_unknown(&self) -> bool {
        self.label == UNKNOWN_LABEL
    }
}

/// Output of one detector cascade run.
///
/// `poses` is only ever non-empty when `motion` is, and `faces` only when
/// `poses` is: each detector is gated behind the previous one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectionSample {
    pub motion: Vec<Region>,
    pub poses: Vec<Keypoints>,
    pub faces: Vec<FaceMatch>,
}

impl DetectionSample {
    /// True when no detector found anything.
    pub fn is_empty(&self) -> bool {
        self.motion.is_empty() && self.poses.is_empty() && self.faces.is_empty()
    }

    /// True when at least one face could not be identified.
    pub fn has_unknown_face(&self) -> bool {
        self.faces.iter().any(FaceMatch::is_unknown)
    }

    /// Motion was seen but no face evidence exists.
    pub fn motion_without_faces(&self) -> bool {
        !self.motion.is_empty() && self.faces.is_empty()
    }

    /// The suspicious-activity rule applied to this sample.
    pub fn is_suspicious(&self) -> bool {
        self.has_unknown_face() || self.motion_without_faces()
    }
}
