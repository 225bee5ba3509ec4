//! Face localization and identity matching.

use std::sync::Arc;

use tracing::warn;

use phoenix_models::constants::{DEFAULT_FACE_TOLERANCE, FACE_DOWNSCALE};
use phoenix_models::{FaceMatch, Region, UNKNOWN_LABEL};

use crate::error::MediaResult;
use crate::frame::Frame;
use crate::gallery::Gallery;

/// Fixed-length face descriptor produced by a [`FaceModel`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FaceEncoding(pub Vec<f32>);

impl FaceEncoding {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Euclidean distance. Encodings of different length never match.
    pub fn distance(&self, other: &FaceEncoding) -> f32 {
        if self.0.len() != other.0.len() {
            return f32::INFINITY;
        }
        self.0
            .iter()
            .zip(&other.0)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f32>()
            .sqrt()
    }
}

/// A face found by the model, in the coordinates of the frame it was given.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedFace {
    pub region: Region,
    pub encoding: FaceEncoding,
}

impl LocatedFace {
    pub fn new(region: Region, encoding: FaceEncoding) -> Self {
        Self { region, encoding }
    }
}

/// A model that finds faces and encodes each one.
pub trait FaceModel: Send {
    fn name(&self) -> &'static str;

    fn locate_and_encode(&mut self, frame: &Frame) -> MediaResult<Vec<LocatedFace>>;
}

/// Placeholder used when no face backend is compiled in or configured.
#[derive(Debug, Default, Clone)]
pub struct DisabledFaceModel;

impl FaceModel for DisabledFaceModel {
    fn name(&self) -> &'static str {
        "disabled"
    }

    fn locate_and_encode(&mut self, _frame: &Frame) -> MediaResult<Vec<LocatedFace>> {
        Ok(Vec::new())
    }
}

/// Resolves faces in a frame against the known-identity gallery.
pub struct FaceMatcher {
    model: Box<dyn FaceModel>,
    gallery: Arc<Gallery>,
    tolerance: f32,
}

impl FaceMatcher {
    pub fn new(model: Box<dyn FaceModel>, gallery: Arc<Gallery>) -> Self {
        Self {
            model,
            gallery,
            tolerance: DEFAULT_FACE_TOLERANCE,
        }
    }

    pub fn disabled() -> Self {
        Self::new(Box::new(DisabledFaceModel), Arc::new(Gallery::empty()))
    }

    pub fn with_tolerance(mut self, tolerance: f32) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn gallery(&self) -> &Gallery {
        &self.gallery
    }

    /// Locate faces on a downscaled copy of `frame` and label each one.
    ///
    /// Each face takes the label of the first gallery entry within
    /// tolerance, or [`UNKNOWN_LABEL`]. Boxes are returned in frame
    /// coordinates. A model error yields an empty result.
    pub fn recognize(&mut self, frame: &Frame) -> Vec<FaceMatch> {
        let small = frame.scaled(FACE_DOWNSCALE);
        let upscale = (1.0 / FACE_DOWNSCALE).round() as i32;

        let located = match self.model.locate_and_encode(&small) {
            Ok(located) => located,
            Err(e) => {
                warn!(model = self.model.name(), error = %e, "Face recognition failed");
                metrics::counter!("phoenix_detector_errors_total", "detector" => "face")
                    .increment(1);
                return Vec::new();
            }
        };

        located
            .into_iter()
            .map(|face| {
                let label = self
                    .gallery
                    .first_match(&face.encoding, self.tolerance)
                    .unwrap_or(UNKNOWN_LABEL);
                FaceMatch::new(face.region.scale(upscale), label)
            })
            .collect()
    }
}

impl std::fmt::Debug for FaceMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaceMatcher")
            .field("model", &self.model.name())
            .field("gallery", &self.gallery.len())
            .field("tolerance", &self.tolerance)
            .finish()
    }
}
