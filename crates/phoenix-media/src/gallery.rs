//! Known-identity gallery.
//!
//! Loaded once at startup and shared read-only between camera workers.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};
use crate::face::{FaceEncoding, FaceModel};
use crate::frame::Frame;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// One enrolled person.
#[derive(Debug, Clone, PartialEq)]
pub struct KnownIdentity {
    pub label: String,
    pub encoding: FaceEncoding,
}

impl KnownIdentity {
    pub fn new(label: impl Into<String>, encoding: FaceEncoding) -> Self {
        Self {
            label: label.into(),
            encoding,
        }
    }
}

/// Ordered collection of known identities.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Gallery {
    identities: Vec<KnownIdentity>,
}

impl Gallery {
    pub fn new(identities: Vec<KnownIdentity>) -> Self {
        Self { identities }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// Identities in load order.
    pub fn list(&self) -> &[KnownIdentity] {
        &self.identities
    }

    /// Label of the first identity, in load order, within `tolerance` of
    /// `encoding`.
    pub fn first_match(&self, encoding: &FaceEncoding, tolerance: f32) -> Option<&str> {
        self.identities
            .iter()
            .find(|known| known.encoding.distance(encoding) <= tolerance)
            .map(|known| known.label.as_str())
    }

    /// Enroll every image in `dir`, labelled by file stem.
    ///
    /// Files are visited in name order. Images in which the model finds no
    /// face are skipped with a warning; when several faces are found the
    /// first is used. A missing directory yields an empty gallery.
    pub fn load_dir(dir: &Path, model: &mut dyn FaceModel) -> MediaResult<Self> {
        if !dir.is_dir() {
            warn!(dir = %dir.display(), "Known faces directory not found, gallery is empty");
            return Ok(Self::empty());
        }

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if path.is_file() && is_image {
                paths.push(path);
            }
        }
        paths.sort();

        let mut identities = Vec::with_capacity(paths.len());
        for path in paths {
            let Some(label) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let image = match image::open(&path) {
                Ok(image) => image.to_rgb8(),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable gallery image");
                    continue;
                }
            };

            match model.locate_and_encode(&Frame::from_image(image)) {
                Ok(faces) => match faces.into_iter().next() {
                    Some(face) => {
                        debug!(label, "Enrolled known face");
                        identities.push(KnownIdentity::new(label, face.encoding));
                    }
                    None => warn!(path = %path.display(), "No face found in gallery image"),
                },
                Err(e @ MediaError::ModelNotFound(_)) => return Err(e),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Face encoding failed for gallery image")
                }
            }
        }

        info!(count = identities.len(), dir = %dir.display(), "Known faces loaded");
        Ok(Self::new(identities))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::LocatedFace;
    use phoenix_models::Region;

    fn enc(values: &[f32]) -> FaceEncoding {
        FaceEncoding::new(values.to_vec())
    }

    #[test]
    fn test_first_match_prefers_load_order() {
        let gallery = Gallery::new(vec![
            KnownIdentity::new("Ana", enc(&[0.0, 0.5])),
            KnownIdentity::new("Davi", enc(&[0.0, 0.0])),
        ]);
        // Davi is closer, but Ana is within tolerance and loaded first.
        assert_eq!(gallery.first_match(&enc(&[0.0, 0.0]), 0.6), Some("Ana"));
    }

    #[test]
    fn test_first_match_respects_tolerance() {
        let gallery = Gallery::new(vec![KnownIdentity::new("Ana", enc(&[1.0, 0.0]))]);
        assert_eq!(gallery.first_match(&enc(&[0.0, 0.0]), 0.6), None);
        assert_eq!(gallery.first_match(&enc(&[0.4, 0.0]), 0.6), Some("Ana"));
    }

    #[test]
    fn test_empty_gallery_matches_nothing() {
        assert_eq!(Gallery::empty().first_match(&enc(&[0.0]), 0.6), None);
    }

    /// Encodes each image as its top-left red value; images whose first
    /// pixel is black contain no face.
    struct RedChannelModel;

    impl FaceModel for RedChannelModel {
        fn name(&self) -> &'static str {
            "red"
        }

        fn locate_and_encode(&mut self, frame: &Frame) -> MediaResult<Vec<LocatedFace>> {
            let red = frame.as_image().get_pixel(0, 0).0[0];
            if red == 0 {
                return Ok(Vec::new());
            }
            Ok(vec![LocatedFace::new(
                Region::new(0, 0, frame.width() as i32, frame.height() as i32),
                FaceEncoding::new(vec![red as f32]),
            )])
        }
    }

    fn save(dir: &Path, name: &str, red: u8) {
        Frame::solid(4, 4, [red, 0, 0])
            .as_image()
            .save(dir.join(name))
            .unwrap();
    }

    #[test]
    fn test_load_dir_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        save(dir.path(), "zoe.png", 30);
        save(dir.path(), "ana.png", 10);
        save(dir.path(), "empty.png", 0);
        std::fs::write(dir.path().join("notes.txt"), "not an image").unwrap();

        let gallery = Gallery::load_dir(dir.path(), &mut RedChannelModel).unwrap();
        let labels: Vec<_> = gallery.list().iter().map(|k| k.label.as_str()).collect();
        assert_eq!(labels, vec!["ana", "zoe"]);
    }

    #[test]
    fn test_missing_dir_is_empty_gallery() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = Gallery::load_dir(&dir.path().join("nope"), &mut RedChannelModel).unwrap();
        assert!(gallery.is_empty());
    }
}
