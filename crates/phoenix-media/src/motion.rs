//! Frame-differencing motion detection.
//!
//! Each frame is converted to gray, blurred, and compared against the
//! previous one. Changed pixels are thresholded, dilated, and grouped into
//! external contours; contours enclosing a large enough area are reported as
//! motion boxes.

use image::{imageops, GrayImage};
use tracing::{debug, warn};

use phoenix_models::constants::{
    MOTION_BLUR_KERNEL, MOTION_DIFF_THRESHOLD, MOTION_DILATE_ITERATIONS, MOTION_MIN_CONTOUR_AREA,
};
use phoenix_models::Region;

use crate::frame::Frame;

/// Tuning for [`MotionDetector`].
#[derive(Debug, Clone, PartialEq)]
pub struct MotionConfig {
    /// Gaussian sigma applied before differencing
    pub blur_sigma: f32,
    /// A pixel counts as changed when its delta is strictly above this
    pub threshold: u8,
    /// 3x3 dilation passes over the changed-pixel mask
    pub dilate_iterations: usize,
    /// Smallest contour area reported, in px²
    pub min_area: f64,
}

impl MotionConfig {
    /// Sigma of a Gaussian with the given odd kernel edge, using the usual
    /// `0.3 * ((k - 1) / 2 - 1) + 0.8` relation.
    pub fn sigma_for_kernel(kernel: u32) -> f32 {
        0.3 * ((kernel as f32 - 1.0) * 0.5 - 1.0) + 0.8
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            blur_sigma: Self::sigma_for_kernel(MOTION_BLUR_KERNEL),
            threshold: MOTION_DIFF_THRESHOLD,
            dilate_iterations: MOTION_DILATE_ITERATIONS,
            min_area: MOTION_MIN_CONTOUR_AREA,
        }
    }
}

/// Stateful motion detector. Holds the previous blurred frame.
#[derive(Debug, Default)]
pub struct MotionDetector {
    previous: Option<GrayImage>,
    config: MotionConfig,
}

impl MotionDetector {
    pub fn new(config: MotionConfig) -> Self {
        Self {
            previous: None,
            config,
        }
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    /// Compare `frame` with the previous call's frame and return the boxes
    /// of regions that changed.
    ///
    /// The first call only stores a baseline and returns nothing. The stored
    /// frame is replaced on every call.
    pub fn detect(&mut self, frame: &Frame) -> Vec<Region> {
        let gray = frame.to_gray();
        let current = imageops::blur(&gray, self.config.blur_sigma);

        let regions = match self.previous.take() {
            None => Vec::new(),
            Some(previous) if previous.dimensions() != current.dimensions() => {
                debug!(
                    from = ?previous.dimensions(),
                    to = ?current.dimensions(),
                    "Frame size changed, motion baseline reset"
                );
                Vec::new()
            }
            Some(previous) => self.changed_regions(&previous, &current),
        };

        self.previous = Some(current);
        regions
    }

    fn changed_regions(&self, previous: &GrayImage, current: &GrayImage) -> Vec<Region> {
        #[cfg(feature = "opencv")]
        let regions = crate::backends::opencv_motion::changed_regions(previous, current, &self.config);
        #[cfg(not(feature = "opencv"))]
        let regions = raster_changed_regions(previous, current, &self.config);

        regions.unwrap_or_else(|e| {
            warn!(error = %e, "Motion differencing failed, frame treated as still");
            Vec::new()
        })
    }
}

/// Difference, threshold, dilate and external contours with `imageproc`.
#[cfg(not(feature = "opencv"))]
fn raster_changed_regions(
    previous: &GrayImage,
    current: &GrayImage,
    config: &MotionConfig,
) -> crate::error::MediaResult<Vec<Region>> {
    use image::Luma;
    use imageproc::contours::{find_contours, BorderType};
    use imageproc::contrast::threshold;
    use imageproc::distance_transform::Norm;
    use imageproc::map::map_colors2;
    use imageproc::morphology::dilate;

    let diff = map_colors2(previous, current, |a: Luma<u8>, b: Luma<u8>| {
        Luma([a[0].abs_diff(b[0])])
    });
    let mut mask = threshold(&diff, config.threshold);
    if config.dilate_iterations > 0 {
        // k passes of a 3x3 square equal one L-inf dilation of radius k
        let radius = config.dilate_iterations.min(u8::MAX as usize) as u8;
        mask = dilate(&mask, Norm::LInf, radius);
    }

    Ok(find_contours::<i32>(&mask)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter(|c| polygon_area(&c.points) >= config.min_area)
        .filter_map(|c| bounding_region(&c.points))
        .collect())
}

/// Shoelace area of a closed contour.
#[cfg(not(feature = "opencv"))]
fn polygon_area(points: &[imageproc::point::Point<i32>]) -> f64 {
    let twice: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();
    twice.abs() as f64 / 2.0
}

/// Inclusive pixel bounds of a contour, as `boundingRect` reports them.
#[cfg(not(feature = "opencv"))]
fn bounding_region(points: &[imageproc::point::Point<i32>]) -> Option<Region> {
    let min_x = points.iter().map(|p| p.x).min()?;
    let max_x = points.iter().map(|p| p.x).max()?;
    let min_y = points.iter().map(|p| p.y).min()?;
    let max_y = points.iter().map(|p| p.y).max()?;
    Some(Region::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
}
