//! Motion differencing through OpenCV `imgproc`.

use image::GrayImage;
use opencv::core::{self, Mat, Point, Scalar, Vector, CV_8UC1};
use opencv::imgproc;
use opencv::prelude::*;

use phoenix_models::Region;

use super::cv_err;
use crate::error::MediaResult;
use crate::motion::MotionConfig;

fn gray_to_mat(image: &GrayImage) -> MediaResult<Mat> {
    let (width, height) = image.dimensions();
    let mut mat = Mat::new_rows_cols_with_default(height as i32, width as i32, CV_8UC1, Scalar::all(0.0))
        .map_err(cv_err("allocate mask"))?;
    mat.data_bytes_mut()
        .map_err(cv_err("mask buffer"))?
        .copy_from_slice(image.as_raw());
    Ok(mat)
}

/// Bounding boxes of external contours in the thresholded, dilated
/// difference of two blurred gray frames.
pub fn changed_regions(
    previous: &GrayImage,
    current: &GrayImage,
    config: &MotionConfig,
) -> MediaResult<Vec<Region>> {
    let previous = gray_to_mat(previous)?;
    let current = gray_to_mat(current)?;

    let mut diff = Mat::default();
    core::absdiff(&previous, &current, &mut diff).map_err(cv_err("motion absdiff"))?;

    let mut thresh = Mat::default();
    imgproc::threshold(
        &diff,
        &mut thresh,
        config.threshold as f64,
        255.0,
        imgproc::THRESH_BINARY,
    )
    .map_err(cv_err("motion threshold"))?;

    let mut dilated = Mat::default();
    imgproc::dilate(
        &thresh,
        &mut dilated,
        &Mat::default(),
        Point::new(-1, -1),
        config.dilate_iterations as i32,
        core::BORDER_CONSTANT,
        imgproc::morphology_default_border_value().map_err(cv_err("motion border"))?,
    )
    .map_err(cv_err("motion dilate"))?;

    let mut contours = Vector::<Vector<Point>>::new();
    imgproc::find_contours_def(
        &dilated,
        &mut contours,
        imgproc::RETR_EXTERNAL,
        imgproc::CHAIN_APPROX_SIMPLE,
    )
    .map_err(cv_err("motion contours"))?;

    let mut regions = Vec::new();
    for contour in contours.iter() {
        let area = imgproc::contour_area(&contour, false).map_err(cv_err("motion contour area"))?;
        if area < config.min_area {
            continue;
        }
        let rect = imgproc::bounding_rect(&contour).map_err(cv_err("motion bounding rect"))?;
        regions.push(Region::new(rect.x, rect.y, rect.width, rect.height));
    }
    Ok(regions)
}
