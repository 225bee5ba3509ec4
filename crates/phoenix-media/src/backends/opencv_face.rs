//! YuNet face localization with SFace encodings, through OpenCV.

use std::path::Path;

use opencv::core::{Mat, Ptr, Scalar, Size, CV_8UC3};
use opencv::dnn::{DNN_BACKEND_DEFAULT, DNN_TARGET_CPU};
use opencv::imgproc;
use opencv::objdetect::{FaceDetectorYN, FaceRecognizerSF};
use opencv::prelude::*;
use tracing::info;

use phoenix_models::Region;

use super::cv_err;
use crate::error::{MediaError, MediaResult};
use crate::face::{FaceEncoding, FaceModel, LocatedFace};
use crate::frame::Frame;

const SCORE_THRESHOLD: f32 = 0.6;
const NMS_THRESHOLD: f32 = 0.3;
const TOP_K: i32 = 50;

/// Copy an RGB frame into a BGR `Mat`.
fn frame_to_bgr(frame: &Frame) -> MediaResult<Mat> {
    let mut rgb = Mat::new_rows_cols_with_default(
        frame.height() as i32,
        frame.width() as i32,
        CV_8UC3,
        Scalar::all(0.0),
    )
    .map_err(cv_err("allocate frame"))?;
    rgb.data_bytes_mut()
        .map_err(cv_err("frame buffer"))?
        .copy_from_slice(frame.as_raw());

    let mut bgr = Mat::default();
    imgproc::cvt_color(
        &rgb,
        &mut bgr,
        imgproc::COLOR_RGB2BGR,
        0,
        opencv::core::AlgorithmHint::ALGO_HINT_DEFAULT,
    )
    .map_err(cv_err("rgb2bgr"))?;
    Ok(bgr)
}

pub struct OpenCvFaceModel {
    detector: Ptr<FaceDetectorYN>,
    recognizer: Ptr<FaceRecognizerSF>,
    input_size: Size,
}

impl OpenCvFaceModel {
    pub fn load(detector_path: &Path, recognizer_path: &Path) -> MediaResult<Self> {
        for path in [detector_path, recognizer_path] {
            if !path.exists() {
                return Err(MediaError::model_not_found(path.display().to_string()));
            }
        }

        let input_size = Size::new(320, 320);
        let detector = FaceDetectorYN::create(
            &detector_path.to_string_lossy(),
            "",
            input_size,
            SCORE_THRESHOLD,
            NMS_THRESHOLD,
            TOP_K,
            DNN_BACKEND_DEFAULT,
            DNN_TARGET_CPU,
        )
        .map_err(cv_err("create YuNet"))?;
        let recognizer = FaceRecognizerSF::create(
            &recognizer_path.to_string_lossy(),
            "",
            DNN_BACKEND_DEFAULT,
            DNN_TARGET_CPU,
        )
        .map_err(cv_err("create SFace"))?;

        info!(
            detector = %detector_path.display(),
            recognizer = %recognizer_path.display(),
            "Face models loaded"
        );
        Ok(Self {
            detector,
            recognizer,
            input_size,
        })
    }
}

impl FaceModel for OpenCvFaceModel {
    fn name(&self) -> &'static str {
        "yunet-sface"
    }

    fn locate_and_encode(&mut self, frame: &Frame) -> MediaResult<Vec<LocatedFace>> {
        let bgr = frame_to_bgr(frame)?;
        let size = Size::new(frame.width() as i32, frame.height() as i32);
        if size != self.input_size {
            self.detector.set_input_size(size).map_err(cv_err("YuNet input size"))?;
            self.input_size = size;
        }

        let mut faces = Mat::default();
        self.detector.detect(&bgr, &mut faces).map_err(cv_err("YuNet detect"))?;

        let mut located = Vec::with_capacity(faces.rows().max(0) as usize);
        for i in 0..faces.rows() {
            let row = faces.row(i).map_err(cv_err("YuNet row"))?;
            let x = *faces.at_2d::<f32>(i, 0).map_err(cv_err("YuNet box"))?;
            let y = *faces.at_2d::<f32>(i, 1).map_err(cv_err("YuNet box"))?;
            let w = *faces.at_2d::<f32>(i, 2).map_err(cv_err("YuNet box"))?;
            let h = *faces.at_2d::<f32>(i, 3).map_err(cv_err("YuNet box"))?;
            if w <= 0.0 || h <= 0.0 {
                continue;
            }

            let mut aligned = Mat::default();
            self.recognizer
                .align_crop(&bgr, &row, &mut aligned)
                .map_err(cv_err("SFace align"))?;
            let mut feature = Mat::default();
            self.recognizer
                .feature(&aligned, &mut feature)
                .map_err(cv_err("SFace feature"))?;
            let values = feature
                .data_typed::<f32>()
                .map_err(cv_err("SFace feature data"))?
                .to_vec();

            let region = Region::new(x.round() as i32, y.round() as i32, w.round() as i32, h.round() as i32)
                .clamp(frame.width(), frame.height());
            located.push(LocatedFace::new(region, FaceEncoding::new(normalize(values))));
        }

        Ok(located)
    }
}

/// Scale to unit length so Euclidean distances fall in [0, 2].
fn normalize(mut values: Vec<f32>) -> Vec<f32> {
    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        values.iter_mut().for_each(|v| *v /= norm);
    }
    values
}
