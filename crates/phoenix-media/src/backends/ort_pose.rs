//! YOLOv8-pose through ONNX Runtime.

use std::path::Path;

use image::{imageops, Rgb, RgbImage};
use ndarray::ArrayView2;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::info;

use phoenix_models::{Keypoints, Point2};

use crate::error::{MediaError, MediaResult};
use crate::frame::Frame;
use crate::pose::PoseModel;

/// Rows per candidate: 4 box + 1 score + 17 * (x, y, visibility).
const FEATURES: usize = 5 + Keypoints::COUNT * 3;

#[derive(Debug, Clone)]
pub struct OrtPoseConfig {
    pub input_size: u32,
    pub confidence_threshold: f32,
    pub nms_threshold: f32,
    /// Keypoints below this visibility are reported as (0, 0)
    pub keypoint_threshold: f32,
}

impl Default for OrtPoseConfig {
    fn default() -> Self {
        Self {
            input_size: 640,
            confidence_threshold: 0.5,
            nms_threshold: 0.45,
            keypoint_threshold: 0.5,
        }
    }
}

/// Letterbox geometry mapping model space back to frame space.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Letterbox {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
}

impl Letterbox {
    fn new(width: u32, height: u32, size: u32) -> Self {
        let scale = (size as f32 / width as f32).min(size as f32 / height as f32);
        let new_w = (width as f32 * scale).round();
        let new_h = (height as f32 * scale).round();
        Self {
            scale,
            pad_x: ((size as f32 - new_w) / 2.0).floor(),
            pad_y: ((size as f32 - new_h) / 2.0).floor(),
        }
    }

    fn to_frame(&self, x: f32, y: f32) -> Point2 {
        Point2::new((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

struct Candidate {
    score: f32,
    /// x1, y1, x2, y2 in model space
    bbox: [f32; 4],
    keypoints: Keypoints,
}

pub struct OrtPoseModel {
    session: Session,
    config: OrtPoseConfig,
}

impl OrtPoseModel {
    pub fn load(model_path: &Path, config: OrtPoseConfig) -> MediaResult<Self> {
        if !model_path.exists() {
            return Err(MediaError::model_not_found(model_path.display().to_string()));
        }

        let session = Session::builder()
            .map_err(|e| MediaError::detection_failed(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| MediaError::detection_failed(format!("Failed to set optimization level: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| MediaError::detection_failed(format!("Failed to load ONNX model: {}", e)))?;

        info!(model_path = %model_path.display(), input_size = config.input_size, "Pose model loaded");
        Ok(Self { session, config })
    }

    fn preprocess(&self, frame: &Frame) -> MediaResult<(Value, Letterbox)> {
        let size = self.config.input_size;
        let letterbox = Letterbox::new(frame.width(), frame.height(), size);
        let new_w = ((frame.width() as f32 * letterbox.scale).round() as u32).max(1);
        let new_h = ((frame.height() as f32 * letterbox.scale).round() as u32).max(1);

        let resized = imageops::resize(frame.as_image(), new_w, new_h, imageops::FilterType::Triangle);
        let mut canvas = RgbImage::from_pixel(size, size, Rgb([114, 114, 114]));
        imageops::replace(&mut canvas, &resized, letterbox.pad_x as i64, letterbox.pad_y as i64);

        let side = size as usize;
        let mut chw = Vec::with_capacity(3 * side * side);
        for c in 0..3 {
            for pixel in canvas.pixels() {
                chw.push(pixel[c] as f32 / 255.0);
            }
        }

        let tensor = Tensor::from_array((vec![1usize, 3, side, side], chw.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| MediaError::detection_failed(format!("Failed to create tensor: {}", e)))?;
        Ok((tensor, letterbox))
    }

    fn decode(&self, output: &[f32], letterbox: Letterbox) -> MediaResult<Vec<Keypoints>> {
        if output.is_empty() || output.len() % FEATURES != 0 {
            return Err(MediaError::detection_failed(format!(
                "Unexpected pose output size {}",
                output.len()
            )));
        }
        let anchors = output.len() / FEATURES;
        let rows = ArrayView2::from_shape((FEATURES, anchors), output)
            .map_err(|e| MediaError::detection_failed(format!("Failed to reshape output: {}", e)))?;

        let mut candidates = Vec::new();
        for i in 0..anchors {
            let score = rows[[4, i]];
            if score < self.config.confidence_threshold {
                continue;
            }
            let (cx, cy, w, h) = (rows[[0, i]], rows[[1, i]], rows[[2, i]], rows[[3, i]]);

            let points = (0..Keypoints::COUNT)
                .map(|k| {
                    let base = 5 + k * 3;
                    if rows[[base + 2, i]] < self.config.keypoint_threshold {
                        Point2::new(0.0, 0.0)
                    } else {
                        letterbox.to_frame(rows[[base, i]], rows[[base + 1, i]])
                    }
                })
                .collect();

            candidates.push(Candidate {
                score,
                bbox: [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
                keypoints: Keypoints::new(points),
            });
        }

        Ok(non_maximum_suppression(candidates, self.config.nms_threshold))
    }
}

impl PoseModel for OrtPoseModel {
    fn name(&self) -> &'static str {
        "yolov8-pose"
    }

    fn detect_poses(&mut self, frame: &Frame) -> MediaResult<Vec<Keypoints>> {
        let (input, letterbox) = self.preprocess(frame)?;
        let outputs = self
            .session
            .run(ort::inputs![input])
            .map_err(|e| MediaError::detection_failed(format!("ONNX inference failed: {}", e)))?;
        let output = outputs
            .get("output0")
            .ok_or_else(|| MediaError::detection_failed("Missing output0 tensor"))?;
        let (_, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| MediaError::detection_failed(format!("Failed to extract tensor: {}", e)))?;
        let data: Vec<f32> = data.to_vec();
        drop(outputs);

        self.decode(&data, letterbox)
    }
}

fn non_maximum_suppression(mut candidates: Vec<Candidate>, threshold: f32) -> Vec<Keypoints> {
    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    let mut kept: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if kept.iter().all(|k| iou(&k.bbox, &candidate.bbox) <= threshold) {
            kept.push(candidate);
        }
    }
    kept.into_iter().map(|c| c.keypoints).collect()
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let inter_w = (a[2].min(b[2]) - a[0].max(b[0])).max(0.0);
    let inter_h = (a[3].min(b[3]) - a[1].max(b[1])).max(0.0);
    let intersection = inter_w * inter_h;
    let union = (a[2] - a[0]) * (a[3] - a[1]) + (b[2] - b[0]) * (b[3] - b[1]) - intersection;
    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letterbox_wide_frame() {
        let lb = Letterbox::new(640, 360, 640);
        assert_eq!(lb.scale, 1.0);
        assert_eq!(lb.pad_x, 0.0);
        assert_eq!(lb.pad_y, 140.0);
        assert_eq!(lb.to_frame(100.0, 240.0), Point2::new(100.0, 100.0));
    }

    #[test]
    fn test_iou() {
        let a = [0.0, 0.0, 10.0, 10.0];
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
        assert_eq!(iou(&a, &[20.0, 20.0, 30.0, 30.0]), 0.0);
    }

    #[test]
    fn test_nms_keeps_highest_score() {
        let make = |score, x: f32| Candidate {
            score,
            bbox: [x, 0.0, x + 10.0, 10.0],
            keypoints: Keypoints::new(vec![Point2::new(x, score)]),
        };
        let kept = non_maximum_suppression(vec![make(0.6, 0.0), make(0.9, 1.0), make(0.8, 50.0)], 0.45);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].points[0], Point2::new(1.0, 0.9));
    }
}
