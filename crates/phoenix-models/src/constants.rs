//! Processing constants shared across the pipeline.
//!
//! Values marked as defaults can be overridden through the worker
//! configuration; the rest are fixed properties of the detectors.

/// Default processing width. Every frame is normalized to this size.
pub const DEFAULT_FRAME_WIDTH: u32 = 640;
/// Default processing height.
pub const DEFAULT_FRAME_HEIGHT: u32 = 360;

/// Detection runs on every Nth tick.
pub const DEFAULT_SAMPLE_EVERY: u64 = 4;

/// Seconds a positive detection keeps being evaluated.
pub const DEFAULT_PERSISTENCE_SECS: f64 = 10.0;

/// Minimum seconds between two notifications for the same camera.
pub const DEFAULT_THROTTLE_SECS: f64 = 30.0;

/// Gaussian kernel edge for the motion blur (21x21).
pub const MOTION_BLUR_KERNEL: u32 = 21;
/// Pixel intensity delta (0-255) above which a pixel counts as changed.
pub const MOTION_DIFF_THRESHOLD: u8 = 25;
/// Dilation passes (3x3) applied to the thresholded difference.
pub const MOTION_DILATE_ITERATIONS: usize = 2;
/// Contours enclosing less than this many px² are discarded.
pub const MOTION_MIN_CONTOUR_AREA: f64 = 1000.0;

/// Frames are shrunk by this factor on each axis before face localization.
pub const FACE_DOWNSCALE: f32 = 0.25;
/// Default maximum encoding distance for an identity match.
pub const DEFAULT_FACE_TOLERANCE: f32 = 0.6;

/// Default frame rate of recorded episodes.
pub const DEFAULT_RECORDING_FPS: f64 = 10.0;
/// Container extension for recorded episodes.
pub const RECORDING_EXTENSION: &str = "avi";
/// Timestamp layout used in recording file names.
pub const RECORDING_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Padding in pixels around the box drawn for a pose.
pub const POSE_BOX_PADDING: i32 = 10;

/// Status label shown while suspicious activity is ongoing.
pub const ALERT_LABEL: &str = "ALERT: SUSPICIOUS ACTIVITY";
/// Status label shown otherwise.
pub const MONITORING_LABEL: &str = "MONITORING";
/// Status label shown when a camera source is unavailable.
pub const NO_SIGNAL_LABEL: &str = "ERROR: NO SIGNAL";

/// Text sent with every alert notification.
pub const ALERT_MESSAGE: &str = "ALARM! Suspicious activity detected.";
