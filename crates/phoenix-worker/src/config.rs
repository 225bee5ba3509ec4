//! Worker configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use phoenix_media::SourceSpec;
use phoenix_models::constants::{
    DEFAULT_FACE_TOLERANCE, DEFAULT_FRAME_HEIGHT, DEFAULT_FRAME_WIDTH, DEFAULT_PERSISTENCE_SECS,
    DEFAULT_RECORDING_FPS, DEFAULT_SAMPLE_EVERY, DEFAULT_THROTTLE_SECS,
};

use crate::error::{WorkerError, WorkerResult};

/// Camera list used when `PHOENIX_CAMERAS` is unset.
pub const DEFAULT_CAMERAS: &str = "Camera1=0";

/// One configured camera.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraConfig {
    /// Display name, also the recording and snapshot file prefix
    pub name: String,
    pub source: SourceSpec,
}

impl CameraConfig {
    pub fn new(name: impl Into<String>, source: SourceSpec) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }
}

/// Parse a comma-separated `name=source` list.
///
/// Names must be unique since they partition the output directories.
pub fn parse_cameras(raw: &str) -> WorkerResult<Vec<CameraConfig>> {
    let mut cameras: Vec<CameraConfig> = Vec::new();

    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (name, source) = entry
            .split_once('=')
            .ok_or_else(|| WorkerError::config_error(format!("camera entry '{}' is not name=source", entry)))?;
        let name = name.trim();
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(WorkerError::config_error(format!("invalid camera name '{}'", name)));
        }
        if cameras.iter().any(|c| c.name == name) {
            return Err(WorkerError::config_error(format!("duplicate camera name '{}'", name)));
        }
        let source = SourceSpec::parse(source)
            .map_err(|e| WorkerError::config_error(format!("camera '{}': {}", name, e)))?;
        cameras.push(CameraConfig::new(name, source));
    }

    if cameras.is_empty() {
        return Err(WorkerError::config_error("no cameras configured"));
    }
    Ok(cameras)
}

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub cameras: Vec<CameraConfig>,
    /// Processing resolution every frame is normalized to
    pub frame_width: u32,
    pub frame_height: u32,
    /// Detection runs on every Nth tick
    pub sample_every: u64,
    /// How long a positive detection keeps being evaluated
    pub persistence_window: Duration,
    /// Minimum spacing between two notifications for one camera
    pub throttle_window: Duration,
    pub face_tolerance: f32,
    pub videos_dir: PathBuf,
    pub snapshots_dir: PathBuf,
    pub known_faces_dir: PathBuf,
    pub recording_fps: f64,
    pub events_path: PathBuf,
    /// Longest wait for a single frame
    pub read_timeout: Duration,
    /// Read retries before a camera is reported as having no signal
    pub source_max_retries: u32,
    pub pose_model: Option<PathBuf>,
    pub face_detector_model: Option<PathBuf>,
    pub face_recognizer_model: Option<PathBuf>,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    /// Prometheus listen address, metrics are not exported when unset
    pub metrics_addr: Option<String>,
    /// Capacity of the alert hand-off queue
    pub alert_queue_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            cameras: vec![CameraConfig::new("Camera1", SourceSpec::Device(0))],
            frame_width: DEFAULT_FRAME_WIDTH,
            frame_height: DEFAULT_FRAME_HEIGHT,
            sample_every: DEFAULT_SAMPLE_EVERY,
            persistence_window: Duration::from_secs_f64(DEFAULT_PERSISTENCE_SECS),
            throttle_window: Duration::from_secs_f64(DEFAULT_THROTTLE_SECS),
            face_tolerance: DEFAULT_FACE_TOLERANCE,
            videos_dir: PathBuf::from("videos"),
            snapshots_dir: PathBuf::from("assets"),
            known_faces_dir: PathBuf::from("rostos_conhecidos"),
            recording_fps: DEFAULT_RECORDING_FPS,
            events_path: PathBuf::from("events.jsonl"),
            read_timeout: Duration::from_secs(5),
            source_max_retries: 5,
            pose_model: None,
            face_detector_model: None,
            face_recognizer_model: None,
            telegram_bot_token: None,
            telegram_chat_id: None,
            metrics_addr: None,
            alert_queue_capacity: 32,
        }
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

/// Seconds as a `Duration`, rejecting negative and non-finite values.
fn duration_secs(key: &str, secs: f64) -> WorkerResult<Duration> {
    Duration::try_from_secs_f64(secs)
        .map_err(|e| WorkerError::config_error(format!("{} must be a non-negative number of seconds: {}", key, e)))
}

fn env_secs(key: &str, default: f64) -> WorkerResult<Duration> {
    duration_secs(key, env_parse(key, default))
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty())
}

fn env_path(key: &str, default: PathBuf) -> PathBuf {
    env_string(key).map(PathBuf::from).unwrap_or(default)
}

impl WorkerConfig {
    /// Create config from environment variables.
    ///
    /// Unparseable numbers fall back to their defaults. A malformed camera
    /// list or a negative or non-finite window is an error.
    pub fn from_env() -> WorkerResult<Self> {
        let defaults = Self::default();
        let cameras = parse_cameras(&std::env::var("PHOENIX_CAMERAS").unwrap_or_else(|_| DEFAULT_CAMERAS.to_string()))?;

        let config = Self {
            cameras,
            frame_width: env_parse("PHOENIX_FRAME_WIDTH", defaults.frame_width),
            frame_height: env_parse("PHOENIX_FRAME_HEIGHT", defaults.frame_height),
            sample_every: env_parse("PHOENIX_SAMPLE_EVERY", defaults.sample_every),
            persistence_window: env_secs("PHOENIX_PERSISTENCE_SECS", DEFAULT_PERSISTENCE_SECS)?,
            throttle_window: env_secs("PHOENIX_THROTTLE_SECS", DEFAULT_THROTTLE_SECS)?,
            face_tolerance: env_parse("PHOENIX_FACE_TOLERANCE", defaults.face_tolerance),
            videos_dir: env_path("PHOENIX_VIDEOS_DIR", defaults.videos_dir),
            snapshots_dir: env_path("PHOENIX_SNAPSHOTS_DIR", defaults.snapshots_dir),
            known_faces_dir: env_path("PHOENIX_KNOWN_FACES_DIR", defaults.known_faces_dir),
            recording_fps: env_parse("PHOENIX_RECORDING_FPS", defaults.recording_fps),
            events_path: env_path("PHOENIX_EVENTS_PATH", defaults.events_path),
            read_timeout: Duration::from_secs(env_parse("PHOENIX_READ_TIMEOUT_SECS", 5)),
            source_max_retries: env_parse("PHOENIX_SOURCE_MAX_RETRIES", defaults.source_max_retries),
            pose_model: env_string("PHOENIX_POSE_MODEL").map(PathBuf::from),
            face_detector_model: env_string("PHOENIX_FACE_DETECTOR_MODEL").map(PathBuf::from),
            face_recognizer_model: env_string("PHOENIX_FACE_RECOGNIZER_MODEL").map(PathBuf::from),
            telegram_bot_token: env_string("TELEGRAM_BOT_TOKEN"),
            telegram_chat_id: env_string("TELEGRAM_CHAT_ID"),
            metrics_addr: env_string("METRICS_ADDR"),
            alert_queue_capacity: env_parse("PHOENIX_ALERT_QUEUE", defaults.alert_queue_capacity),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> WorkerResult<()> {
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(WorkerError::config_error("frame size must be non-zero"));
        }
        if self.sample_every == 0 {
            return Err(WorkerError::config_error("PHOENIX_SAMPLE_EVERY must be at least 1"));
        }
        if !(self.recording_fps.is_finite() && self.recording_fps > 0.0) {
            return Err(WorkerError::config_error("PHOENIX_RECORDING_FPS must be positive"));
        }
        Ok(())
    }

    /// Telegram credentials, when both are set.
    pub fn telegram(&self) -> Option<(&str, &str)> {
        match (&self.telegram_bot_token, &self.telegram_chat_id) {
            (Some(token), Some(chat)) => Some((token.as_str(), chat.as_str())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cameras() {
        let cameras = parse_cameras("Front=0, Back=rtsp://10.0.0.2/stream ,Lobby=clips/lobby.mp4").unwrap();
        assert_eq!(
            cameras,
            vec![
                CameraConfig::new("Front", SourceSpec::Device(0)),
                CameraConfig::new("Back", SourceSpec::Url("rtsp://10.0.0.2/stream".into())),
                CameraConfig::new("Lobby", SourceSpec::Path(PathBuf::from("clips/lobby.mp4"))),
            ]
        );
    }

    #[test]
    fn test_parse_cameras_rejects_bad_entries() {
        assert!(parse_cameras("").is_err());
        assert!(parse_cameras("Front").is_err());
        assert!(parse_cameras("=0").is_err());
        assert!(parse_cameras("a/b=0").is_err());
        assert!(parse_cameras("Front=0,Front=1").is_err());
        assert!(parse_cameras("Front=").is_err());
    }

    #[test]
    fn test_default_config() {
        let config = WorkerConfig::default();
        assert_eq!((config.frame_width, config.frame_height), (640, 360));
        assert_eq!(config.sample_every, 4);
        assert_eq!(config.persistence_window, Duration::from_secs(10));
        assert_eq!(config.throttle_window, Duration::from_secs(30));
        assert!(config.validate().is_ok());
        assert!(config.telegram().is_none());
    }

    #[test]
    fn test_window_seconds_must_be_finite_and_non_negative() {
        assert_eq!(duration_secs("W", 2.5).unwrap(), Duration::from_millis(2500));
        assert_eq!(duration_secs("W", 0.0).unwrap(), Duration::ZERO);
        assert!(duration_secs("W", -1.0).is_err());
        assert!(duration_secs("W", f64::NAN).is_err());
        assert!(duration_secs("W", f64::INFINITY).is_err());
    }

    #[test]
    fn test_from_env_rejects_negative_persistence() {
        std::env::set_var("PHOENIX_PERSISTENCE_SECS", "-1");
        let result = WorkerConfig::from_env();
        std::env::remove_var("PHOENIX_PERSISTENCE_SECS");
        assert!(matches!(result, Err(WorkerError::ConfigError(_))));
    }

    #[test]
    fn test_validate_rejects_zero_sampling() {
        let config = WorkerConfig {
            sample_every: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
