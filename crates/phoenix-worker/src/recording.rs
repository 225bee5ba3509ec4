//! Per-episode recording lifecycle.
//!
//! A session is opened on the first alert tick of an episode and closed on
//! the first monitoring tick after it. Recording failures never reach the
//! tick loop: the rest of the episode simply goes unrecorded.

use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::warn;

use phoenix_media::{numbered_file_name, recording_file_name, Frame, RecorderBackend, VideoSink};
use phoenix_models::AlertState;

use crate::logging::CameraLogger;
use crate::metrics::names;

struct RecordingSession {
    sink: Box<dyn VideoSink>,
    frames: u64,
}

/// Opens, feeds and closes one camera's recording sessions.
pub struct RecordingController {
    backend: Box<dyn RecorderBackend>,
    session: Option<RecordingSession>,
    videos_dir: PathBuf,
    width: u32,
    height: u32,
    fps: f64,
    /// Set when this episode failed to record
    episode_failed: bool,
    /// Second-resolution name of the last episode and its collision count
    last_name: Option<(PathBuf, u32)>,
    logger: CameraLogger,
}

impl RecordingController {
    pub fn new(
        backend: Box<dyn RecorderBackend>,
        videos_dir: impl Into<PathBuf>,
        (width, height): (u32, u32),
        fps: f64,
        logger: CameraLogger,
    ) -> Self {
        Self {
            backend,
            session: None,
            videos_dir: videos_dir.into(),
            width,
            height,
            fps,
            episode_failed: false,
            last_name: None,
            logger,
        }
    }

    /// Apply one tick's state.
    pub fn on_tick(&mut self, state: AlertState, frame: &Frame) {
        match state {
            AlertState::Alert => self.record(frame),
            AlertState::Monitoring => {
                self.close();
                self.episode_failed = false;
            }
        }
    }

    /// Path of the open session's file.
    pub fn current_path(&self) -> Option<&Path> {
        self.session.as_ref().map(|s| s.sink.path())
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    /// Flush and close the open session, if any.
    pub fn close(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        let path = session.sink.path().to_path_buf();
        match session.sink.finish() {
            Ok(()) => self.logger.log_recording_stopped(&path, session.frames),
            Err(e) => warn!(camera = %self.logger.camera(), path = %path.display(), error = %e, "Recording did not close cleanly"),
        }
    }

    fn record(&mut self, frame: &Frame) {
        if self.episode_failed {
            return;
        }

        if self.session.is_none() {
            let path = self.next_path();
            match self.backend.open(&path, self.width, self.height, self.fps) {
                Ok(sink) => {
                    self.logger.log_recording_started(sink.path());
                    metrics::counter!(names::RECORDINGS_STARTED_TOTAL).increment(1);
                    self.session = Some(RecordingSession { sink, frames: 0 });
                }
                Err(e) => {
                    warn!(camera = %self.logger.camera(), path = %path.display(), error = %e, "Failed to open recording, episode will not be recorded");
                    self.episode_failed = true;
                    return;
                }
            }
        }

        let failed = match self.session.as_mut() {
            Some(session) => match session.sink.write(frame) {
                Ok(()) => {
                    session.frames += 1;
                    false
                }
                Err(e) => {
                    warn!(camera = %self.logger.camera(), path = %session.sink.path().display(), error = %e, "Recording write failed, stopping this episode's recording");
                    true
                }
            },
            None => false,
        };
        if failed {
            self.close();
            self.episode_failed = true;
        }
    }
}

impl RecordingController {
    /// File for a new episode. Episodes starting within the same second, or
    /// whose name is already taken on disk, get a `_N` suffix.
    fn next_path(&mut self) -> PathBuf {
        let base = recording_file_name(&self.videos_dir, self.logger.camera(), Local::now());
        let mut n = match &self.last_name {
            Some((last, count)) if *last == base => count + 1,
            _ => 0,
        };
        let mut path = numbered_file_name(&base, n);
        while path.exists() {
            n += 1;
            path = numbered_file_name(&base, n);
        }
        self.last_name = Some((base, n));
        path
    }
}

impl Drop for RecordingController {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for RecordingController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingController")
            .field("videos_dir", &self.videos_dir)
            .field("recording", &self.current_path())
            .field("episode_failed", &self.episode_failed)
            .finish()
    }
}
