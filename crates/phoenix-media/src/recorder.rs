//! Recording sinks for alert episodes.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Stdio};

use chrono::{DateTime, Local};
use tracing::{debug, info, warn};

use phoenix_models::constants::{RECORDING_EXTENSION, RECORDING_TIMESTAMP_FORMAT};

use crate::command::{FfmpegCommand, PIPE};
use crate::error::{MediaError, MediaResult};
use crate::frame::Frame;

/// File name for an episode starting at `started`:
/// `{dir}/{camera}_{%Y-%m-%d_%H-%M-%S}.avi`.
pub fn recording_file_name(dir: &Path, camera: &str, started: DateTime<Local>) -> PathBuf {
    dir.join(format!(
        "{}_{}.{}",
        camera,
        started.format(RECORDING_TIMESTAMP_FORMAT),
        RECORDING_EXTENSION
    ))
}

/// `path` with `_{n}` appended to its stem. `n == 0` leaves it unchanged.
pub fn numbered_file_name(path: &Path, n: u32) -> PathBuf {
    if n == 0 {
        return path.to_path_buf();
    }
    let stem = path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, n, ext.to_string_lossy()),
        None => format!("{}_{}", stem, n),
    };
    path.with_file_name(name)
}

/// An open video file accepting frames.
pub trait VideoSink: Send {
    fn path(&self) -> &Path;

    /// Append one frame. Frames of another size are resized to the sink's.
    fn write(&mut self, frame: &Frame) -> MediaResult<()>;

    /// Flush and close. Further writes fail.
    fn finish(&mut self) -> MediaResult<()>;
}

/// Opens video sinks.
pub trait RecorderBackend: Send {
    fn open(&mut self, path: &Path, width: u32, height: u32, fps: f64) -> MediaResult<Box<dyn VideoSink>>;
}

/// Encodes MPEG-4 Part 2 (`XVID`) AVI files through an `ffmpeg` child.
#[derive(Debug, Clone)]
pub struct FfmpegRecorder {
    codec: String,
    tag: String,
}

impl Default for FfmpegRecorder {
    fn default() -> Self {
        Self {
            codec: "mpeg4".to_string(),
            tag: "XVID".to_string(),
        }
    }
}

impl FfmpegRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn command(&self, path: &Path, width: u32, height: u32, fps: f64) -> FfmpegCommand {
        FfmpegCommand::new(PIPE, path.to_string_lossy())
            .rawvideo_input(width, height, fps)
            .video_codec(self.codec.clone())
            .video_tag(self.tag.clone())
            .quality(5)
    }
}

impl RecorderBackend for FfmpegRecorder {
    fn open(&mut self, path: &Path, width: u32, height: u32, fps: f64) -> MediaResult<Box<dyn VideoSink>> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let mut child = self
            .command(path, width, height, fps)
            .spawn(Stdio::piped(), Stdio::null())?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| MediaError::recording_failed("ffmpeg stdin not captured"))?;

        info!(path = %path.display(), width, height, fps, "Recording started");
        Ok(Box::new(FfmpegVideoSink {
            path: path.to_path_buf(),
            width,
            height,
            child: Some(child),
            stdin: Some(stdin),
            frames: 0,
        }))
    }
}

/// Sink backed by an encoder process reading rawvideo on stdin.
pub struct FfmpegVideoSink {
    path: PathBuf,
    width: u32,
    height: u32,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    frames: u64,
}

impl VideoSink for FfmpegVideoSink {
    fn path(&self) -> &Path {
        &self.path
    }

    fn write(&mut self, frame: &Frame) -> MediaResult<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| MediaError::recording_failed(format!("{} is closed", self.path.display())))?;

        if frame.dimensions() == (self.width, self.height) {
            stdin.write_all(frame.as_raw())?;
        } else {
            stdin.write_all(frame.resized(self.width, self.height).as_raw())?;
        }
        self.frames += 1;
        Ok(())
    }

    fn finish(&mut self) -> MediaResult<()> {
        // Closing stdin lets the encoder write the trailer and exit.
        drop(self.stdin.take());
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        let status = child.wait()?;
        if !status.success() {
            return Err(MediaError::ffmpeg_failed(
                format!("encoder for {} exited with {}", self.path.display(), status),
                status.code(),
            ));
        }
        debug!(path = %self.path.display(), frames = self.frames, "Recording closed");
        Ok(())
    }
}

impl Drop for FfmpegVideoSink {
    fn drop(&mut self) {
        if self.child.is_some() {
            if let Err(e) = self.finish() {
                warn!(path = %self.path.display(), error = %e, "Failed to close recording");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_recording_file_name() {
        let started = Local.with_ymd_and_hms(2024, 3, 9, 21, 5, 7).unwrap();
        let path = recording_file_name(Path::new("videos"), "Garage", started);
        assert_eq!(path, PathBuf::from("videos/Garage_2024-03-09_21-05-07.avi"));
    }

    #[test]
    fn test_file_names_partitioned_by_camera() {
        let started = Local.with_ymd_and_hms(2024, 3, 9, 21, 5, 7).unwrap();
        assert_ne!(
            recording_file_name(Path::new("videos"), "Front", started),
            recording_file_name(Path::new("videos"), "Back", started)
        );
    }

    #[test]
    fn test_numbered_file_name() {
        let base = Path::new("videos/Garage_2024-03-09_21-05-07.avi");
        assert_eq!(numbered_file_name(base, 0), base);
        assert_eq!(
            numbered_file_name(base, 2),
            PathBuf::from("videos/Garage_2024-03-09_21-05-07_2.avi")
        );
    }

    #[test]
    fn test_encoder_arguments() {
        let args = FfmpegRecorder::new()
            .command(Path::new("videos/a.avi"), 640, 360, 10.0)
            .build_args();
        assert!(args.contains(&"mpeg4".to_string()));
        assert!(args.contains(&"XVID".to_string()));
        assert!(args.contains(&"640x360".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("videos/a.avi"));
    }
}
