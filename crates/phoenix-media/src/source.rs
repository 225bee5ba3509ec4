//! Camera frame sources.
//!
//! A [`FrameSource`] is a blocking pull interface. `Ok(None)` means the
//! source is exhausted; errors are read failures the caller may retry after
//! [`FrameSource::reopen`].

use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::command::{FfmpegCommand, PIPE};
use crate::error::{MediaError, MediaResult};
use crate::frame::Frame;

/// Decoded frames buffered between the reader thread and the worker.
const FRAME_BUFFER: usize = 2;

/// Where a camera's frames come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    /// Local capture device by index
    Device(u32),
    /// Video file or device node
    Path(PathBuf),
    /// Network stream (`rtsp://`, `http://`, ...)
    Url(String),
}

impl SourceSpec {
    /// Interpret a configured source string.
    ///
    /// All digits is a device index, anything with a `scheme://` is a URL,
    /// everything else is a path.
    pub fn parse(raw: &str) -> MediaResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(MediaError::source_unavailable("empty source"));
        }
        if let Ok(index) = raw.parse::<u32>() {
            return Ok(SourceSpec::Device(index));
        }
        if raw.contains("://") {
            return Ok(SourceSpec::Url(raw.to_string()));
        }
        Ok(SourceSpec::Path(PathBuf::from(raw)))
    }

    pub fn is_live(&self) -> bool {
        match self {
            SourceSpec::Device(_) | SourceSpec::Url(_) => true,
            SourceSpec::Path(path) => path.starts_with("/dev"),
        }
    }

    /// FFmpeg invocation decoding this source to rgb24 at `width`x`height`.
    pub fn ffmpeg_command(&self, width: u32, height: u32) -> FfmpegCommand {
        let cmd = match self {
            SourceSpec::Device(index) => {
                FfmpegCommand::new(format!("/dev/video{}", index), PIPE).input_format("v4l2")
            }
            SourceSpec::Path(path) if path.starts_with("/dev") => {
                FfmpegCommand::new(path.to_string_lossy(), PIPE).input_format("v4l2")
            }
            // Files are paced at their native rate, like a live camera.
            SourceSpec::Path(path) => FfmpegCommand::new(path.to_string_lossy(), PIPE).input_arg("-re"),
            SourceSpec::Url(url) if url.starts_with("rtsp://") => {
                FfmpegCommand::new(url.clone(), PIPE).input_args(["-rtsp_transport", "tcp"])
            }
            SourceSpec::Url(url) => FfmpegCommand::new(url.clone(), PIPE),
        };
        cmd.rawvideo_output(width, height)
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceSpec::Device(index) => write!(f, "device {}", index),
            SourceSpec::Path(path) => write!(f, "{}", path.display()),
            SourceSpec::Url(url) => write!(f, "{}", url),
        }
    }
}

/// Blocking frame supplier for one camera.
pub trait FrameSource: Send {
    /// Next decoded frame, `Ok(None)` at end of stream.
    fn next_frame(&mut self) -> MediaResult<Option<Frame>>;

    /// Re-establish the source after a read failure.
    fn reopen(&mut self) -> MediaResult<()> {
        Ok(())
    }
}

/// Frames decoded by an `ffmpeg` child process piping rgb24 rawvideo.
pub struct FfmpegFrameSource {
    spec: SourceSpec,
    width: u32,
    height: u32,
    read_timeout: Duration,
    child: Option<Child>,
    reader: Option<FrameReader>,
}

impl FfmpegFrameSource {
    /// Start decoding `spec` at the processing resolution.
    pub fn open(spec: SourceSpec, width: u32, height: u32, read_timeout: Duration) -> MediaResult<Self> {
        let mut source = Self {
            spec,
            width,
            height,
            read_timeout,
            child: None,
            reader: None,
        };
        source.start()?;
        Ok(source)
    }

    pub fn spec(&self) -> &SourceSpec {
        &self.spec
    }

    fn start(&mut self) -> MediaResult<()> {
        if let SourceSpec::Path(path) = &self.spec {
            if !path.exists() {
                return Err(MediaError::FileNotFound(path.clone()));
            }
        }

        let mut child = self
            .spec
            .ffmpeg_command(self.width, self.height)
            .spawn(Stdio::null(), Stdio::piped())?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::source_unavailable("ffmpeg stdout not captured"))?;

        let reader = FrameReader::spawn(raw_frames(stdout, self.width, self.height))?;

        info!(source = %self.spec, width = self.width, height = self.height, "Frame source opened");
        self.child = Some(child);
        self.reader = Some(reader);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        // The killed decoder closes stdout, so the reader always returns.
        if let Some(reader) = self.reader.take() {
            reader.shutdown(true);
        }
    }

    /// Exit status of a decoder that stopped producing frames.
    fn exit_error(&mut self) -> Option<MediaError> {
        let child = self.child.as_mut()?;
        match child.wait() {
            Ok(status) if status.success() => None,
            Ok(status) => Some(MediaError::ffmpeg_failed(
                format!("decoder for {} exited with {}", self.spec, status),
                status.code(),
            )),
            Err(e) => Some(MediaError::Io(e)),
        }
    }
}

impl FrameSource for FfmpegFrameSource {
    fn next_frame(&mut self) -> MediaResult<Option<Frame>> {
        let Some(reader) = self.reader.as_ref() else {
            return Err(MediaError::source_unavailable(format!("{} is not open", self.spec)));
        };

        match reader.recv(self.read_timeout) {
            Ok(frame) => frame.map(Some),
            Err(RecvTimeoutError::Timeout) => Err(MediaError::Timeout(self.read_timeout.as_secs())),
            Err(RecvTimeoutError::Disconnected) => match self.exit_error() {
                // A camera that stops is a failure even if ffmpeg exits cleanly.
                None if self.spec.is_live() => Err(MediaError::source_unavailable(format!(
                    "{} stopped delivering frames",
                    self.spec
                ))),
                None => {
                    debug!(source = %self.spec, "End of stream");
                    Ok(None)
                }
                Some(e) => Err(e),
            },
        }
    }

    fn reopen(&mut self) -> MediaResult<()> {
        warn!(source = %self.spec, "Reopening frame source");
        self.stop();
        self.start()
    }
}

impl Drop for FfmpegFrameSource {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for FfmpegFrameSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FfmpegFrameSource")
            .field("spec", &self.spec)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// Frames produced on a background thread and received with a timeout,
/// so a stalled source never blocks its caller.
pub(crate) struct FrameReader {
    frames: Receiver<MediaResult<Frame>>,
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl FrameReader {
    /// Run `grab` until it returns `Ok(None)`, an error, or the reader is
    /// shut down.
    pub(crate) fn spawn<F>(mut grab: F) -> MediaResult<Self>
    where
        F: FnMut() -> MediaResult<Option<Frame>> + Send + 'static,
    {
        let (tx, frames) = mpsc::sync_channel(FRAME_BUFFER);
        let stop = Arc::new(AtomicBool::new(false));
        let stopped = stop.clone();
        let handle = thread::Builder::new()
            .name("frame-reader".to_string())
            .spawn(move || {
                while !stopped.load(Ordering::Relaxed) {
                    match grab() {
                        Ok(Some(frame)) => {
                            if tx.send(Ok(frame)).is_err() {
                                return;
                            }
                        }
                        Ok(None) => return,
                        Err(e) => {
                            let _ = tx.send(Err(e));
                            return;
                        }
                    }
                }
            })?;
        Ok(Self { frames, stop, handle })
    }

    pub(crate) fn recv(&self, timeout: Duration) -> Result<MediaResult<Frame>, RecvTimeoutError> {
        self.frames.recv_timeout(timeout)
    }

    /// Stop the thread. With `join`, wait for it; otherwise it is left to
    /// exit once its current grab returns.
    pub(crate) fn shutdown(self, join: bool) {
        self.stop.store(true, Ordering::Relaxed);
        // Dropping the receiver unblocks a reader waiting on a full buffer.
        drop(self.frames);
        if join {
            let _ = self.handle.join();
        }
    }
}

/// Cut a rawvideo rgb24 stream into frames. A partial trailing frame is
/// treated as end of stream.
fn raw_frames(
    mut stdout: impl Read + Send + 'static,
    width: u32,
    height: u32,
) -> impl FnMut() -> MediaResult<Option<Frame>> + Send + 'static {
    let frame_len = width as usize * height as usize * 3;
    move || {
        let mut buf = vec![0u8; frame_len];
        match stdout.read_exact(&mut buf) {
            Ok(()) => Frame::from_rgb(width, height, buf).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(MediaError::Io(e)),
        }
    }
}
