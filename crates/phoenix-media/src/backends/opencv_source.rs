//! `VideoCapture` frame source.
//!
//! The capture runs on a [`FrameReader`] thread so a hung device cannot
//! block the camera worker past its read timeout.

use std::time::Duration;

use opencv::core::{Mat, Size, Vector};
use opencv::imgproc;
use opencv::prelude::*;
use opencv::videoio::{VideoCapture, CAP_ANY, CAP_PROP_OPEN_TIMEOUT_MSEC, CAP_PROP_READ_TIMEOUT_MSEC};
use tracing::{info, warn};

use crate::error::{MediaError, MediaResult};
use crate::frame::Frame;
use crate::source::{FrameReader, FrameSource, SourceSpec};

pub struct OpenCvFrameSource {
    spec: SourceSpec,
    width: u32,
    height: u32,
    read_timeout: Duration,
    reader: Option<FrameReader>,
}

impl OpenCvFrameSource {
    pub fn open(spec: SourceSpec, width: u32, height: u32, read_timeout: Duration) -> MediaResult<Self> {
        let mut source = Self {
            spec,
            width,
            height,
            read_timeout,
            reader: None,
        };
        source.start()?;
        info!(source = %source.spec, width, height, "Capture opened");
        Ok(source)
    }

    fn start(&mut self) -> MediaResult<()> {
        let capture = open_capture(&self.spec, self.read_timeout)?;
        let mut grab = CaptureGrab {
            spec: self.spec.clone(),
            capture,
            width: self.width,
            height: self.height,
        };
        self.reader = Some(FrameReader::spawn(move || grab.next())?);
        Ok(())
    }

    fn stop(&mut self) {
        // A capture stuck in `read` cannot be interrupted; its thread exits
        // once the read returns.
        if let Some(reader) = self.reader.take() {
            reader.shutdown(false);
        }
    }
}

fn open_capture(spec: &SourceSpec, timeout: Duration) -> MediaResult<VideoCapture> {
    let millis = timeout.as_millis().min(i32::MAX as u128) as i32;
    let params = Vector::<i32>::from_slice(&[
        CAP_PROP_OPEN_TIMEOUT_MSEC,
        millis,
        CAP_PROP_READ_TIMEOUT_MSEC,
        millis,
    ]);
    let capture = match spec {
        SourceSpec::Device(index) => VideoCapture::new_with_params(*index as i32, CAP_ANY, &params),
        SourceSpec::Path(path) => VideoCapture::from_file_with_params(&path.to_string_lossy(), CAP_ANY, &params),
        SourceSpec::Url(url) => VideoCapture::from_file_with_params(url, CAP_ANY, &params),
    }
    .map_err(|e| MediaError::source_unavailable(format!("{}: {}", spec, e)))?;

    if !capture.is_opened().unwrap_or(false) {
        return Err(MediaError::source_unavailable(format!("{} could not be opened", spec)));
    }
    Ok(capture)
}

/// Capture state owned by the reader thread.
struct CaptureGrab {
    spec: SourceSpec,
    capture: VideoCapture,
    width: u32,
    height: u32,
}

impl CaptureGrab {
    fn next(&mut self) -> MediaResult<Option<Frame>> {
        let mut raw = Mat::default();
        let ok = self
            .capture
            .read(&mut raw)
            .map_err(|e| MediaError::source_unavailable(format!("{}: {}", self.spec, e)))?;
        if !ok || raw.empty() {
            if self.spec.is_live() {
                return Err(MediaError::source_unavailable(format!("{} returned no frame", self.spec)));
            }
            return Ok(None);
        }

        let mut resized = Mat::default();
        imgproc::resize(
            &raw,
            &mut resized,
            Size::new(self.width as i32, self.height as i32),
            0.0,
            0.0,
            imgproc::INTER_LINEAR,
        )
        .map_err(|e| MediaError::InvalidFrame(format!("resize: {}", e)))?;

        let mut rgb = Mat::default();
        imgproc::cvt_color(
            &resized,
            &mut rgb,
            imgproc::COLOR_BGR2RGB,
            0,
            opencv::core::AlgorithmHint::ALGO_HINT_DEFAULT,
        )
        .map_err(|e| MediaError::InvalidFrame(format!("bgr2rgb: {}", e)))?;

        let bytes = rgb
            .data_bytes()
            .map_err(|e| MediaError::InvalidFrame(e.to_string()))?
            .to_vec();
        Frame::from_rgb(self.width, self.height, bytes).map(Some)
    }
}

impl Drop for CaptureGrab {
    fn drop(&mut self) {
        let _ = self.capture.release();
    }
}

impl FrameSource for OpenCvFrameSource {
    fn next_frame(&mut self) -> MediaResult<Option<Frame>> {
        let Some(reader) = self.reader.as_ref() else {
            return Err(MediaError::source_unavailable(format!("{} is not open", self.spec)));
        };
        match reader.recv(self.read_timeout) {
            Ok(frame) => frame.map(Some),
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => Err(MediaError::Timeout(self.read_timeout.as_secs())),
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) if self.spec.is_live() => Err(
                MediaError::source_unavailable(format!("{} stopped delivering frames", self.spec)),
            ),
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => Ok(None),
        }
    }

    fn reopen(&mut self) -> MediaResult<()> {
        warn!(source = %self.spec, "Reopening capture");
        self.stop();
        self.start()
    }
}

impl Drop for OpenCvFrameSource {
    fn drop(&mut self) {
        self.stop();
    }
}
