//! FFmpeg command builder for streaming rawvideo in and out of pipes.

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Reads from stdin when used as an input, writes to stdout as an output.
pub const PIPE: &str = "pipe:";

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input path, URL, device or [`PIPE`]
    input: String,
    /// Output path or [`PIPE`]
    output: String,
    /// Input arguments (before -i)
    input_args: Vec<String>,
    /// Output arguments (after -i)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
    /// Log level
    log_level: String,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command.
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            input_args: Vec::new(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// Add input arguments (before -i).
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    /// Add multiple input arguments.
    pub fn input_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Force the input demuxer.
    pub fn input_format(self, format: impl Into<String>) -> Self {
        self.input_arg("-f").input_arg(format)
    }

    /// Describe a packed rgb24 rawvideo input stream.
    pub fn rawvideo_input(self, width: u32, height: u32, fps: f64) -> Self {
        self.input_format("rawvideo")
            .input_args(["-pix_fmt", "rgb24"])
            .input_arg("-s")
            .input_arg(format!("{}x{}", width, height))
            .input_arg("-r")
            .input_arg(format!("{}", fps))
    }

    /// Decode to packed rgb24 rawvideo scaled to `width`x`height`.
    pub fn rawvideo_output(self, width: u32, height: u32) -> Self {
        self.output_args(["-an", "-f", "rawvideo", "-pix_fmt", "rgb24"])
            .output_arg("-s")
            .output_arg(format!("{}x{}", width, height))
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set the FourCC written to the container.
    pub fn video_tag(self, tag: impl Into<String>) -> Self {
        self.output_arg("-vtag").output_arg(tag)
    }

    /// Set quality scale (lower is better).
    pub fn quality(self, q: u8) -> Self {
        self.output_arg("-q:v").output_arg(q.to_string())
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-nostdin".to_string());
        args.push("-v".to_string());
        args.push(self.log_level.clone());

        args.extend(self.input_args.clone());
        args.push("-i".to_string());
        args.push(self.input.clone());

        args.extend(self.output_args.clone());
        args.push(self.output.clone());

        args
    }

    /// Spawn FFmpeg with the given stdio wiring. Stderr is discarded.
    pub fn spawn(&self, stdin: Stdio, stdout: Stdio) -> MediaResult<Child> {
        let ffmpeg = check_ffmpeg()?;
        let args = self.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        Command::new(ffmpeg)
            .args(&args)
            .stdin(stdin)
            .stdout(stdout)
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| MediaError::ffmpeg_failed(format!("Failed to spawn FFmpeg: {}", e), None))
    }
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}
