//! Fakes shared by the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use phoenix_alerts::{AlertJob, AlertOutbox, AlertResult};
use phoenix_media::{Frame, MediaResult, RecorderBackend, VideoSink};
use phoenix_models::{DetectionSample, Region};
use phoenix_worker::{FrameDetector, PipelineDriver, PipelineSettings};

pub const WIDTH: u32 = 64;
pub const HEIGHT: u32 = 36;

/// Returns scripted samples in call order, then empty ones.
pub struct ScriptedDetector {
    samples: Vec<DetectionSample>,
    calls: Arc<Mutex<usize>>,
}

impl ScriptedDetector {
    pub fn new(samples: Vec<DetectionSample>) -> (Self, Arc<Mutex<usize>>) {
        let calls = Arc::new(Mutex::new(0));
        (
            Self {
                samples,
                calls: calls.clone(),
            },
            calls,
        )
    }
}

impl FrameDetector for ScriptedDetector {
    fn sample(&mut self, _frame: &Frame) -> DetectionSample {
        let mut calls = self.calls.lock().unwrap();
        let sample = self.samples.get(*calls).cloned().unwrap_or_default();
        *calls += 1;
        sample
    }
}

#[derive(Debug, Default)]
pub struct RecorderLog {
    pub opened: Vec<PathBuf>,
    pub sizes: Vec<(u32, u32)>,
    pub frames: usize,
    pub finished: usize,
}

struct MemorySink {
    path: PathBuf,
    log: Arc<Mutex<RecorderLog>>,
}

impl VideoSink for MemorySink {
    fn path(&self) -> &Path {
        &self.path
    }

    fn write(&mut self, frame: &Frame) -> MediaResult<()> {
        let mut log = self.log.lock().unwrap();
        log.frames += 1;
        log.sizes.push(frame.dimensions());
        Ok(())
    }

    fn finish(&mut self) -> MediaResult<()> {
        self.log.lock().unwrap().finished += 1;
        Ok(())
    }
}

/// Records sink activity in memory.
#[derive(Clone, Default)]
pub struct MemoryRecorder {
    pub log: Arc<Mutex<RecorderLog>>,
}

impl RecorderBackend for MemoryRecorder {
    fn open(&mut self, path: &Path, _w: u32, _h: u32, _fps: f64) -> MediaResult<Box<dyn VideoSink>> {
        self.log.lock().unwrap().opened.push(path.to_path_buf());
        Ok(Box::new(MemorySink {
            path: path.to_path_buf(),
            log: self.log.clone(),
        }))
    }
}

/// Keeps every submitted alert.
#[derive(Default)]
pub struct CollectingOutbox {
    pub jobs: Mutex<Vec<AlertJob>>,
}

impl CollectingOutbox {
    pub fn len(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }
}

impl AlertOutbox for CollectingOutbox {
    fn submit(&self, job: AlertJob) -> AlertResult<()> {
        self.jobs.lock().unwrap().push(job);
        Ok(())
    }
}

pub fn settings() -> PipelineSettings {
    PipelineSettings {
        frame_width: WIDTH,
        frame_height: HEIGHT,
        sample_every: 4,
        persistence_window: Duration::from_secs(10),
        throttle_window: Duration::from_secs(30),
        recording_fps: 10.0,
        videos_dir: "videos".into(),
        snapshots_dir: "assets".into(),
    }
}

pub struct Harness {
    pub driver: PipelineDriver,
    pub detector_calls: Arc<Mutex<usize>>,
    pub recorder: MemoryRecorder,
    pub outbox: Arc<CollectingOutbox>,
}

pub fn harness(samples: Vec<DetectionSample>) -> Harness {
    let (detector, detector_calls) = ScriptedDetector::new(samples);
    let recorder = MemoryRecorder::default();
    let outbox = Arc::new(CollectingOutbox::default());
    let driver = PipelineDriver::new(
        "Cam",
        &settings(),
        Box::new(detector),
        Box::new(recorder.clone()),
        outbox.clone(),
    );
    Harness {
        driver,
        detector_calls,
        recorder,
        outbox,
    }
}

pub fn blank() -> Frame {
    Frame::solid(WIDTH, HEIGHT, [0, 0, 0])
}

/// A single 50x40 motion region (2000 px²).
pub fn motion_only() -> DetectionSample {
    DetectionSample {
        motion: vec![Region::new(4, 4, 50, 40)],
        ..Default::default()
    }
}
