//! Multi-camera supervision with fake sources.

mod common;

use std::sync::Arc;
use std::time::Duration;

use phoenix_media::{Frame, FrameSource, MediaError, MediaResult, RecorderBackend, SourceSpec};
use phoenix_models::{AlertState, CameraStatus};
use phoenix_worker::{CameraConfig, CameraFactory, CameraSupervisor, FrameDetector, WorkerConfig};

use common::*;

/// `remaining` blank frames, then end of stream.
struct FiniteSource {
    remaining: usize,
}

impl FrameSource for FiniteSource {
    fn next_frame(&mut self) -> MediaResult<Option<Frame>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        Ok(Some(blank()))
    }
}

/// Never runs out.
struct EndlessSource;

impl FrameSource for EndlessSource {
    fn next_frame(&mut self) -> MediaResult<Option<Frame>> {
        std::thread::sleep(Duration::from_millis(5));
        Ok(Some(blank()))
    }
}

/// Cameras named `dead*` fail to open, `live*` never end, the rest end
/// after 20 frames. Cameras with `busy` in the name always see motion.
struct FakeFactory {
    recorder: MemoryRecorder,
}

impl CameraFactory for FakeFactory {
    fn open_source(&self, camera: &CameraConfig) -> MediaResult<Box<dyn FrameSource>> {
        if camera.name.starts_with("dead") {
            return Err(MediaError::source_unavailable("no such device"));
        }
        if camera.name.starts_with("live") {
            return Ok(Box::new(EndlessSource));
        }
        Ok(Box::new(FiniteSource { remaining: 20 }))
    }

    fn detector(&self, camera: &CameraConfig) -> Box<dyn FrameDetector> {
        let samples = if camera.name.contains("busy") {
            vec![motion_only(); 100]
        } else {
            vec![]
        };
        Box::new(ScriptedDetector::new(samples).0)
    }

    fn recorder(&self, _camera: &CameraConfig) -> Box<dyn RecorderBackend> {
        Box::new(self.recorder.clone())
    }
}

fn config(names: &[&str]) -> WorkerConfig {
    WorkerConfig {
        cameras: names
            .iter()
            .enumerate()
            .map(|(i, name)| CameraConfig::new(*name, SourceSpec::Device(i as u32)))
            .collect(),
        frame_width: WIDTH,
        frame_height: HEIGHT,
        source_max_retries: 1,
        ..Default::default()
    }
}

fn start(names: &[&str]) -> (CameraSupervisor, MemoryRecorder, Arc<CollectingOutbox>) {
    let recorder = MemoryRecorder::default();
    let factory = Arc::new(FakeFactory {
        recorder: recorder.clone(),
    });
    let outbox = Arc::new(CollectingOutbox::default());
    let supervisor = CameraSupervisor::start(&config(names), factory, outbox.clone()).unwrap();
    (supervisor, recorder, outbox)
}

#[test]
fn cameras_fail_independently() {
    let (supervisor, _recorder, _outbox) = start(&["dead-door", "yard"]);
    let mut statuses = supervisor.join();
    statuses.sort_by(|a, b| a.0.cmp(&b.0));

    assert_eq!(
        statuses,
        vec![
            ("dead-door".to_string(), CameraStatus::NoSignal),
            ("yard".to_string(), CameraStatus::Stopped),
        ]
    );
}

#[test]
fn stop_closes_open_recordings() {
    let (supervisor, recorder, outbox) = start(&["live-busy", "live-quiet"]);

    let busy = supervisor.cameras()[0].status_receiver();
    let reached_alert = (0..200).any(|_| {
        std::thread::sleep(Duration::from_millis(10));
        *busy.borrow() == CameraStatus::Live(AlertState::Alert)
    });
    assert!(reached_alert);

    let statuses = supervisor.shutdown();
    assert!(statuses.iter().all(|(_, s)| *s == CameraStatus::Stopped));

    let log = recorder.log.lock().unwrap();
    assert_eq!(log.opened.len(), 1);
    assert_eq!(log.finished, 1);
    assert_eq!(outbox.len(), 1);
}

#[test]
fn published_frames_reach_subscribers() {
    let (supervisor, _recorder, _outbox) = start(&["live-cam"]);
    let frames = supervisor.cameras()[0].frames();

    let published = (0..200).find_map(|_| {
        std::thread::sleep(Duration::from_millis(10));
        frames.borrow().clone()
    });
    supervisor.shutdown();

    let published = published.expect("no frame published");
    assert_eq!(published.frame.dimensions(), (WIDTH, HEIGHT));
    assert_eq!(published.state, AlertState::Monitoring);
}

#[tokio::test]
async fn wait_until_finished_resolves_when_streams_end() {
    let (supervisor, _recorder, _outbox) = start(&["a", "b"]);
    tokio::time::timeout(Duration::from_secs(10), supervisor.wait_until_finished())
        .await
        .unwrap();
    assert!(supervisor
        .cameras()
        .iter()
        .all(|c| c.status() == CameraStatus::Stopped));
    supervisor.join();
}
