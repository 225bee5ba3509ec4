//! Runs one worker thread per camera.

use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::watch;
use tracing::{error, info};

use phoenix_alerts::AlertOutbox;
use phoenix_models::CameraStatus;

use crate::camera::{run_camera, source_retry, CameraFactory, CameraOutputs};
use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::CameraLogger;
use crate::metrics::names;
use crate::pipeline::{PipelineSettings, PublishedFrame};

/// A running camera's outputs.
#[derive(Debug)]
pub struct CameraHandle {
    name: String,
    status: watch::Receiver<CameraStatus>,
    frames: watch::Receiver<Option<PublishedFrame>>,
    thread: JoinHandle<CameraStatus>,
}

impl CameraHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> CameraStatus {
        *self.status.borrow()
    }

    /// Subscribe to this camera's status.
    pub fn status_receiver(&self) -> watch::Receiver<CameraStatus> {
        self.status.clone()
    }

    /// Subscribe to this camera's published frames.
    pub fn frames(&self) -> watch::Receiver<Option<PublishedFrame>> {
        self.frames.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }
}

/// Owns every camera worker and their shared stop signal.
#[derive(Debug)]
pub struct CameraSupervisor {
    stop: watch::Sender<bool>,
    cameras: Vec<CameraHandle>,
}

impl CameraSupervisor {
    /// Spawn a worker for every configured camera.
    pub fn start(
        config: &WorkerConfig,
        factory: Arc<dyn CameraFactory>,
        outbox: Arc<dyn AlertOutbox>,
    ) -> WorkerResult<Self> {
        let (stop, stop_rx) = watch::channel(false);
        let settings = PipelineSettings::from(config);
        let mut cameras = Vec::with_capacity(config.cameras.len());

        for camera in &config.cameras {
            let (outputs, status, frames) = CameraOutputs::channel();
            let retry = source_retry(camera, config);
            let span = CameraLogger::new(&camera.name).create_span();
            let thread = {
                let camera = camera.clone();
                let factory = factory.clone();
                let outbox = outbox.clone();
                let settings = settings.clone();
                let stop = stop_rx.clone();
                std::thread::Builder::new()
                    .name(format!("camera-{}", camera.name))
                    .spawn(move || {
                        let _entered = span.entered();
                        run_camera(&camera, factory.as_ref(), &settings, retry, outbox, stop, outputs)
                    })
            }
            .map_err(|e| WorkerError::camera_failed(&camera.name, e.to_string()))?;
            info!(camera = %camera.name, "Camera worker started");
            cameras.push(CameraHandle {
                name: camera.name.clone(),
                status,
                frames,
                thread,
            });
        }

        metrics::gauge!(names::CAMERAS).set(cameras.len() as f64);
        Ok(Self { stop, cameras })
    }

    pub fn cameras(&self) -> &[CameraHandle] {
        &self.cameras
    }

    /// Ask every worker to stop after its current tick.
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }

    /// Resolve once every worker has reached a terminal status.
    pub async fn wait_until_finished(&self) {
        for camera in &self.cameras {
            let mut status = camera.status_receiver();
            // A dropped sender means the worker is gone.
            let _ = status.wait_for(CameraStatus::is_terminal).await;
        }
    }

    /// Join every worker thread. A panicked worker reports no signal.
    pub fn join(self) -> Vec<(String, CameraStatus)> {
        self.cameras
            .into_iter()
            .map(|camera| {
                let status = match camera.thread.join() {
                    Ok(status) => status,
                    Err(_) => {
                        let e = WorkerError::ThreadPanicked(camera.name.clone());
                        error!(camera = %camera.name, error = %e, "Camera worker panicked");
                        CameraStatus::NoSignal
                    }
                };
                (camera.name, status)
            })
            .collect()
    }

    /// Signal stop and join.
    pub fn shutdown(self) -> Vec<(String, CameraStatus)> {
        self.stop();
        self.join()
    }
}
