//! Per-camera notification rate limit.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Local, Utc};
use tracing::{info, warn};

use phoenix_alerts::{AlertJob, AlertOutbox};
use phoenix_media::{snapshot_path, Frame};
use phoenix_models::constants::ALERT_MESSAGE;
use phoenix_models::{AlertState, EventType};

/// When this camera last fired.
#[derive(Debug, Clone)]
pub struct ThrottleTimer {
    window: Duration,
    last_fire: Option<Instant>,
}

impl ThrottleTimer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_fire: None,
        }
    }

    /// First fire is always allowed; later ones need a full window.
    pub fn is_ready(&self, now: Instant) -> bool {
        self.last_fire
            .map_or(true, |last| now.saturating_duration_since(last) >= self.window)
    }

    pub fn mark(&mut self, now: Instant) {
        self.last_fire = Some(now);
    }

    pub fn last_fire(&self) -> Option<Instant> {
        self.last_fire
    }
}

/// Hands at most one alert per window to the outbox.
pub struct AlertThrottle {
    camera: String,
    timer: ThrottleTimer,
    outbox: Arc<dyn AlertOutbox>,
    snapshots_dir: PathBuf,
}

impl AlertThrottle {
    pub fn new(
        camera: impl Into<String>,
        window: Duration,
        outbox: Arc<dyn AlertOutbox>,
        snapshots_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            camera: camera.into(),
            timer: ThrottleTimer::new(window),
            outbox,
            snapshots_dir: snapshots_dir.into(),
        }
    }

    pub fn timer(&self) -> &ThrottleTimer {
        &self.timer
    }

    /// Fire when alerting and the window has elapsed. Returns whether it fired.
    ///
    /// Delivery happens off this thread. The timer is marked on every fire,
    /// whether or not the outbox accepted the job.
    pub fn maybe_notify(
        &mut self,
        state: AlertState,
        frame: &Frame,
        recording_path: Option<&Path>,
        now: Instant,
    ) -> bool {
        if !state.is_alert() || !self.timer.is_ready(now) {
            return false;
        }
        self.timer.mark(now);

        let job = AlertJob {
            camera: self.camera.clone(),
            event_type: EventType::SuspiciousActivity,
            frame: frame.clone(),
            snapshot_path: snapshot_path(&self.snapshots_dir, &self.camera, Local::now()),
            recording_path: recording_path.map(Path::to_path_buf),
            message: format!("{} Camera: {}", ALERT_MESSAGE, self.camera),
            timestamp: Utc::now(),
        };
        match self.outbox.submit(job) {
            Ok(()) => info!(camera = %self.camera, "Alert fired"),
            Err(e) => warn!(camera = %self.camera, error = %e, "Alert could not be queued"),
        }
        true
    }
}

impl std::fmt::Debug for AlertThrottle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertThrottle")
            .field("camera", &self.camera)
            .field("timer", &self.timer)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use phoenix_alerts::{AlertError, AlertResult};

    use super::*;

    #[derive(Default)]
    struct FakeOutbox {
        jobs: Mutex<Vec<AlertJob>>,
        reject: bool,
    }

    impl AlertOutbox for FakeOutbox {
        fn submit(&self, job: AlertJob) -> AlertResult<()> {
            if self.reject {
                return Err(AlertError::QueueFull);
            }
            self.jobs.lock().unwrap().push(job);
            Ok(())
        }
    }

    fn throttle(outbox: Arc<FakeOutbox>) -> AlertThrottle {
        AlertThrottle::new("Yard", Duration::from_secs(30), outbox, "assets")
    }

    #[test]
    fn test_first_alert_fires_then_waits_full_window() {
        let outbox = Arc::new(FakeOutbox::default());
        let mut throttle = throttle(outbox.clone());
        let frame = Frame::solid(8, 8, [0, 0, 0]);
        let t0 = Instant::now();

        assert!(throttle.maybe_notify(AlertState::Alert, &frame, None, t0));
        for secs in [1, 5, 29] {
            assert!(!throttle.maybe_notify(AlertState::Alert, &frame, None, t0 + Duration::from_secs(secs)));
        }
        assert!(throttle.maybe_notify(AlertState::Alert, &frame, None, t0 + Duration::from_secs(30)));
        assert_eq!(outbox.jobs.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_monitoring_never_fires() {
        let outbox = Arc::new(FakeOutbox::default());
        let mut throttle = throttle(outbox.clone());
        let frame = Frame::solid(8, 8, [0, 0, 0]);
        assert!(!throttle.maybe_notify(AlertState::Monitoring, &frame, None, Instant::now()));
        assert!(outbox.jobs.lock().unwrap().is_empty());
        assert!(throttle.timer().last_fire().is_none());
    }

    #[test]
    fn test_job_carries_recording_and_snapshot() {
        let outbox = Arc::new(FakeOutbox::default());
        let mut throttle = throttle(outbox.clone());
        let frame = Frame::solid(8, 8, [0, 0, 0]);

        throttle.maybe_notify(
            AlertState::Alert,
            &frame,
            Some(Path::new("videos/Yard_2024.avi")),
            Instant::now(),
        );

        let jobs = outbox.jobs.lock().unwrap();
        assert_eq!(jobs[0].camera, "Yard");
        assert_eq!(jobs[0].recording_path.as_deref(), Some(Path::new("videos/Yard_2024.avi")));
        assert!(jobs[0].snapshot_path.starts_with("assets"));
        assert!(jobs[0].message.starts_with(ALERT_MESSAGE));
    }

    #[test]
    fn test_rejected_job_still_starts_window() {
        let outbox = Arc::new(FakeOutbox {
            reject: true,
            ..Default::default()
        });
        let mut throttle = throttle(outbox);
        let frame = Frame::solid(8, 8, [0, 0, 0]);
        let t0 = Instant::now();

        assert!(throttle.maybe_notify(AlertState::Alert, &frame, None, t0));
        assert!(!throttle.maybe_notify(AlertState::Alert, &frame, None, t0 + Duration::from_secs(5)));
    }
}
