//! Background alert dispatch.
//!
//! [`AlertOutbox::submit`] never blocks. The [`AlertDispatcher`] drains the
//! queue on the tokio runtime: snapshot, then notification, then event
//! record. A failed step is logged and the later steps still run.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{info, warn};

use phoenix_media::{write_snapshot, Frame};
use phoenix_models::{EventType, SecurityEvent};

use crate::error::{AlertError, AlertResult};
use crate::event_store::EventStore;
use crate::notifier::Notifier;

/// Everything needed to deliver one fired alert.
#[derive(Debug, Clone)]
pub struct AlertJob {
    pub camera: String,
    pub event_type: EventType,
    /// Frame captured when the alert fired
    pub frame: Frame,
    /// Where the snapshot of `frame` should be written
    pub snapshot_path: PathBuf,
    /// Recording open at the time, if any
    pub recording_path: Option<PathBuf>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Non-blocking hand-off point between a camera worker and delivery.
pub trait AlertOutbox: Send + Sync {
    fn submit(&self, job: AlertJob) -> AlertResult<()>;
}

/// Bounded tokio channel outbox.
#[derive(Debug, Clone)]
pub struct ChannelOutbox {
    tx: mpsc::Sender<AlertJob>,
}

impl ChannelOutbox {
    pub fn new(tx: mpsc::Sender<AlertJob>) -> Self {
        Self { tx }
    }
}

impl AlertOutbox for ChannelOutbox {
    fn submit(&self, job: AlertJob) -> AlertResult<()> {
        match self.tx.try_send(job) {
            Ok(()) => {
                metrics::counter!("phoenix_alerts_enqueued_total").increment(1);
                Ok(())
            }
            Err(TrySendError::Full(job)) => {
                warn!(camera = %job.camera, "Alert queue full, dropping alert");
                metrics::counter!("phoenix_alerts_dropped_total").increment(1);
                Err(AlertError::QueueFull)
            }
            Err(TrySendError::Closed(_)) => Err(AlertError::QueueClosed),
        }
    }
}

/// Delivers queued alerts through a notifier and an event store.
pub struct AlertDispatcher {
    notifier: Arc<dyn Notifier>,
    store: Arc<dyn EventStore>,
}

impl AlertDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, store: Arc<dyn EventStore>) -> Self {
        Self { notifier, store }
    }

    /// Create a bounded queue feeding a dispatcher.
    pub fn channel(capacity: usize) -> (ChannelOutbox, mpsc::Receiver<AlertJob>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (ChannelOutbox::new(tx), rx)
    }

    /// Process jobs until every outbox has been dropped.
    pub async fn run(self, mut rx: mpsc::Receiver<AlertJob>) {
        info!(notifier = self.notifier.name(), "Alert dispatcher started");
        while let Some(job) = rx.recv().await {
            self.handle(job).await;
        }
        info!("Alert dispatcher stopped");
    }

    /// Deliver one alert.
    pub async fn handle(&self, job: AlertJob) {
        let AlertJob {
            camera,
            event_type,
            frame,
            snapshot_path,
            recording_path,
            message,
            timestamp,
        } = job;

        let image = write_snapshot_blocking(frame, snapshot_path.clone())
            .await
            .map(|()| snapshot_path)
            .map_err(|e| {
                warn!(camera = %camera, error = %e, "Failed to write alert snapshot");
            })
            .ok();

        if let Err(e) = self.notifier.send(&message, image.as_deref()).await {
            warn!(camera = %camera, notifier = self.notifier.name(), error = %e, "Failed to send alert notification");
            metrics::counter!("phoenix_notification_failures_total").increment(1);
        }

        let event = SecurityEvent::new(event_type, camera.clone())
            .with_timestamp(timestamp)
            .with_image(image.map(|p| p.display().to_string()))
            .with_video(recording_path.map(|p| p.display().to_string()));
        match self.store.record(&event).await {
            Ok(()) => info!(camera = %camera, event_id = %event.id, "Alert recorded"),
            Err(e) => {
                warn!(camera = %camera, error = %e, "Failed to record alert event");
                metrics::counter!("phoenix_event_store_failures_total").increment(1);
            }
        }
    }
}

async fn write_snapshot_blocking(frame: Frame, path: PathBuf) -> AlertResult<()> {
    tokio::task::spawn_blocking(move || write_snapshot(&frame, &path))
        .await
        .map_err(|e| AlertError::Io(std::io::Error::other(e)))??;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::event_store::MemoryEventStore;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, Option<PathBuf>)>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn send(&self, text: &str, image: Option<&Path>) -> AlertResult<()> {
            self.sent
                .lock()
                .unwrap()
                .push((text.to_string(), image.map(Path::to_path_buf)));
            if self.fail {
                return Err(AlertError::notification_failed("offline"));
            }
            Ok(())
        }
    }

    fn job(snapshot_path: PathBuf, recording: Option<&str>) -> AlertJob {
        AlertJob {
            camera: "Garage".into(),
            event_type: EventType::SuspiciousActivity,
            frame: Frame::solid(8, 8, [255, 0, 0]),
            snapshot_path,
            recording_path: recording.map(PathBuf::from),
            message: "ALARM".into(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_handle_writes_snapshot_notifies_and_records() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = dir.path().join("alert.png");
        let notifier = Arc::new(RecordingNotifier::default());
        let store = Arc::new(MemoryEventStore::new());
        let dispatcher = AlertDispatcher::new(notifier.clone(), store.clone());

        dispatcher
            .handle(job(snapshot.clone(), Some("videos/Garage.avi")))
            .await;

        assert!(snapshot.exists());
        let sent = notifier.sent.lock().unwrap().clone();
        assert_eq!(sent, vec![("ALARM".to_string(), Some(snapshot.clone()))]);

        let events = store.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].camera_name, "Garage");
        assert_eq!(events[0].image_path, Some(snapshot.display().to_string()));
        assert_eq!(events[0].video_path.as_deref(), Some("videos/Garage.avi"));
    }

    #[tokio::test]
    async fn test_notification_failure_still_records_event() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = Arc::new(RecordingNotifier {
            fail: true,
            ..Default::default()
        });
        let store = Arc::new(MemoryEventStore::new());
        let dispatcher = AlertDispatcher::new(notifier, store.clone());

        dispatcher.handle(job(dir.path().join("a.png"), None)).await;

        assert_eq!(store.len(), 1);
        assert!(store.events()[0].video_path.is_none());
    }

    #[tokio::test]
    async fn test_unwritable_snapshot_omits_image() {
        let dir = tempfile::tempdir().unwrap();
        // A file where a directory is expected.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let store = Arc::new(MemoryEventStore::new());
        let dispatcher = AlertDispatcher::new(notifier.clone(), store.clone());

        dispatcher.handle(job(blocker.join("a.png"), None)).await;

        assert_eq!(notifier.sent.lock().unwrap()[0].1, None);
        assert!(store.events()[0].image_path.is_none());
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        let (outbox, _rx) = AlertDispatcher::channel(1);
        outbox.submit(job(PathBuf::from("a.png"), None)).unwrap();
        let err = outbox.submit(job(PathBuf::from("b.png"), None)).unwrap_err();
        assert!(matches!(err, AlertError::QueueFull));
    }

    #[tokio::test]
    async fn test_run_drains_until_outboxes_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryEventStore::new());
        let dispatcher = AlertDispatcher::new(Arc::new(RecordingNotifier::default()), store.clone());
        let (outbox, rx) = AlertDispatcher::channel(8);

        outbox.submit(job(dir.path().join("1.png"), None)).unwrap();
        outbox.submit(job(dir.path().join("2.png"), None)).unwrap();
        drop(outbox);

        dispatcher.run(rx).await;
        assert_eq!(store.len(), 2);
    }
}
