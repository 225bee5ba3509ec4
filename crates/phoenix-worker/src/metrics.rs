//! Prometheus metrics for the worker.

use std::net::SocketAddr;

use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

use crate::error::{WorkerError, WorkerResult};

/// Metric names as constants for consistency.
pub mod names {
    pub const FRAMES_PROCESSED_TOTAL: &str = "phoenix_frames_processed_total";
    pub const SAMPLED_TICKS_TOTAL: &str = "phoenix_sampled_ticks_total";
    pub const ALERT_TRANSITIONS_TOTAL: &str = "phoenix_alert_transitions_total";
    pub const RECORDINGS_STARTED_TOTAL: &str = "phoenix_recordings_started_total";
    pub const SOURCE_FAILURES_TOTAL: &str = "phoenix_source_failures_total";
    pub const DETECTOR_ERRORS_TOTAL: &str = "phoenix_detector_errors_total";
    pub const ALERTS_ENQUEUED_TOTAL: &str = "phoenix_alerts_enqueued_total";
    pub const ALERTS_DROPPED_TOTAL: &str = "phoenix_alerts_dropped_total";
    pub const NOTIFICATION_FAILURES_TOTAL: &str = "phoenix_notification_failures_total";
    pub const EVENT_STORE_FAILURES_TOTAL: &str = "phoenix_event_store_failures_total";
    pub const CAMERAS: &str = "phoenix_cameras";
}

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: &str) -> WorkerResult<()> {
    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| WorkerError::config_error(format!("METRICS_ADDR '{}': {}", addr, e)))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| WorkerError::config_error(format!("metrics exporter: {}", e)))?;

    describe_metrics();
    info!(%addr, "Prometheus metrics exporter listening");
    Ok(())
}

fn describe_metrics() {
    describe_counter!(names::FRAMES_PROCESSED_TOTAL, "Frames ticked through a camera pipeline");
    describe_counter!(names::SAMPLED_TICKS_TOTAL, "Ticks on which the detection cascade ran");
    describe_counter!(names::ALERT_TRANSITIONS_TOTAL, "Alert state changes, by target state");
    describe_counter!(names::RECORDINGS_STARTED_TOTAL, "Recording sessions opened");
    describe_counter!(names::SOURCE_FAILURES_TOTAL, "Camera sources given up on");
    describe_counter!(names::DETECTOR_ERRORS_TOTAL, "Model failures treated as empty detections");
    describe_counter!(names::ALERTS_ENQUEUED_TOTAL, "Alerts handed to the dispatcher");
    describe_counter!(names::ALERTS_DROPPED_TOTAL, "Alerts dropped on a full queue");
    describe_counter!(names::NOTIFICATION_FAILURES_TOTAL, "Notifications that failed to send");
    describe_counter!(names::EVENT_STORE_FAILURES_TOTAL, "Events that failed to record");
    describe_gauge!(names::CAMERAS, "Camera workers started");
}
