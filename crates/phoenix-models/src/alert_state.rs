//! Alert and camera status reporting.

use serde::{Deserialize, Serialize};

use crate::constants::{ALERT_LABEL, MONITORING_LABEL, NO_SIGNAL_LABEL};

/// Per-tick verdict of the alert state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AlertState {
    /// Nothing suspicious, or the persistence window has lapsed
    #[default]
    Monitoring,
    /// Suspicious activity within the persistence window
    Alert,
}

impl AlertState {
    /// Get string representation of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertState::Monitoring => "monitoring",
            AlertState::Alert => "alert",
        }
    }

    /// Status text shown next to the published frame.
    pub fn label(&self) -> &'static str {
        match self {
            AlertState::Monitoring => MONITORING_LABEL,
            AlertState::Alert => ALERT_LABEL,
        }
    }

    pub fn is_alert(&self) -> bool {
        matches!(self, AlertState::Alert)
    }
}

impl std::fmt::Display for AlertState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Health of one camera worker, published for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "status", content = "state", rename_all = "snake_case")]
pub enum CameraStatus {
    /// Worker spawned, source not yet delivering frames
    #[default]
    Starting,
    /// Frames flowing; carries the latest alert state
    Live(AlertState),
    /// Source could not be opened or stopped delivering frames
    NoSignal,
    /// Worker exited after a stop request or end of stream
    Stopped,
}

impl CameraStatus {
    pub fn label(&self) -> &'static str {
        match self {
            CameraStatus::Starting => "STARTING",
            CameraStatus::Live(state) => state.label(),
            CameraStatus::NoSignal => NO_SIGNAL_LABEL,
            CameraStatus::Stopped => "STOPPED",
        }
    }

    /// Check if this is a terminal status (the worker has exited).
    pub fn is_terminal(&self) -> bool {
        matches!(self, CameraStatus::NoSignal | CameraStatus::Stopped)
    }
}
