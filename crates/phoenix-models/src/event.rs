//! Security events written to the event store.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::ALERT_LABEL;

/// Unique event identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub String);

impl EventId {
    /// Generate a new random event ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of event recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// The alert state machine flagged suspicious activity
    #[default]
    SuspiciousActivity,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::SuspiciousActivity => "suspicious_activity",
        }
    }

    /// Human readable description, as shown on reports.
    pub fn description(&self) -> &'static str {
        match self {
            EventType::SuspiciousActivity => ALERT_LABEL,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row of the event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub id: EventId,
    pub event_type: EventType,
    pub camera_name: String,
    pub timestamp: DateTime<Utc>,
    /// Snapshot written when the alert fired
    pub image_path: Option<String>,
    /// Recording that was open when the alert fired
    pub video_path: Option<String>,
}

impl SecurityEvent {
    /// Create a new event stamped now.
    pub fn new(event_type: EventType, camera_name: impl Into<String>) -> Self {
        Self {
            id: EventId::new(),
            event_type,
            camera_name: camera_name.into(),
            timestamp: Utc::now(),
            image_path: None,
            video_path: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_image(mut self, path: Option<String>) -> Self {
        self.image_path = path;
        self
    }

    pub fn with_video(mut self, path: Option<String>) -> Self {
        self.video_path = path;
        self
    }
}
