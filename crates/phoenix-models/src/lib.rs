//! Shared data models for the Phoenix Vision surveillance pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Detection primitives (motion regions, pose keypoints, face matches)
//! - Per-tick detection samples and the overlay drawn from them
//! - Alert and camera status reporting
//! - Security events handed to the event store

pub mod alert_state;
pub mod constants;
pub mod detection;
pub mod event;
pub mod overlay;
pub mod region;

// Re-export common types
pub use alert_state::{AlertState, CameraStatus};
pub use detection::{DetectionSample, FaceMatch, Keypoints, Point2, UNKNOWN_LABEL};
pub use event::{EventId, EventType, SecurityEvent};
pub use overlay::{Overlay, OverlayShape, ShapeKind};
pub use region::Region;
