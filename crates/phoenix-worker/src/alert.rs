//! Sticky detection cache and the persistence-window alert state machine.

use std::time::{Duration, Instant};

use phoenix_models::{AlertState, DetectionSample};

use crate::logging::CameraLogger;
use crate::metrics::names;

/// Last positive detection sample and when it was captured.
///
/// Only positive samples replace it; an empty sample leaves it untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CachedDetection {
    sample: DetectionSample,
    last_positive: Option<Instant>,
}

impl CachedDetection {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache already holding `sample`, captured at `at`.
    pub fn with_sample(sample: DetectionSample, at: Instant) -> Self {
        Self {
            sample,
            last_positive: Some(at),
        }
    }

    /// Offer a fresh sample. Returns `true` when it replaced the cache.
    pub fn update(&mut self, sample: DetectionSample, now: Instant) -> bool {
        if sample.is_empty() {
            return false;
        }
        self.sample = sample;
        self.last_positive = Some(now);
        true
    }

    pub fn sample(&self) -> &DetectionSample {
        &self.sample
    }

    pub fn last_positive(&self) -> Option<Instant> {
        self.last_positive
    }

    /// Whether the last positive detection is younger than `window`.
    pub fn is_persisting(&self, now: Instant, window: Duration) -> bool {
        self.last_positive
            .is_some_and(|at| now.saturating_duration_since(at) < window)
    }
}

/// Derive the alert state from the cache.
///
/// Outside the persistence window the state is always monitoring. Inside
/// it, an unknown face or motion with no face data is suspicious.
pub fn decide(cache: &CachedDetection, now: Instant, window: Duration) -> AlertState {
    if cache.is_persisting(now, window) && cache.sample().is_suspicious() {
        AlertState::Alert
    } else {
        AlertState::Monitoring
    }
}

/// Tracks one camera's alert state across ticks.
#[derive(Debug)]
pub struct AlertStateMachine {
    persistence_window: Duration,
    state: AlertState,
    logger: CameraLogger,
}

impl AlertStateMachine {
    pub fn new(persistence_window: Duration, logger: CameraLogger) -> Self {
        Self {
            persistence_window,
            state: AlertState::Monitoring,
            logger,
        }
    }

    pub fn state(&self) -> AlertState {
        self.state
    }

    pub fn persistence_window(&self) -> Duration {
        self.persistence_window
    }

    /// Re-evaluate on every tick, sampled or not.
    pub fn evaluate(&mut self, cache: &CachedDetection, now: Instant) -> AlertState {
        let next = decide(cache, now, self.persistence_window);
        if next != self.state {
            self.logger.log_transition(self.state, next);
            metrics::counter!(names::ALERT_TRANSITIONS_TOTAL, "to" => next.as_str()).increment(1);
            self.state = next;
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use phoenix_models::{FaceMatch, Keypoints, Point2, Region};

    use super::*;

    const WINDOW: Duration = Duration::from_secs(10);

    fn motion() -> Vec<Region> {
        vec![Region::new(10, 10, 50, 40)]
    }

    fn pose() -> Vec<Keypoints> {
        vec![Keypoints::new(vec![Point2::new(20.0, 20.0)])]
    }

    fn sample(motion: Vec<Region>, poses: Vec<Keypoints>, faces: Vec<FaceMatch>) -> DetectionSample {
        DetectionSample { motion, poses, faces }
    }

    #[test]
    fn test_empty_sample_leaves_cache_untouched() {
        let t0 = Instant::now();
        let mut cache = CachedDetection::new();
        assert!(cache.update(sample(motion(), vec![], vec![]), t0));
        let before = cache.clone();

        assert!(!cache.update(DetectionSample::default(), t0 + Duration::from_secs(3)));
        assert_eq!(cache, before);
    }

    #[test]
    fn test_monitoring_once_window_lapses() {
        let t0 = Instant::now();
        let cache = CachedDetection::with_sample(
            sample(vec![], vec![], vec![FaceMatch::unknown(Region::new(0, 0, 8, 8))]),
            t0,
        );
        assert_eq!(decide(&cache, t0 + Duration::from_millis(9_999), WINDOW), AlertState::Alert);
        assert_eq!(decide(&cache, t0 + WINDOW, WINDOW), AlertState::Monitoring);
        assert_eq!(decide(&cache, t0 + Duration::from_secs(60), WINDOW), AlertState::Monitoring);
    }

    #[test]
    fn test_unknown_face_alone_alerts() {
        let t0 = Instant::now();
        let cache = CachedDetection::with_sample(
            sample(vec![], vec![], vec![FaceMatch::unknown(Region::new(0, 0, 8, 8))]),
            t0,
        );
        assert_eq!(decide(&cache, t0, WINDOW), AlertState::Alert);
    }

    #[test]
    fn test_known_faces_only_is_monitoring() {
        let t0 = Instant::now();
        let cache = CachedDetection::with_sample(
            sample(motion(), pose(), vec![FaceMatch::new(Region::new(0, 0, 8, 8), "Davi")]),
            t0,
        );
        assert_eq!(decide(&cache, t0 + Duration::from_secs(1), WINDOW), AlertState::Monitoring);
    }

    #[test]
    fn test_unknown_among_known_faces_alerts() {
        let t0 = Instant::now();
        let cache = CachedDetection::with_sample(
            sample(
                motion(),
                pose(),
                vec![
                    FaceMatch::new(Region::new(0, 0, 8, 8), "Davi"),
                    FaceMatch::unknown(Region::new(20, 0, 8, 8)),
                ],
            ),
            t0,
        );
        assert_eq!(decide(&cache, t0, WINDOW), AlertState::Alert);
    }

    #[test]
    fn test_motion_without_faces_alerts() {
        let t0 = Instant::now();
        let cache = CachedDetection::with_sample(sample(motion(), pose(), vec![]), t0);
        assert_eq!(decide(&cache, t0, WINDOW), AlertState::Alert);
    }

    #[test]
    fn test_fresh_cache_is_monitoring() {
        assert_eq!(decide(&CachedDetection::new(), Instant::now(), WINDOW), AlertState::Monitoring);
    }

    #[test]
    fn test_state_machine_tracks_transitions() {
        let t0 = Instant::now();
        let mut machine = AlertStateMachine::new(WINDOW, CameraLogger::new("Test"));
        let cache = CachedDetection::with_sample(sample(motion(), vec![], vec![]), t0);

        assert_eq!(machine.evaluate(&cache, t0), AlertState::Alert);
        assert_eq!(machine.state(), AlertState::Alert);
        assert_eq!(machine.evaluate(&cache, t0 + Duration::from_secs(11)), AlertState::Monitoring);
        assert_eq!(machine.state(), AlertState::Monitoring);
    }
}
