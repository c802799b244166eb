//! # Touch Tracker
//!
//! Turns per-frame blob detections from a camera-based touch surface into a
//! temporally coherent stream of contact lifecycle events.
//!
//! ## Features
//! - Nearest-neighbour association with majority voting
//! - One-to-one conflict resolution between tracks
//! - Arrived / moved / held / departed lifecycle with stable ids
//! - Displacement-adaptive smoothing and derived kinematics
//! - Raw and calibrated (normalized) coordinate spaces
//! - ID-keyed tracking for fiducial markers
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use touch_tracker::{BroadcastListener, TouchEngine};
//! use touch_core::Detection;
//!
//! let mut engine = TouchEngine::new();
//! let bridge = Arc::new(BroadcastListener::default());
//! engine.subscribe(bridge.clone());
//!
//! let mut detections = vec![Detection::at(160.0, 120.0)];
//! let events = engine.process_detections(&mut detections);
//! ```

pub mod association;
pub mod config;
pub mod conflict;
pub mod dispatcher;
pub mod error;
pub mod kinematics;
pub mod objects;
pub mod stats;
pub mod track;
pub mod tracker;

pub use config::{AssociationConfig, FilterConfig, LifecycleConfig, TrackerConfig};
pub use dispatcher::{BroadcastListener, EventDispatcher, ListenerId, TouchListener};
pub use error::{TrackerError, TrackerResult};
pub use kinematics::{AdaptiveFilter, Kinematics};
pub use objects::ObjectTracker;
pub use stats::TrackerStats;
pub use track::{HoldState, Track};
pub use tracker::BlobTracker;

use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use touch_core::{
    ContactSnapshot, Detection, DetectionFrame, FrameSize, ObjectFrame, ObjectId, ObjectSnapshot,
    TouchEvent, TrackId,
};
use tracing::{debug, info};

/// Main entry point: owns the trackers, the listeners and the calibration flag.
///
/// Every tick takes `&mut self`; hosts feeding frames from several threads
/// must serialize the calls themselves.
#[derive(Debug)]
pub struct TouchEngine {
    config: TrackerConfig,
    tracker: BlobTracker,
    objects: ObjectTracker,
    dispatcher: EventDispatcher,
    calibrating: bool,
}

impl TouchEngine {
    /// Create an engine with the default configuration
    pub fn new() -> Self {
        Self::build(TrackerConfig::default())
    }

    /// Create an engine with a validated configuration
    pub fn with_config(config: TrackerConfig) -> TrackerResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: TrackerConfig) -> Self {
        info!(
            "Touch engine initialized: frame {}x{}, k={}, filtering={}",
            config.frame.width(),
            config.frame.height(),
            config.association.k,
            config.filter.movement_filtering
        );

        Self {
            tracker: BlobTracker::new(&config),
            objects: ObjectTracker::new(config.filter.min_elapsed_secs),
            dispatcher: EventDispatcher::new(),
            calibrating: false,
            config,
        }
    }

    /// Change the frame used for calibrated projection and re-project every
    /// live contact and marker.
    pub fn set_frame_size(&mut self, width: f64, height: f64) -> TrackerResult<()> {
        let frame = FrameSize::new(width, height)?;
        self.config.frame = frame;
        self.tracker.recalibrate(frame);
        self.objects.recalibrate(frame);
        info!("Frame size set to {}x{}", width, height);
        Ok(())
    }

    pub fn frame_size(&self) -> FrameSize {
        self.config.frame
    }

    /// Toggle publication of raw-space events
    pub fn set_calibrating(&mut self, calibrating: bool) {
        if self.calibrating != calibrating {
            info!("Calibration {}", if calibrating { "started" } else { "stopped" });
        }
        self.calibrating = calibrating;
    }

    pub fn is_calibrating(&self) -> bool {
        self.calibrating
    }

    pub fn subscribe(&mut self, listener: Arc<dyn TouchListener>) -> ListenerId {
        self.dispatcher.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.dispatcher.unsubscribe(id)
    }

    /// Run one tick and publish the resulting events.
    ///
    /// Each detection leaves annotated with the id of the track that owns it.
    /// The published events are returned as well.
    pub fn process_frame(&mut self, frame: &mut DetectionFrame) -> Vec<TouchEvent> {
        let events = self.tracker.update(
            &mut frame.detections,
            frame.timestamp,
            self.config.frame,
            self.calibrating,
        );
        self.dispatcher.publish_batch(&events);
        events
    }

    /// Run one tick stamped with the current time
    pub fn process_detections(&mut self, detections: &mut [Detection]) -> Vec<TouchEvent> {
        let events = self
            .tracker
            .update(detections, Utc::now(), self.config.frame, self.calibrating);
        self.dispatcher.publish_batch(&events);
        events
    }

    /// Update the fiducial marker maps
    pub fn process_objects(&mut self, frame: &ObjectFrame) {
        self.objects.update(frame, self.config.frame);
    }

    /// Calibrated contacts by id
    pub fn tracked_contacts(&self) -> BTreeMap<TrackId, ContactSnapshot> {
        self.tracker.contacts()
    }

    /// Calibrated markers by id
    pub fn tracked_objects(&self) -> BTreeMap<ObjectId, ObjectSnapshot> {
        self.objects.calibrated()
    }

    /// Raw-space markers by id
    pub fn raw_objects(&self) -> BTreeMap<ObjectId, ObjectSnapshot> {
        self.objects.raw()
    }

    pub fn active_track_count(&self) -> usize {
        self.tracker.len()
    }

    pub fn stats(&self) -> TrackerStats {
        TrackerStats {
            events_published: self.dispatcher.events_published(),
            ..self.tracker.stats()
        }
    }

    /// Drop every contact and marker without publishing departures
    pub fn clear(&mut self) {
        debug!("Clearing engine state");
        self.tracker.clear();
        self.objects.clear();
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }
}

impl Default for TouchEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone};
    use parking_lot::Mutex;
    use touch_core::{CoordinateSpace, ObjectObservation, Point, TouchEventKind};

    /// Listener that records every notification it receives
    #[derive(Default)]
    struct RecordingListener {
        seen: Mutex<Vec<(CoordinateSpace, TouchEventKind, TrackId)>>,
    }

    impl RecordingListener {
        fn record(&self, event: TouchEvent) {
            self.seen.lock().push((event.space, event.kind, event.track_id()));
        }

        fn take(&self) -> Vec<(CoordinateSpace, TouchEventKind, TrackId)> {
            std::mem::take(&mut *self.seen.lock())
        }
    }

    impl TouchListener for RecordingListener {
        fn touch_arrived(&self, event: TouchEvent) {
            self.record(event);
        }
        fn touch_moved(&self, event: TouchEvent) {
            self.record(event);
        }
        fn touch_held(&self, event: TouchEvent) {
            self.record(event);
        }
        fn touch_departed(&self, event: TouchEvent) {
            self.record(event);
        }
        fn raw_touch_arrived(&self, event: TouchEvent) {
            self.record(event);
        }
        fn raw_touch_departed(&self, event: TouchEvent) {
            self.record(event);
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn frame(ms: i64, points: &[(f64, f64)]) -> DetectionFrame {
        DetectionFrame::new(
            t0() + Duration::milliseconds(ms),
            points.iter().map(|&(x, y)| Detection::at(x, y)).collect(),
        )
    }

    #[test]
    fn test_with_config_validates() {
        let mut config = TrackerConfig::default();
        config.filter.movement_filtering = 40.0;
        assert!(matches!(
            TouchEngine::with_config(config),
            Err(TrackerError::InvalidConfig(_))
        ));

        assert!(TouchEngine::with_config(TrackerConfig::smooth()).is_ok());
    }

    #[test]
    fn test_set_frame_size_rejects_non_positive() {
        let mut engine = TouchEngine::new();
        assert!(matches!(engine.set_frame_size(0.0, 240.0), Err(TrackerError::Core(_))));
        assert!(engine.set_frame_size(640.0, -1.0).is_err());
        assert_eq!(engine.frame_size().width(), 320.0);

        assert!(engine.set_frame_size(640.0, 480.0).is_ok());
        assert_eq!(engine.frame_size().width(), 640.0);
    }

    #[test]
    fn test_listener_receives_lifecycle() {
        let mut engine = TouchEngine::new();
        let listener = Arc::new(RecordingListener::default());
        engine.subscribe(listener.clone());

        engine.process_frame(&mut frame(0, &[(10.0, 10.0)]));
        engine.process_frame(&mut frame(33, &[(10.0, 10.0)]));
        engine.process_frame(&mut frame(66, &[]));

        let calibrated = CoordinateSpace::Calibrated;
        assert_eq!(
            listener.take(),
            vec![
                (calibrated, TouchEventKind::Arrived, TrackId(200)),
                (calibrated, TouchEventKind::Moved, TrackId(200)),
                (calibrated, TouchEventKind::Departed, TrackId(200)),
            ]
        );
        assert_eq!(engine.stats().events_published, 3);
    }

    #[test]
    fn test_raw_events_follow_calibration_flag() {
        let mut engine = TouchEngine::new();
        let listener = Arc::new(RecordingListener::default());
        engine.subscribe(listener.clone());

        engine.set_calibrating(true);
        assert!(engine.is_calibrating());
        engine.process_frame(&mut frame(0, &[(10.0, 10.0)]));
        assert_eq!(
            listener.take(),
            vec![
                (CoordinateSpace::Raw, TouchEventKind::Arrived, TrackId(200)),
                (CoordinateSpace::Calibrated, TouchEventKind::Arrived, TrackId(200)),
            ]
        );

        engine.set_calibrating(false);
        engine.process_frame(&mut frame(33, &[]));
        assert_eq!(
            listener.take(),
            vec![(CoordinateSpace::Calibrated, TouchEventKind::Departed, TrackId(200))]
        );
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let mut engine = TouchEngine::new();
        let listener = Arc::new(RecordingListener::default());
        let id = engine.subscribe(listener.clone());

        assert!(engine.unsubscribe(id));
        engine.process_frame(&mut frame(0, &[(10.0, 10.0)]));
        assert!(listener.take().is_empty());
    }

    #[test]
    fn test_frame_annotated_with_track_ids() {
        let mut engine = TouchEngine::new();
        let mut first = frame(0, &[(10.0, 10.0), (200.0, 200.0)]);
        engine.process_frame(&mut first);

        let mut second = frame(33, &[(202.0, 201.0), (11.0, 10.0)]);
        engine.process_frame(&mut second);

        assert_eq!(second.detections[0].id, Some(TrackId(201)));
        assert_eq!(second.detections[1].id, Some(TrackId(200)));
        assert_eq!(engine.active_track_count(), 2);
    }

    #[test]
    fn test_tracked_contacts_follow_frame_size() {
        let mut engine = TouchEngine::new();
        engine.process_frame(&mut frame(0, &[(160.0, 120.0)]));

        let contacts = engine.tracked_contacts();
        assert_eq!(contacts[&TrackId(200)].centroid, Point::new(0.5, 0.5));

        engine.set_frame_size(1.0, 1.0).unwrap();
        let contacts = engine.tracked_contacts();
        assert_eq!(contacts[&TrackId(200)].centroid, Point::new(160.0, 120.0));
    }

    #[test]
    fn test_objects_tracked_separately() {
        let mut engine = TouchEngine::new();
        let objects = ObjectFrame::new(
            t0(),
            vec![ObjectObservation::new(ObjectId(181), Point::new(32.0, 24.0), 0.0)],
        );
        engine.process_objects(&objects);

        assert_eq!(engine.raw_objects()[&ObjectId(181)].centroid, Point::new(32.0, 24.0));
        assert_eq!(engine.tracked_objects()[&ObjectId(181)].centroid, Point::new(0.1, 0.1));
        assert_eq!(engine.active_track_count(), 0);

        engine.clear();
        assert!(engine.tracked_objects().is_empty());
    }

    #[test]
    fn test_process_detections_stamps_now() {
        let mut engine = TouchEngine::new();
        let before = Utc::now();
        let mut detections = vec![Detection::at(5.0, 5.0)];
        let events = engine.process_detections(&mut detections);

        assert_eq!(events.len(), 1);
        assert!(events[0].timestamp >= before);
        assert_eq!(detections[0].id, Some(TrackId(200)));
    }
}
