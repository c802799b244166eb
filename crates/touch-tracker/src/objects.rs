//! ID-keyed tracking for fiducial markers
//!
//! Markers arrive with a stable id from the recognizer, so no spatial
//! association is needed: each id is followed directly and its motion derived
//! from consecutive sightings. There are no lifecycle events on this path.

use crate::kinematics::{Kinematics, clamp_elapsed};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use touch_core::{
    seconds_between, CoordinateSpace, FrameSize, ObjectFrame, ObjectId, ObjectObservation,
    ObjectSnapshot, Point,
};
use tracing::{debug, trace};

/// Tracker for externally-identified markers
#[derive(Debug, Clone)]
pub struct ObjectTracker {
    /// Raw sensor-space state by id
    raw: BTreeMap<ObjectId, ObjectSnapshot>,
    /// Calibrated projection of `raw`
    calibrated: BTreeMap<ObjectId, ObjectSnapshot>,
    min_elapsed_secs: f64,
}

impl ObjectTracker {
    pub fn new(min_elapsed_secs: f64) -> Self {
        Self {
            raw: BTreeMap::new(),
            calibrated: BTreeMap::new(),
            min_elapsed_secs,
        }
    }

    /// Apply one frame of marker sightings
    pub fn update(&mut self, frame: &ObjectFrame, size: FrameSize) {
        let now = frame.timestamp;

        let before = self.raw.len();
        self.raw
            .retain(|id, _| frame.objects.iter().any(|o| o.id == *id));
        self.calibrated.retain(|id, _| self.raw.contains_key(id));
        if self.raw.len() != before {
            debug!("Dropped {} markers no longer in view", before - self.raw.len());
        }

        for observation in &frame.objects {
            let next = match self.raw.get(&observation.id) {
                Some(previous) => self.follow(previous, observation, now),
                None => {
                    debug!("Marker {} appeared", observation.id);
                    Self::first_sighting(observation, now)
                }
            };

            self.calibrated.insert(observation.id, next.calibrated(size));
            self.raw.insert(observation.id, next);
        }

        trace!("Tracking {} markers", self.raw.len());
    }

    fn first_sighting(observation: &ObjectObservation, now: DateTime<Utc>) -> ObjectSnapshot {
        ObjectSnapshot {
            id: observation.id,
            centroid: observation.centroid,
            delta: Point::ORIGIN,
            speed: 0.0,
            angle: observation.angle,
            angular_velocity: 0.0,
            angular_acceleration: 0.0,
            angle_bounding_rect: observation.angle_bounding_rect,
            elapsed: 0.0,
            last_update: now,
            space: CoordinateSpace::Raw,
        }
    }

    fn follow(
        &self,
        previous: &ObjectSnapshot,
        observation: &ObjectObservation,
        now: DateTime<Utc>,
    ) -> ObjectSnapshot {
        let dt = clamp_elapsed(seconds_between(previous.last_update, now), self.min_elapsed_secs);
        let motion = Kinematics::derive(
            previous.centroid,
            observation.centroid,
            previous.angle,
            observation.angle,
            previous.angular_velocity,
            dt,
        );

        ObjectSnapshot {
            id: observation.id,
            centroid: observation.centroid,
            delta: motion.delta,
            speed: motion.speed,
            angle: observation.angle,
            angular_velocity: motion.angular_velocity,
            angular_acceleration: motion.angular_acceleration,
            angle_bounding_rect: observation.angle_bounding_rect,
            elapsed: dt,
            last_update: now,
            space: CoordinateSpace::Raw,
        }
    }

    /// Re-project every marker after the frame size changed
    pub fn recalibrate(&mut self, size: FrameSize) {
        self.calibrated = self
            .raw
            .iter()
            .map(|(id, snapshot)| (*id, snapshot.calibrated(size)))
            .collect();
    }

    /// Point-in-time copy of the calibrated map
    pub fn calibrated(&self) -> BTreeMap<ObjectId, ObjectSnapshot> {
        self.calibrated.clone()
    }

    /// Point-in-time copy of the raw map
    pub fn raw(&self) -> BTreeMap<ObjectId, ObjectSnapshot> {
        self.raw.clone()
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn clear(&mut self) {
        self.raw.clear();
        self.calibrated.clear();
    }
}

impl Default for ObjectTracker {
    fn default() -> Self {
        Self::new(0.001)
    }
}

// ============================================================================
// TESTS
// ============================================================================
