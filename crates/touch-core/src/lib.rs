//! # Touch Core
//!
//! Core domain types for the touch surface blob tracking system.
//! This crate provides the types shared by the tracking engine, the
//! telemetry listener and the replay tool.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod error;
pub mod events;
pub mod geometry;

pub use error::{CoreError, CoreResult};
pub use events::*;
pub use geometry::*;

// ============================================================================
// IDENTIFIERS
// ============================================================================

/// Identity of a tracked contact, allocated by the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrackId(pub u32);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// Identity of a fiducial marker, supplied by the external recognizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M{}", self.0)
    }
}

/// Which projection a snapshot is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoordinateSpace {
    /// Sensor pixel space
    #[default]
    Raw,
    /// Normalized to [0, 1] by the frame dimensions
    Calibrated,
}

// ============================================================================
// PRESENTATION
// ============================================================================

/// RGB color assigned to a contact for overlay drawing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlobColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl BlobColor {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Stable pseudo-random color derived from the track id
    pub fn for_track(id: TrackId) -> Self {
        let mut h = id.0.wrapping_mul(0x9E37_79B9);
        h ^= h >> 15;
        h = h.wrapping_mul(0x85EB_CA6B);
        h ^= h >> 13;
        Self::new((h >> 16) as u8, (h >> 8) as u8, h as u8)
    }

    /// Packed `0xRRGGBB`
    pub fn to_rgb_hex(&self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }
}

// ============================================================================
// DETECTIONS
// ============================================================================

/// One raw blob observation from the upstream detector.
///
/// `id` is scratch space owned by the tracker during a tick; it is never read
/// from input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(default, skip_deserializing)]
    pub id: Option<TrackId>,
    pub centroid: Point,
    #[serde(default)]
    pub bounding_rect: BoundingRect,
    /// Rotation-aware bounding rect
    #[serde(default)]
    pub angle_bounding_rect: BoundingRect,
    /// Orientation in radians
    #[serde(default)]
    pub angle: f64,
}

impl Detection {
    pub fn new(centroid: Point) -> Self {
        Self {
            id: None,
            centroid,
            bounding_rect: BoundingRect::around(centroid, 0.0),
            angle_bounding_rect: BoundingRect::around(centroid, 0.0),
            angle: 0.0,
        }
    }

    pub fn at(x: f64, y: f64) -> Self {
        Self::new(Point::new(x, y))
    }

    pub fn with_angle(mut self, angle: f64) -> Self {
        self.angle = angle;
        self
    }

    pub fn with_bounds(mut self, bounding_rect: BoundingRect, angle_bounding_rect: BoundingRect) -> Self {
        self.bounding_rect = bounding_rect;
        self.angle_bounding_rect = angle_bounding_rect;
        self
    }
}

/// All detections captured in one tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionFrame {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub detections: Vec<Detection>,
}

impl DetectionFrame {
    pub fn new(timestamp: DateTime<Utc>, detections: Vec<Detection>) -> Self {
        Self { timestamp, detections }
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }
}

// ============================================================================
// CONTACT SNAPSHOTS
// ============================================================================

/// Point-in-time view of a tracked contact, published to listeners and
/// returned by queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactSnapshot {
    pub id: TrackId,
    pub centroid: Point,
    pub last_centroid: Point,
    /// Filtered displacement since the previous update
    pub delta: Point,
    /// Displacement magnitude per second
    pub speed: f64,
    pub angle: f64,
    /// Revolutions per second
    pub angular_velocity: f64,
    pub angular_acceleration: f64,
    /// Seconds since the contact arrived
    pub age: f64,
    /// Seconds spent still, `None` when not currently accumulating
    pub held_for: Option<f64>,
    pub bounding_rect: BoundingRect,
    pub angle_bounding_rect: BoundingRect,
    pub color: BlobColor,
    /// Seconds between this update and the previous one
    pub elapsed: f64,
    pub timestamp: DateTime<Utc>,
    pub space: CoordinateSpace,
}

impl ContactSnapshot {
    /// Project into normalized frame coordinates.
    ///
    /// Positions, delta and rects are divided by the frame dimensions; speed is
    /// recomputed from the projected delta. Angular quantities are unchanged.
    pub fn calibrated(&self, frame: FrameSize) -> ContactSnapshot {
        if self.space == CoordinateSpace::Calibrated {
            return self.clone();
        }

        let delta = self.delta.scaled_down(frame);
        let speed = if self.elapsed > 0.0 {
            delta.magnitude() / self.elapsed
        } else {
            0.0
        };

        ContactSnapshot {
            centroid: self.centroid.scaled_down(frame),
            last_centroid: self.last_centroid.scaled_down(frame),
            delta,
            speed,
            bounding_rect: self.bounding_rect.scaled_down(frame),
            angle_bounding_rect: self.angle_bounding_rect.scaled_down(frame),
            space: CoordinateSpace::Calibrated,
            ..self.clone()
        }
    }
}

// ============================================================================
// FIDUCIAL OBJECTS
// ============================================================================

/// One marker sighting from the external fiducial recognizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectObservation {
    pub id: ObjectId,
    pub centroid: Point,
    #[serde(default)]
    pub angle: f64,
    #[serde(default)]
    pub angle_bounding_rect: BoundingRect,
}

impl ObjectObservation {
    pub fn new(id: ObjectId, centroid: Point, angle: f64) -> Self {
        Self {
            id,
            centroid,
            angle,
            angle_bounding_rect: BoundingRect::around(centroid, 0.0),
        }
    }
}

/// All marker sightings captured in one tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectFrame {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub objects: Vec<ObjectObservation>,
}

impl ObjectFrame {
    pub fn new(timestamp: DateTime<Utc>, objects: Vec<ObjectObservation>) -> Self {
        Self { timestamp, objects }
    }
}

/// Point-in-time view of a tracked marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSnapshot {
    pub id: ObjectId,
    pub centroid: Point,
    pub delta: Point,
    pub speed: f64,
    pub angle: f64,
    pub angular_velocity: f64,
    pub angular_acceleration: f64,
    pub angle_bounding_rect: BoundingRect,
    pub elapsed: f64,
    pub last_update: DateTime<Utc>,
    pub space: CoordinateSpace,
}

impl ObjectSnapshot {
    /// Project into normalized frame coordinates
    pub fn calibrated(&self, frame: FrameSize) -> ObjectSnapshot {
        if self.space == CoordinateSpace::Calibrated {
            return self.clone();
        }

        let delta = self.delta.scaled_down(frame);
        let speed = if self.elapsed > 0.0 {
            delta.magnitude() / self.elapsed
        } else {
            0.0
        };

        ObjectSnapshot {
            centroid: self.centroid.scaled_down(frame),
            delta,
            speed,
            angle_bounding_rect: self.angle_bounding_rect.scaled_down(frame),
            space: CoordinateSpace::Calibrated,
            ..self.clone()
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
