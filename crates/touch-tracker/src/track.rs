//! Track state owned by the lifecycle manager

use crate::kinematics::{AdaptiveFilter, Kinematics, clamp_elapsed};
use chrono::{DateTime, Utc};
use touch_core::{
    seconds_between, BlobColor, BoundingRect, ContactSnapshot, CoordinateSpace, Detection, Point,
    TrackId,
};

const MILLIS_PER_SEC: f64 = 1000.0;

/// Stillness bookkeeping for held detection
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HoldState {
    /// Below the stillness threshold since `since`
    Still { since: DateTime<Utc> },
    /// Last update was at or above the stillness threshold
    Moving,
    /// Held already fired for the current still period
    Reported,
}

/// Outcome of feeding one matched detection into a track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Moved,
    Held,
}

/// Thresholds applied during a track update
#[derive(Debug, Clone, Copy)]
pub struct UpdateParams {
    pub filter: AdaptiveFilter,
    /// Raw units per millisecond
    pub stillness_threshold: f64,
    pub held_threshold_secs: f64,
    pub min_elapsed_secs: f64,
}

/// A persistent contact identity
#[derive(Debug, Clone)]
pub struct Track {
    pub id: TrackId,
    pub centroid: Point,
    pub last_centroid: Point,
    pub delta: Point,
    pub speed: f64,
    pub angle: f64,
    pub angular_velocity: f64,
    pub angular_acceleration: f64,
    pub bounding_rect: BoundingRect,
    pub angle_bounding_rect: BoundingRect,
    pub age: f64,
    pub created_at: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
    /// Seconds between the last two updates, after clamping
    pub elapsed: f64,
    pub hold: HoldState,
    pub color: BlobColor,
    pub alive: bool,
}

impl Track {
    /// Start a track from an unmatched detection
    pub fn spawn(id: TrackId, detection: &Detection, now: DateTime<Utc>) -> Self {
        Self {
            id,
            centroid: detection.centroid,
            last_centroid: detection.centroid,
            delta: Point::ORIGIN,
            speed: 0.0,
            angle: detection.angle,
            angular_velocity: 0.0,
            angular_acceleration: 0.0,
            bounding_rect: detection.bounding_rect,
            angle_bounding_rect: detection.angle_bounding_rect,
            age: 0.0,
            created_at: now,
            last_update: now,
            elapsed: 0.0,
            hold: HoldState::Still { since: now },
            color: BlobColor::for_track(id),
            alive: true,
        }
    }

    /// Fold a matched detection into this track and classify the update
    pub fn update(
        &mut self,
        detection: &Detection,
        now: DateTime<Utc>,
        params: &UpdateParams,
    ) -> UpdateOutcome {
        let previous = self.centroid;
        let filtered = params.filter.apply(previous, detection.centroid);
        let dt = clamp_elapsed(seconds_between(self.last_update, now), params.min_elapsed_secs);

        let motion = Kinematics::derive(
            previous,
            filtered,
            self.angle,
            detection.angle,
            self.angular_velocity,
            dt,
        );

        self.last_centroid = previous;
        self.centroid = filtered;
        self.delta = motion.delta;
        self.speed = motion.speed;
        self.angle = detection.angle;
        self.angular_velocity = motion.angular_velocity;
        self.angular_acceleration = motion.angular_acceleration;
        self.bounding_rect = detection.bounding_rect;
        self.angle_bounding_rect = detection.angle_bounding_rect;
        self.age = seconds_between(self.created_at, now);
        self.elapsed = dt;
        self.last_update = now;

        self.advance_hold(now, params)
    }

    /// Speed in raw units per millisecond, the unit of the stillness threshold
    pub fn speed_per_ms(&self) -> f64 {
        self.speed / MILLIS_PER_SEC
    }

    fn advance_hold(&mut self, now: DateTime<Utc>, params: &UpdateParams) -> UpdateOutcome {
        if self.speed_per_ms() >= params.stillness_threshold {
            self.hold = HoldState::Moving;
            return UpdateOutcome::Moved;
        }

        match self.hold {
            HoldState::Moving => {
                self.hold = HoldState::Still { since: now };
                UpdateOutcome::Moved
            }
            HoldState::Still { since } => {
                if seconds_between(since, now) > params.held_threshold_secs {
                    self.hold = HoldState::Reported;
                    UpdateOutcome::Held
                } else {
                    UpdateOutcome::Moved
                }
            }
            HoldState::Reported => UpdateOutcome::Moved,
        }
    }

    /// Seconds spent still in the current period, `None` when not accumulating
    pub fn held_for(&self) -> Option<f64> {
        match self.hold {
            HoldState::Still { since } => Some(seconds_between(since, self.last_update).max(0.0)),
            HoldState::Moving | HoldState::Reported => None,
        }
    }

    /// Raw-space snapshot of the current state
    pub fn snapshot(&self) -> ContactSnapshot {
        ContactSnapshot {
            id: self.id,
            centroid: self.centroid,
            last_centroid: self.last_centroid,
            delta: self.delta,
            speed: self.speed,
            angle: self.angle,
            angular_velocity: self.angular_velocity,
            angular_acceleration: self.angular_acceleration,
            age: self.age,
            held_for: self.held_for(),
            bounding_rect: self.bounding_rect,
            angle_bounding_rect: self.angle_bounding_rect,
            color: self.color,
            elapsed: self.elapsed,
            timestamp: self.last_update,
            space: CoordinateSpace::Raw,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn params() -> UpdateParams {
        UpdateParams {
            filter: AdaptiveFilter::new(0.0),
            stillness_threshold: 7.0,
            held_threshold_secs: 1.0,
            min_elapsed_secs: 0.001,
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_spawn_state() {
        let track = Track::spawn(TrackId(200), &Detection::at(5.0, 6.0).with_angle(0.3), t0());
        assert_eq!(track.centroid, Point::new(5.0, 6.0));
        assert_eq!(track.speed, 0.0);
        assert_eq!(track.angle, 0.3);
        assert_eq!(track.held_for(), Some(0.0));
        assert!(track.alive);
    }

    #[test]
    fn test_stationary_update_is_moved_with_zero_speed() {
        let mut track = Track::spawn(TrackId(200), &Detection::at(10.0, 10.0), t0());
        let outcome = track.update(&Detection::at(10.0, 10.0), t0() + Duration::milliseconds(100), &params());

        assert_eq!(outcome, UpdateOutcome::Moved);
        assert_eq!(track.delta, Point::ORIGIN);
        assert_eq!(track.speed, 0.0);
        assert!((track.held_for().unwrap() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_fast_motion_resets_hold() {
        let mut track = Track::spawn(TrackId(200), &Detection::at(0.0, 0.0), t0());
        track.update(&Detection::at(1000.0, 0.0), t0() + Duration::milliseconds(100), &params());

        assert!(track.speed_per_ms() >= 7.0);
        assert_eq!(track.hold, HoldState::Moving);
        assert_eq!(track.held_for(), None);
    }

    #[test]
    fn test_held_fires_once_then_requires_motion() {
        let mut track = Track::spawn(TrackId(200), &Detection::at(10.0, 10.0), t0());
        let still = Detection::at(10.0, 10.0);

        let mut held = 0;
        for step in 1..=30 {
            let now = t0() + Duration::milliseconds(100 * step);
            if track.update(&still, now, &params()) == UpdateOutcome::Held {
                held += 1;
            }
        }
        assert_eq!(held, 1);
        assert_eq!(track.hold, HoldState::Reported);

        // Move, then stay still long enough for a second held
        track.update(&Detection::at(2000.0, 10.0), t0() + Duration::milliseconds(3100), &params());
        assert_eq!(track.hold, HoldState::Moving);

        let anchor = track.centroid;
        let mut held_again = 0;
        for step in 1..=15 {
            let now = t0() + Duration::milliseconds(3100 + 100 * step);
            let d = Detection::new(anchor);
            if track.update(&d, now, &params()) == UpdateOutcome::Held {
                held_again += 1;
            }
        }
        assert_eq!(held_again, 1);
    }

    #[test]
    fn test_slow_drift_stays_still() {
        let mut track = Track::spawn(TrackId(200), &Detection::at(0.0, 0.0), t0());
        // 300 units/s is 0.3 units/ms
        track.update(&Detection::at(30.0, 0.0), t0() + Duration::milliseconds(100), &params());

        assert!(track.speed > 7.0);
        assert!(track.speed_per_ms() < 7.0);
        assert!(matches!(track.hold, HoldState::Still { .. }));
    }

    #[test]
    fn test_same_timestamp_update_is_finite() {
        let mut track = Track::spawn(TrackId(200), &Detection::at(0.0, 0.0), t0());
        track.update(&Detection::at(3.0, 4.0).with_angle(1.0), t0(), &params());

        assert!(track.speed.is_finite());
        assert!(track.angular_velocity.is_finite());
        assert_eq!(track.elapsed, 0.001);
    }

    #[test]
    fn test_snapshot_is_raw() {
        let track = Track::spawn(TrackId(203), &Detection::at(1.0, 2.0), t0());
        let snapshot = track.snapshot();
        assert_eq!(snapshot.space, CoordinateSpace::Raw);
        assert_eq!(snapshot.id, TrackId(203));
        assert_eq!(snapshot.timestamp, t0());
    }
}
