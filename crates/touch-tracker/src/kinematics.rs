//! Adaptive position smoothing and motion derivation
//!
//! Uses a weighted low-pass filter whose weight follows the raw displacement:
//! fast motion passes through almost untouched (no lag), slow motion is pulled
//! toward the previous position (no jitter). Velocity and angular rates are
//! derived from consecutive filtered positions.

use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use touch_core::Point;
use tracing::trace;

/// Displacement-adaptive exponential smoothing
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AdaptiveFilter {
    /// Filtering strength in [0, 15]
    strength: f64,
}

impl AdaptiveFilter {
    pub fn new(strength: f64) -> Self {
        Self { strength }
    }

    pub fn strength(&self) -> f64 {
        self.strength
    }

    /// Weight given to the new position: `1 - exp(-d / (1 + 10F))`.
    ///
    /// Always within [0, 1] for a finite non-negative displacement.
    pub fn smoothing_factor(&self, displacement: f64) -> f64 {
        1.0 - (-displacement / (1.0 + self.strength * 10.0)).exp()
    }

    /// Blend the raw position toward the previous one
    pub fn apply(&self, previous: Point, current: Point) -> Point {
        let displacement = previous.distance_to(&current);
        let a = self.smoothing_factor(displacement);
        trace!("Filter weight {:.3} for displacement {:.2}", a, displacement);
        previous.lerp(&current, a)
    }
}

impl Default for AdaptiveFilter {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Motion derived from two consecutive updates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Kinematics {
    pub delta: Point,
    /// `|delta| / dt`
    pub speed: f64,
    /// Revolutions per second
    pub angular_velocity: f64,
    pub angular_acceleration: f64,
}

impl Kinematics {
    /// Derive motion from the previous and current state over `dt` seconds.
    ///
    /// `dt` must already be clamped positive, see [`clamp_elapsed`].
    pub fn derive(
        previous: Point,
        current: Point,
        previous_angle: f64,
        angle: f64,
        previous_angular_velocity: f64,
        dt: f64,
    ) -> Self {
        let delta = current - previous;
        let speed = delta.magnitude() / dt;
        let angular_velocity = ((angle - previous_angle) / TAU) / dt;
        let angular_acceleration = (angular_velocity - previous_angular_velocity) / dt;

        Self {
            delta,
            speed,
            angular_velocity,
            angular_acceleration,
        }
    }
}

/// Floor the elapsed time between two updates so identical timestamps cannot
/// divide by zero. Negative values (clock going backwards) are floored too.
pub fn clamp_elapsed(elapsed: f64, min_elapsed: f64) -> f64 {
    if elapsed.is_nan() {
        return min_elapsed;
    }
    elapsed.max(min_elapsed)
}

// ============================================================================
// TESTS
// ============================================================================
