//! Planar geometry for blob positions and calibrated projection

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// Default sensor width in pixels
pub const DEFAULT_FRAME_WIDTH: f64 = 320.0;
/// Default sensor height in pixels
pub const DEFAULT_FRAME_HEIGHT: f64 = 240.0;

/// A point in sensor pixel space (or normalized space once calibrated)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance, used for all nearest-neighbor comparisons
    pub fn distance_squared_to(&self, other: &Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &Point) -> f64 {
        self.distance_squared_to(other).sqrt()
    }

    /// Length of this point taken as a vector
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Linear interpolation: `t * other + (1 - t) * self`
    pub fn lerp(&self, other: &Point, t: f64) -> Point {
        Point::new(
            t * other.x + (1.0 - t) * self.x,
            t * other.y + (1.0 - t) * self.y,
        )
    }

    /// Divide elementwise by the frame dimensions
    pub fn scaled_down(&self, frame: FrameSize) -> Point {
        Point::new(self.x / frame.width(), self.y / frame.height())
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Axis-aligned bounding rectangle of a blob
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Square rect of side `2 * radius` centered on `center`
    pub fn around(center: Point, radius: f64) -> Self {
        Self::new(center.x - radius, center.y - radius, radius * 2.0, radius * 2.0)
    }

    /// Divide origin and extent by the frame dimensions
    pub fn scaled_down(&self, frame: FrameSize) -> BoundingRect {
        BoundingRect::new(
            self.x / frame.width(),
            self.y / frame.height(),
            self.width / frame.width(),
            self.height / frame.height(),
        )
    }
}

/// Sensor frame dimensions used for calibrated projection.
///
/// Both dimensions are guaranteed finite and strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFrameSize", into = "RawFrameSize")]
pub struct FrameSize {
    width: f64,
    height: f64,
}

impl FrameSize {
    /// Validate and build a frame size
    pub fn new(width: f64, height: f64) -> CoreResult<Self> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(width) || !valid(height) {
            return Err(CoreError::invalid_frame_size(width, height));
        }
        Ok(Self { width, height })
    }

    /// Identity projection: calibrated values equal raw values
    pub fn unit() -> Self {
        Self { width: 1.0, height: 1.0 }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }
}

impl Default for FrameSize {
    fn default() -> Self {
        Self {
            width: DEFAULT_FRAME_WIDTH,
            height: DEFAULT_FRAME_HEIGHT,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RawFrameSize {
    width: f64,
    height: f64,
}

impl TryFrom<RawFrameSize> for FrameSize {
    type Error = CoreError;

    fn try_from(raw: RawFrameSize) -> CoreResult<Self> {
        FrameSize::new(raw.width, raw.height)
    }
}

impl From<FrameSize> for RawFrameSize {
    fn from(size: FrameSize) -> Self {
        Self {
            width: size.width,
            height: size.height,
        }
    }
}

/// Seconds elapsed from `earlier` to `later` (negative if reversed)
pub fn seconds_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    let elapsed = later.signed_duration_since(earlier);
    match elapsed.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => elapsed.num_milliseconds() as f64 / 1_000.0,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert_eq!(a.distance_squared_to(&b), 25.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-12);
        assert!(((b - a).magnitude() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_lerp_endpoints() {
        let a = Point::new(10.0, 10.0);
        let b = Point::new(20.0, 30.0);
        assert_eq!(a.lerp(&b, 0.0), a);
        assert_eq!(a.lerp(&b, 1.0), b);
        assert_eq!(a.lerp(&b, 0.5), Point::new(15.0, 20.0));
    }

    #[test]
    fn test_frame_size_validation() {
        assert!(FrameSize::new(640.0, 480.0).is_ok());
        assert!(FrameSize::new(0.0, 480.0).is_err());
        assert!(FrameSize::new(640.0, -1.0).is_err());
        assert!(FrameSize::new(f64::NAN, 480.0).is_err());
        assert!(FrameSize::new(f64::INFINITY, 480.0).is_err());
    }

    #[test]
    fn test_frame_size_rejects_zero_on_deserialize() {
        let parsed: Result<FrameSize, _> = serde_json::from_str(r#"{"width":0,"height":240}"#);
        assert!(parsed.is_err());

        let parsed: FrameSize = serde_json::from_str(r#"{"width":640,"height":480}"#).unwrap();
        assert_eq!(parsed.width(), 640.0);
    }

    #[test]
    fn test_scaled_down() {
        let frame = FrameSize::new(320.0, 240.0).unwrap();
        let p = Point::new(160.0, 60.0).scaled_down(frame);
        assert_eq!(p, Point::new(0.5, 0.25));

        let rect = BoundingRect::new(32.0, 24.0, 64.0, 48.0).scaled_down(frame);
        assert_eq!(rect, BoundingRect::new(0.1, 0.1, 0.2, 0.2));
    }

    #[test]
    fn test_rect_around() {
        let rect = BoundingRect::around(Point::new(100.0, 100.0), 10.0);
        assert_eq!(rect, BoundingRect::new(90.0, 90.0, 20.0, 20.0));
    }

    #[test]
    fn test_seconds_between() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let t1 = t0 + Duration::milliseconds(250);
        assert!((seconds_between(t0, t1) - 0.25).abs() < 1e-9);
        assert!((seconds_between(t1, t0) + 0.25).abs() < 1e-9);
    }
}
