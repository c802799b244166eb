//! Recorded frame format
//!
//! One JSON object per line:
//! `{"timestamp": "...", "detections": [...], "objects": [...]}`.
//! Blank lines and lines starting with `#` are skipped.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use touch_core::{Detection, DetectionFrame, ObjectFrame, ObjectObservation};

/// One recorded tick
#[derive(Debug, Clone, Deserialize)]
pub struct FrameRecord {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub detections: Vec<Detection>,
    #[serde(default)]
    pub objects: Vec<ObjectObservation>,
}

impl FrameRecord {
    /// Parse one line; `Ok(None)` for blank and comment lines
    pub fn parse_line(line: &str) -> serde_json::Result<Option<Self>> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(None);
        }
        serde_json::from_str(trimmed).map(Some)
    }

    /// Split into the blob frame and the marker frame.
    ///
    /// A missing `objects` list yields an empty marker frame, which drops
    /// every marker that was in view.
    pub fn into_frames(self) -> (DetectionFrame, ObjectFrame) {
        (
            DetectionFrame::new(self.timestamp, self.detections),
            ObjectFrame::new(self.timestamp, self.objects),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use touch_core::{ObjectId, Point};

    #[test]
    fn test_parse_detections_only() {
        let line = r#"{"timestamp":"2024-01-01T12:00:00Z","detections":[{"centroid":{"x":10.0,"y":20.0}}]}"#;
        let record = FrameRecord::parse_line(line).unwrap().unwrap();

        let (frame, objects) = record.into_frames();
        assert_eq!(frame.len(), 1);
        assert_eq!(frame.detections[0].centroid, Point::new(10.0, 20.0));
        assert!(objects.objects.is_empty());
        assert_eq!(objects.timestamp, frame.timestamp);
    }

    #[test]
    fn test_parse_with_objects() {
        let line = r#"{"timestamp":"2024-01-01T12:00:00Z","objects":[{"id":181,"centroid":{"x":5.0,"y":5.0},"angle":1.5}]}"#;
        let (frame, objects) = FrameRecord::parse_line(line).unwrap().unwrap().into_frames();

        assert!(frame.is_empty());
        assert_eq!(objects.objects[0].id, ObjectId(181));
        assert_eq!(objects.objects[0].angle, 1.5);
    }

    #[test]
    fn test_skips_blank_and_comment_lines() {
        assert!(FrameRecord::parse_line("").unwrap().is_none());
        assert!(FrameRecord::parse_line("   ").unwrap().is_none());
        assert!(FrameRecord::parse_line("# recorded on table 3").unwrap().is_none());
    }

    #[test]
    fn test_rejects_malformed_line() {
        assert!(FrameRecord::parse_line("{not json").is_err());
        assert!(FrameRecord::parse_line(r#"{"detections":[]}"#).is_err());
    }
}
