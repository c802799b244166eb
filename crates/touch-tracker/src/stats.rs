//! Running counters for the tracking engine

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cumulative tracking statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerStats {
    pub frames_processed: u64,
    pub detections_seen: u64,
    pub tracks_created: u64,
    pub tracks_departed: u64,
    /// Detections claimed by more than one track
    pub conflicts_resolved: u64,
    pub events_published: u64,
}

impl TrackerStats {
    /// Tracks created and not yet departed
    pub fn live_tracks(&self) -> u64 {
        self.tracks_created.saturating_sub(self.tracks_departed)
    }
}

impl fmt::Display for TrackerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "frames={} detections={} created={} departed={} conflicts={} events={}",
            self.frames_processed,
            self.detections_seen,
            self.tracks_created,
            self.tracks_departed,
            self.conflicts_resolved,
            self.events_published
        )
    }
}
