//! Contact lifecycle management
//!
//! Each tick the tracker:
//! 1. Clears the frame-scoped id on every detection
//! 2. Lets every live track pick its nearest detection, resolving contested
//!    detections in favour of the closer track
//! 3. Departs tracks that found nothing or lost a contest
//! 4. Updates the survivors and classifies each update as moved or held
//! 5. Compacts the track list
//! 6. Starts a new track for every unclaimed detection

use crate::association::nearest_neighbor;
use crate::conflict::{Claim, ClaimBook};
use crate::kinematics::AdaptiveFilter;
use crate::stats::TrackerStats;
use crate::track::{Track, UpdateOutcome, UpdateParams};
use crate::TrackerConfig;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use touch_core::{ContactSnapshot, Detection, FrameSize, Point, TouchEvent, TrackId};
use tracing::{debug, trace};

/// Blob tracker owning every live contact
#[derive(Debug, Clone)]
pub struct BlobTracker {
    /// Live tracks in creation order
    tracks: Vec<Track>,
    /// Next id to hand out, never reused
    next_id: u32,
    params: UpdateParams,
    k: usize,
    match_threshold: f64,
    /// Calibrated view of every live track
    calibrated: BTreeMap<TrackId, ContactSnapshot>,
    stats: TrackerStats,
}

impl BlobTracker {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            tracks: Vec::new(),
            next_id: config.lifecycle.first_track_id,
            params: UpdateParams {
                filter: AdaptiveFilter::new(config.filter.movement_filtering),
                stillness_threshold: config.lifecycle.stillness_threshold,
                held_threshold_secs: config.lifecycle.held_threshold_secs,
                min_elapsed_secs: config.filter.min_elapsed_secs,
            },
            k: config.association.k,
            match_threshold: config.association.match_threshold,
            calibrated: BTreeMap::new(),
            stats: TrackerStats::default(),
        }
    }

    /// Run one tick over `detections`.
    ///
    /// Every detection leaves with `id` set to the track that now owns it.
    /// Raw events are only produced while `calibrating`; each one directly
    /// precedes its calibrated twin.
    pub fn update(
        &mut self,
        detections: &mut [Detection],
        now: DateTime<Utc>,
        frame: FrameSize,
        calibrating: bool,
    ) -> Vec<TouchEvent> {
        self.stats.frames_processed += 1;
        self.stats.detections_seen += detections.len() as u64;
        trace!(
            "Frame {}: {} detections, {} live tracks",
            self.stats.frames_processed,
            detections.len(),
            self.tracks.len()
        );

        for detection in detections.iter_mut() {
            detection.id = None;
        }

        let mut events = Vec::new();
        let book = self.associate(detections);
        self.stats.conflicts_resolved += book.conflicts();

        // Departures, in track order
        for track in self.tracks.iter().filter(|t| !t.alive) {
            debug!("Contact {} departed after {:.2}s", track.id, track.age);
            self.calibrated.remove(&track.id);
            Self::emit(&mut events, TouchEvent::departed, track.snapshot(), frame, calibrating);
            self.stats.tracks_departed += 1;
        }

        // Survivors, in track order
        let mut matched: Vec<Option<usize>> = vec![None; self.tracks.len()];
        for (detection, track) in book.assignments() {
            matched[track] = Some(detection);
        }

        for (track, slot) in self.tracks.iter_mut().zip(&matched) {
            let Some(index) = *slot else { continue };
            if !track.alive {
                continue;
            }

            let detection = &mut detections[index];
            let outcome = track.update(detection, now, &self.params);
            detection.id = Some(track.id);

            let snapshot = track.snapshot();
            self.calibrated.insert(track.id, snapshot.calibrated(frame));
            match outcome {
                UpdateOutcome::Held => {
                    debug!("Contact {} held", track.id);
                    Self::emit(&mut events, TouchEvent::held, snapshot, frame, calibrating);
                }
                UpdateOutcome::Moved => {
                    Self::emit(&mut events, TouchEvent::moved, snapshot, frame, calibrating);
                }
            }
        }

        self.tracks.retain(|t| t.alive);

        // Arrivals, in frame order
        for detection in detections.iter_mut().filter(|d| d.id.is_none()) {
            let id = TrackId(self.next_id);
            self.next_id += 1;

            let track = Track::spawn(id, detection, now);
            detection.id = Some(id);
            debug!("Contact {} arrived at ({:.1}, {:.1})", id, track.centroid.x, track.centroid.y);

            let snapshot = track.snapshot();
            self.calibrated.insert(id, snapshot.calibrated(frame));
            Self::emit(&mut events, TouchEvent::arrived, snapshot, frame, calibrating);

            self.tracks.push(track);
            self.stats.tracks_created += 1;
        }

        events
    }

    /// Scan tracks in order and record which detection each one claims.
    ///
    /// Tracks that find nothing or lose a contest are marked dead in place.
    fn associate(&mut self, detections: &[Detection]) -> ClaimBook {
        let mut book = ClaimBook::new(detections.len());
        let centroids: Vec<Point> = self.tracks.iter().map(|t| t.centroid).collect();

        for index in 0..self.tracks.len() {
            let target = centroids[index];
            let Some(detection) = nearest_neighbor(detections, target, self.k, self.match_threshold)
            else {
                self.tracks[index].alive = false;
                continue;
            };

            let claim = book.claim(detection, detections[detection].centroid, index, |i| centroids[i]);
            match claim {
                Claim::Granted => {}
                Claim::Displaced { loser } => self.tracks[loser].alive = false,
                Claim::Rejected => self.tracks[index].alive = false,
            }
        }

        book
    }

    fn emit(
        events: &mut Vec<TouchEvent>,
        make: fn(ContactSnapshot) -> TouchEvent,
        raw: ContactSnapshot,
        frame: FrameSize,
        calibrating: bool,
    ) {
        let calibrated = raw.calibrated(frame);
        if calibrating {
            events.push(make(raw));
        }
        events.push(make(calibrated));
    }

    /// Re-project every live contact after the frame size changed
    pub fn recalibrate(&mut self, frame: FrameSize) {
        self.calibrated = self
            .tracks
            .iter()
            .map(|t| (t.id, t.snapshot().calibrated(frame)))
            .collect();
    }

    /// Point-in-time copy of the calibrated contacts
    pub fn contacts(&self) -> BTreeMap<TrackId, ContactSnapshot> {
        self.calibrated.clone()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Id the next arrival will receive
    pub fn next_id(&self) -> TrackId {
        TrackId(self.next_id)
    }

    pub fn stats(&self) -> TrackerStats {
        self.stats
    }

    /// Forget every live contact without publishing departures.
    /// Cleared tracks count as departed; the id counter keeps counting.
    pub fn clear(&mut self) {
        debug!("Clearing {} contacts", self.tracks.len());
        self.stats.tracks_departed += self.tracks.len() as u64;
        self.tracks.clear();
        self.calibrated.clear();
    }
}

// ============================================================================
// TESTS
// ============================================================================
