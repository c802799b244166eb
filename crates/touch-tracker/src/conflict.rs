//! One-to-one claim bookkeeping between tracks and detections
//!
//! Tracks claim detections in a fixed order. When a later track wins a
//! detection that is already claimed, the track whose pre-update centroid is
//! closer to the detection keeps it and the other one is eliminated for this
//! tick. Equal distances favour the incumbent.

use touch_core::Point;
use tracing::debug;

/// Result of a claim attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// Detection was free and now belongs to the contender
    Granted,
    /// Contender was closer and took the detection from `loser`
    Displaced { loser: usize },
    /// Incumbent was at least as close, contender is eliminated
    Rejected,
}

/// Provisional detection-to-track claims for a single tick
#[derive(Debug, Clone)]
pub struct ClaimBook {
    /// Claimant track index per detection index
    owners: Vec<Option<usize>>,
    conflicts: u64,
}

impl ClaimBook {
    pub fn new(detection_count: usize) -> Self {
        Self {
            owners: vec![None; detection_count],
            conflicts: 0,
        }
    }

    /// Track index currently holding `detection`
    pub fn owner(&self, detection: usize) -> Option<usize> {
        self.owners.get(detection).copied().flatten()
    }

    /// Try to claim `detection` (centered at `target`) for track `contender`.
    ///
    /// `centroid_of` returns the pre-update centroid of a track index.
    pub fn claim<F>(&mut self, detection: usize, target: Point, contender: usize, centroid_of: F) -> Claim
    where
        F: Fn(usize) -> Point,
    {
        let Some(slot) = self.owners.get_mut(detection) else {
            return Claim::Rejected;
        };

        let Some(incumbent) = *slot else {
            *slot = Some(contender);
            return Claim::Granted;
        };

        self.conflicts += 1;
        let incumbent_dist = centroid_of(incumbent).distance_squared_to(&target);
        let contender_dist = centroid_of(contender).distance_squared_to(&target);

        if contender_dist < incumbent_dist {
            debug!(
                "Detection {} reassigned from track #{} (d²={:.2}) to track #{} (d²={:.2})",
                detection, incumbent, incumbent_dist, contender, contender_dist
            );
            *slot = Some(contender);
            Claim::Displaced { loser: incumbent }
        } else {
            debug!(
                "Track #{} lost detection {} to track #{} (d²={:.2} vs {:.2})",
                contender, detection, incumbent, contender_dist, incumbent_dist
            );
            Claim::Rejected
        }
    }

    /// Number of contested claims seen so far
    pub fn conflicts(&self) -> u64 {
        self.conflicts
    }

    /// Final `(detection, track)` pairs in detection order
    pub fn assignments(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.owners
            .iter()
            .enumerate()
            .filter_map(|(detection, owner)| owner.map(|track| (detection, track)))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn centroids() -> Vec<Point> {
        vec![Point::new(0.0, 0.0), Point::new(100.0, 100.0), Point::new(2.0, 2.0)]
    }

    #[test]
    fn test_free_detection_is_granted() {
        let tracks = centroids();
        let mut book = ClaimBook::new(2);
        let claim = book.claim(1, Point::new(1.0, 1.0), 0, |i| tracks[i]);

        assert_eq!(claim, Claim::Granted);
        assert_eq!(book.owner(1), Some(0));
        assert_eq!(book.owner(0), None);
        assert_eq!(book.conflicts(), 0);
    }

    #[test]
    fn test_farther_contender_is_rejected() {
        let tracks = centroids();
        let mut book = ClaimBook::new(1);
        let target = Point::new(1.0, 1.0);

        book.claim(0, target, 0, |i| tracks[i]);
        let claim = book.claim(0, target, 1, |i| tracks[i]);

        assert_eq!(claim, Claim::Rejected);
        assert_eq!(book.owner(0), Some(0));
        assert_eq!(book.conflicts(), 1);
    }

    #[test]
    fn test_closer_contender_displaces_incumbent() {
        let tracks = centroids();
        let mut book = ClaimBook::new(1);
        let target = Point::new(90.0, 90.0);

        book.claim(0, target, 0, |i| tracks[i]);
        let claim = book.claim(0, target, 1, |i| tracks[i]);

        assert_eq!(claim, Claim::Displaced { loser: 0 });
        assert_eq!(book.owner(0), Some(1));
    }

    #[test]
    fn test_equal_distance_keeps_incumbent() {
        let tracks = vec![Point::new(-1.0, 0.0), Point::new(1.0, 0.0)];
        let mut book = ClaimBook::new(1);

        book.claim(0, Point::ORIGIN, 0, |i| tracks[i]);
        assert_eq!(book.claim(0, Point::ORIGIN, 1, |i| tracks[i]), Claim::Rejected);
    }

    #[test]
    fn test_assignments_are_one_to_one() {
        let tracks = centroids();
        let mut book = ClaimBook::new(3);
        let target = Point::new(1.0, 1.0);

        book.claim(0, target, 1, |i| tracks[i]);
        book.claim(0, target, 0, |i| tracks[i]);
        book.claim(0, target, 2, |i| tracks[i]);
        book.claim(2, Point::new(100.0, 100.0), 1, |i| tracks[i]);

        let pairs: Vec<_> = book.assignments().collect();
        assert_eq!(pairs, vec![(0, 0), (2, 1)]);
    }
}
