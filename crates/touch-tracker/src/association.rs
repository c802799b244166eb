//! Nearest-neighbour association of detections to a track
//!
//! Each live track asks for the detection that best matches its previous
//! centroid. The `k` closest detections vote; the label with the most votes
//! wins and summed squared distance breaks ties. A positive match threshold
//! short-circuits the search as soon as one detection is close enough.

use touch_core::{Detection, Point};
use tracing::trace;

/// A detection considered during the neighbour scan
#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    index: usize,
    distance: f64,
}

/// Bump even neighbour counts to the next odd value so two labels cannot tie
/// on votes alone.
pub fn normalize_k(k: usize) -> usize {
    if k % 2 == 0 { k + 1 } else { k }
}

/// Find the index of the detection that best matches `target`.
///
/// `threshold` is a plain distance; any detection within it is returned
/// immediately in frame order. Returns `None` for an empty frame.
pub fn nearest_neighbor(
    detections: &[Detection],
    target: Point,
    k: usize,
    threshold: f64,
) -> Option<usize> {
    if detections.is_empty() {
        return None;
    }

    let k = normalize_k(k);
    let threshold_sq = if threshold > 0.0 {
        Some(threshold * threshold)
    } else {
        None
    };

    let mut neighbors: Vec<Candidate> = Vec::with_capacity(k + 1);

    for (index, detection) in detections.iter().enumerate() {
        let distance = detection.centroid.distance_squared_to(&target);

        if let Some(limit) = threshold_sq {
            if distance <= limit {
                trace!("Early match on detection {} (d²={:.2})", index, distance);
                return Some(index);
            }
        }

        // Insert after any candidate at the same distance
        let position = neighbors.partition_point(|c| c.distance <= distance);
        if position < neighbors.len() || neighbors.len() < k {
            neighbors.insert(position, Candidate { index, distance });
            if neighbors.len() > k {
                neighbors.pop();
            }
        }
    }

    tally_votes(neighbors.iter().map(|c| (c.index, c.distance)))
}

/// Majority vote over `(label, distance)` pairs.
///
/// The label with the most votes wins; equal counts go to the smaller summed
/// distance, and a full tie keeps the label that was seen first.
pub fn tally_votes<L, I>(votes: I) -> Option<L>
where
    L: Copy + Eq,
    I: IntoIterator<Item = (L, f64)>,
{
    // Insertion-ordered so the first-seen label wins a full tie
    let mut tally: Vec<(L, u32, f64)> = Vec::new();

    for (label, distance) in votes {
        match tally.iter_mut().find(|(l, _, _)| *l == label) {
            Some(entry) => {
                entry.1 += 1;
                entry.2 += distance;
            }
            None => tally.push((label, 1, distance)),
        }
    }

    let mut best: Option<(L, u32, f64)> = None;
    for entry in tally {
        let better = match best {
            None => true,
            Some((_, count, sum)) => entry.1 > count || (entry.1 == count && entry.2 < sum),
        };
        if better {
            best = Some(entry);
        }
    }

    best.map(|(label, _, _)| label)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(points: &[(f64, f64)]) -> Vec<Detection> {
        points.iter().map(|&(x, y)| Detection::at(x, y)).collect()
    }

    #[test]
    fn test_normalize_k() {
        assert_eq!(normalize_k(0), 1);
        assert_eq!(normalize_k(1), 1);
        assert_eq!(normalize_k(2), 3);
        assert_eq!(normalize_k(3), 3);
        assert_eq!(normalize_k(4), 5);
    }

    #[test]
    fn test_empty_frame_has_no_match() {
        assert_eq!(nearest_neighbor(&[], Point::new(10.0, 10.0), 3, 0.0), None);
        assert_eq!(nearest_neighbor(&[], Point::new(10.0, 10.0), 3, 50.0), None);
    }

    #[test]
    fn test_picks_closest_detection() {
        let detections = frame(&[(50.0, 50.0), (11.0, 10.0), (30.0, 30.0)]);
        let winner = nearest_neighbor(&detections, Point::new(10.0, 10.0), 3, 0.0);
        assert_eq!(winner, Some(1));
    }

    #[test]
    fn test_single_detection_always_matches() {
        let detections = frame(&[(500.0, 500.0)]);
        assert_eq!(nearest_neighbor(&detections, Point::ORIGIN, 3, 0.0), Some(0));
    }

    #[test]
    fn test_early_exit_returns_first_within_threshold() {
        // Detection 0 is inside the threshold, detection 1 is closer still
        let detections = frame(&[(4.0, 0.0), (1.0, 0.0)]);
        let winner = nearest_neighbor(&detections, Point::ORIGIN, 5, 5.0);
        assert_eq!(winner, Some(0));

        // Without the shortcut the closer one wins
        let winner = nearest_neighbor(&detections, Point::ORIGIN, 5, 0.0);
        assert_eq!(winner, Some(1));
    }

    #[test]
    fn test_early_exit_independent_of_k() {
        let detections = frame(&[(100.0, 0.0), (2.0, 2.0), (0.5, 0.0)]);
        for k in [1, 2, 3, 4, 5] {
            assert_eq!(nearest_neighbor(&detections, Point::ORIGIN, k, 3.0), Some(1));
        }
    }

    #[test]
    fn test_threshold_boundary_is_inclusive() {
        let detections = frame(&[(20.0, 0.0), (3.0, 4.0)]);
        assert_eq!(nearest_neighbor(&detections, Point::ORIGIN, 3, 5.0), Some(1));
    }

    #[test]
    fn test_equal_distances_keep_frame_order() {
        let detections = frame(&[(1.0, 0.0), (0.0, 1.0), (-1.0, 0.0)]);
        assert_eq!(nearest_neighbor(&detections, Point::ORIGIN, 3, 0.0), Some(0));
    }

    #[test]
    fn test_tally_majority_wins() {
        // Two votes for label 7 outweigh one much closer vote for label 9
        let winner = tally_votes([(7, 10.0), (9, 1.0), (7, 12.0)]);
        assert_eq!(winner, Some(7));
    }

    #[test]
    fn test_tally_count_tie_breaks_on_distance() {
        let winner = tally_votes([(1, 5.0), (2, 3.0), (3, 9.0)]);
        assert_eq!(winner, Some(2));
    }

    #[test]
    fn test_tally_full_tie_keeps_first_seen() {
        let winner = tally_votes([(4, 2.0), (8, 2.0)]);
        assert_eq!(winner, Some(4));
    }

    #[test]
    fn test_tally_empty() {
        assert_eq!(tally_votes::<usize, _>(Vec::new()), None);
    }
}
