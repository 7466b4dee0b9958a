//! Frame-to-frame track assignment
//!
//! Greedy nearest-angle matching between the persistent track slots and
//! the block's raw detections. Intentionally not a globally optimal
//! bipartite matching: angular jumps between consecutive blocks are small
//! relative to inter-source separation under normal operation, so the
//! greedy pairing is a documented, accepted approximation.

use crate::constants::DISTANCE_SENTINEL;
use crate::pipeline::tracking::TrackingState;

/// One (slot, detection) pairing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pairing {
    pub slot: usize,
    pub detection: usize,
}

/// Greedy nearest-angle assigner
pub struct TrackAssigner;

impl TrackAssigner {
    /// Pair detections with slots by repeatedly taking the globally
    /// smallest |Δazimuth| entry. Ties break to the first occurrence in
    /// row-major (slot-then-detection) scan order. Produces exactly
    /// `min(slots, detections)` pairings; each slot and detection is used
    /// at most once. Surplus detections are discarded.
    pub fn assign(detections: &[f32], slots: &TrackingState) -> Vec<Pairing> {
        let n = slots.len();
        let m = detections.len();
        if n == 0 || m == 0 {
            return Vec::new();
        }

        let mut dist = vec![vec![0.0f32; m]; n];
        for (i, row) in dist.iter_mut().enumerate() {
            for (j, entry) in row.iter_mut().enumerate() {
                *entry = (detections[j] - slots.slot(i).azimuth).abs();
            }
        }

        let pair_count = n.min(m);
        let mut pairings = Vec::with_capacity(pair_count);

        for _ in 0..pair_count {
            let mut best = (0usize, 0usize);
            let mut best_dist = f32::INFINITY;
            for (i, row) in dist.iter().enumerate() {
                for (j, &d) in row.iter().enumerate() {
                    // strict less-than keeps the first occurrence on ties
                    if d < best_dist {
                        best_dist = d;
                        best = (i, j);
                    }
                }
            }

            let (slot, detection) = best;
            pairings.push(Pairing { slot, detection });

            // consume the row and column
            for row in dist.iter_mut() {
                row[detection] = DISTANCE_SENTINEL;
            }
            for entry in dist[slot].iter_mut() {
                *entry = DISTANCE_SENTINEL;
            }
        }

        pairings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tracking::TrackingState;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn state_with(azimuths: &[f32]) -> TrackingState {
        let mut state = TrackingState::new(azimuths.len());
        for (i, &az) in azimuths.iter().enumerate() {
            state.slot_mut(i).azimuth = az;
        }
        state
    }

    #[test]
    fn test_reference_scenario_pair_order() {
        // slots [10, 0, 170], detections [12, 190, 95]
        let state = state_with(&[10.0, 0.0, 170.0]);
        let pairings = TrackAssigner::assign(&[12.0, 190.0, 95.0], &state);

        // global minima in order: (0,0)=2, (2,1)=20, then (1,2)=95
        assert_eq!(
            pairings,
            vec![
                Pairing { slot: 0, detection: 0 },
                Pairing { slot: 2, detection: 1 },
                Pairing { slot: 1, detection: 2 },
            ]
        );
    }

    #[test]
    fn test_tie_breaks_to_lowest_slot_then_detection() {
        // both slots are 10 degrees from detection 0
        let state = state_with(&[20.0, 40.0]);
        let pairings = TrackAssigner::assign(&[30.0, 30.0], &state);
        assert_eq!(pairings[0], Pairing { slot: 0, detection: 0 });
        assert_eq!(pairings[1], Pairing { slot: 1, detection: 1 });
    }

    #[test]
    fn test_fewer_detections_than_slots() {
        let state = state_with(&[10.0, 90.0, 170.0]);
        let pairings = TrackAssigner::assign(&[88.0], &state);
        assert_eq!(pairings, vec![Pairing { slot: 1, detection: 0 }]);
    }

    #[test]
    fn test_more_detections_than_slots_discards_surplus() {
        let state = state_with(&[10.0, 170.0]);
        let pairings = TrackAssigner::assign(&[9.0, 90.0, 171.0], &state);
        assert_eq!(pairings.len(), 2);
        let used: HashSet<usize> = pairings.iter().map(|p| p.detection).collect();
        assert!(!used.contains(&1)); // the middle detection loses out
    }

    #[test]
    fn test_remapped_detections_beyond_360_stay_one_to_one() {
        // a wide display remap can push detections past 360 degrees; the
        // consumed-entry sentinel must still dominate those distances
        let state = state_with(&[0.0, 10.0]);
        let pairings = TrackAssigner::assign(&[400.0, 405.0], &state);

        assert_eq!(pairings.len(), 2);
        let used_slots: HashSet<usize> = pairings.iter().map(|p| p.slot).collect();
        let used_dets: HashSet<usize> = pairings.iter().map(|p| p.detection).collect();
        assert_eq!(used_slots.len(), 2);
        assert_eq!(used_dets.len(), 2);
        // (1, 0) is the global minimum at 390 degrees
        assert_eq!(pairings[0], Pairing { slot: 1, detection: 0 });
    }

    #[test]
    fn test_empty_inputs() {
        assert!(TrackAssigner::assign(&[], &state_with(&[10.0])).is_empty());
        assert!(TrackAssigner::assign(&[10.0], &TrackingState::new(0)).is_empty());
    }

    proptest! {
        #[test]
        fn prop_one_to_one_of_size_min_n_m(
            // detections range past 360 to cover remapped azimuths
            slots in proptest::collection::vec(0.0f32..180.0, 1..8),
            detections in proptest::collection::vec(0.0f32..500.0, 0..8),
        ) {
            let state = state_with(&slots);
            let pairings = TrackAssigner::assign(&detections, &state);

            prop_assert_eq!(pairings.len(), slots.len().min(detections.len()));

            let used_slots: HashSet<usize> = pairings.iter().map(|p| p.slot).collect();
            let used_dets: HashSet<usize> = pairings.iter().map(|p| p.detection).collect();
            prop_assert_eq!(used_slots.len(), pairings.len());
            prop_assert_eq!(used_dets.len(), pairings.len());

            for p in &pairings {
                prop_assert!(p.slot < slots.len());
                prop_assert!(p.detection < detections.len());
            }
        }

        #[test]
        fn prop_deterministic(
            slots in proptest::collection::vec(0.0f32..180.0, 1..8),
            detections in proptest::collection::vec(0.0f32..500.0, 1..8),
        ) {
            let state = state_with(&slots);
            let a = TrackAssigner::assign(&detections, &state);
            let b = TrackAssigner::assign(&detections, &state);
            prop_assert_eq!(a, b);
        }
    }
}
