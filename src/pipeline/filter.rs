//! Temporal smoothing of tracked azimuths
//!
//! Applies the per-pairing update policy: verbatim onboarding for slots
//! that have never been assigned, rejection of implausibly large jumps,
//! and exponential smoothing otherwise. Unpaired slots keep their previous
//! azimuth with no decay.

use crate::pipeline::assigner::Pairing;
use crate::pipeline::tracking::TrackingState;

/// Exponential smoothing filter over the tracking state
pub struct TemporalFilter {
    /// Smoothing coefficient α in (0, 1); weight on the previous value
    alpha: f32,
    /// Updates jumping farther than this are rejected (degrees)
    angle_jump_threshold: f32,
}

impl TemporalFilter {
    pub fn new(alpha: f32, angle_jump_threshold: f32) -> Self {
        debug_assert!(alpha > 0.0 && alpha < 1.0);
        Self {
            alpha,
            angle_jump_threshold,
        }
    }

    /// Apply the pairings to the tracking state in place
    pub fn apply(&self, pairings: &[Pairing], detections: &[f32], state: &mut TrackingState) {
        for pairing in pairings {
            let detection = detections[pairing.detection];
            let slot = state.slot_mut(pairing.slot);

            if !slot.is_assigned() {
                // new-source onboarding, no smoothing
                slot.azimuth = detection;
            } else if (slot.azimuth - detection).abs() > self.angle_jump_threshold {
                // spurious jump, keep the previous azimuth
            } else {
                slot.azimuth = self.alpha * slot.azimuth + (1.0 - self.alpha) * detection;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::assigner::TrackAssigner;
    use crate::pipeline::tracking::TrackingState;

    fn state_with(azimuths: &[f32]) -> TrackingState {
        let mut state = TrackingState::new(azimuths.len());
        for (i, &az) in azimuths.iter().enumerate() {
            state.slot_mut(i).azimuth = az;
        }
        state
    }

    #[test]
    fn test_unassigned_slot_takes_detection_verbatim() {
        let mut state = TrackingState::new(1);
        let filter = TemporalFilter::new(0.9, 15.0);
        filter.apply(
            &[Pairing { slot: 0, detection: 0 }],
            &[123.4],
            &mut state,
        );
        assert_eq!(state.slot(0).azimuth, 123.4);
    }

    #[test]
    fn test_large_jump_rejected_exactly() {
        let mut state = state_with(&[100.0]);
        let filter = TemporalFilter::new(0.9, 15.0);
        filter.apply(
            &[Pairing { slot: 0, detection: 0 }],
            &[130.0],
            &mut state,
        );
        assert_eq!(state.slot(0).azimuth, 100.0);
    }

    #[test]
    fn test_smoothed_update_lies_between_endpoints() {
        let mut state = state_with(&[100.0]);
        let filter = TemporalFilter::new(0.9, 15.0);
        filter.apply(
            &[Pairing { slot: 0, detection: 0 }],
            &[110.0],
            &mut state,
        );
        let updated = state.slot(0).azimuth;
        assert!(updated > 100.0 && updated < 110.0);
        assert!((updated - 101.0).abs() < 1e-4); // 0.9*100 + 0.1*110
    }

    #[test]
    fn test_unpaired_slots_untouched() {
        let mut state = state_with(&[50.0, 150.0]);
        let filter = TemporalFilter::new(0.9, 15.0);
        filter.apply(
            &[Pairing { slot: 0, detection: 0 }],
            &[52.0],
            &mut state,
        );
        assert_eq!(state.slot(1).azimuth, 150.0);
    }

    #[test]
    fn test_reference_scenario_end_to_end() {
        // slots [10, 0, 170], detections [12, 190, 95], threshold 15, α 0.9.
        // Greedy pairs (0,0), (2,1), (1,2): slot0 smooths to 10.2, slot2
        // rejects the 20-degree jump, slot1 onboards 95 verbatim.
        let mut state = state_with(&[10.0, 0.0, 170.0]);
        let detections = [12.0, 190.0, 95.0];

        let pairings = TrackAssigner::assign(&detections, &state);
        let filter = TemporalFilter::new(0.9, 15.0);
        filter.apply(&pairings, &detections, &mut state);

        let azimuths = state.azimuths();
        assert!((azimuths[0] - 10.2).abs() < 1e-4);
        assert_eq!(azimuths[1], 95.0);
        assert_eq!(azimuths[2], 170.0);
    }
}
