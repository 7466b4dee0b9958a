//! Persistent track slots
//!
//! A track slot is a fixed identity that keeps a source's azimuth stable
//! across blocks, distinct from the one-shot detections produced by the
//! localizer.

use crate::constants::UNASSIGNED_AZIMUTH;

/// One persistent track: identity is its index in the tracking state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackSlot {
    /// Current smoothed azimuth in degrees; `UNASSIGNED_AZIMUTH` means the
    /// slot has never been assigned
    pub azimuth: f32,
}

impl TrackSlot {
    pub fn is_assigned(&self) -> bool {
        self.azimuth != UNASSIGNED_AZIMUTH
    }
}

/// Fixed-size slot table, created at pipeline start and mutated once per
/// block by assignment + smoothing. Owned exclusively by the processing
/// path; never shared with the render thread.
#[derive(Debug, Clone)]
pub struct TrackingState {
    slots: Vec<TrackSlot>,
}

impl TrackingState {
    /// Create `num_source` unassigned slots
    pub fn new(num_source: usize) -> Self {
        Self {
            slots: vec![
                TrackSlot {
                    azimuth: UNASSIGNED_AZIMUTH
                };
                num_source
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot(&self, index: usize) -> &TrackSlot {
        &self.slots[index]
    }

    pub fn slot_mut(&mut self, index: usize) -> &mut TrackSlot {
        &mut self.slots[index]
    }

    pub fn slots(&self) -> &[TrackSlot] {
        &self.slots
    }

    /// Current azimuths in slot order
    pub fn azimuths(&self) -> Vec<f32> {
        self.slots.iter().map(|s| s.azimuth).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_slots_unassigned() {
        let state = TrackingState::new(3);
        assert_eq!(state.len(), 3);
        assert!(state.slots().iter().all(|s| !s.is_assigned()));
    }
}
