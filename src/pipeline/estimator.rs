//! Source counting and display remap
//!
//! The number of concurrent sources in a block is read off the subspace
//! decomposition: a column whose mean eigen-magnitude exceeds a fixed
//! threshold counts as one source. The threshold is tuned per deployment,
//! not adaptive.

use crate::dsp::SubspaceResult;

/// Counts sources from the eigen-magnitude columns of a decomposition
pub struct SourceCountEstimator {
    eig_threshold: f32,
}

impl SourceCountEstimator {
    pub fn new(eig_threshold: f32) -> Self {
        Self { eig_threshold }
    }

    /// Number of subspace columns above the threshold; may be zero
    pub fn estimate(&self, subspace: &SubspaceResult) -> usize {
        subspace
            .column_mean_magnitudes()
            .iter()
            .filter(|&&mean| mean > self.eig_threshold)
            .count()
    }
}

/// Affine azimuth rescale about a center angle, compensating an
/// asymmetric physical mounting of the array. Applied to raw detections
/// before assignment; identity at scale 1.0.
#[derive(Debug, Clone, Copy)]
pub struct AzimuthRemap {
    pub center: f32,
    pub scale: f32,
}

impl AzimuthRemap {
    pub fn new(center: f32, scale: f32) -> Self {
        Self { center, scale }
    }

    pub fn apply(&self, azimuth: f32) -> f32 {
        (azimuth - self.center) * self.scale + self.center
    }

    /// Remap a whole detection set in place
    pub fn apply_all(&self, azimuths: &mut [f32]) {
        for az in azimuths {
            *az = self.apply(*az);
        }
    }
}
