//! Seams for the external array-processing capabilities
//!
//! The subspace decomposition, azimuth localization, and beam-weight
//! synthesis are numerical capabilities provided from outside the core
//! pipeline. The traits here fix their contracts; the pipeline only reads
//! aggregate magnitudes and angle sets through them. [`synthetic`] provides
//! a deterministic stand-in implementation for bring-up and tests.

pub mod synthetic;

use crate::audio::AudioBlock;
use crate::error::DspError;

/// Result of the subspace decomposition of one block.
///
/// Opaque to the core apart from the eigen-magnitude matrix: one row per
/// frequency bin, with the noise-subspace columns first and the
/// signal-subspace columns after, as the decomposition concatenates them.
pub struct SubspaceResult {
    /// |eigenvalue| per (frequency bin, subspace column)
    pub eigen_magnitudes: Vec<Vec<f32>>,
    /// Index of the block this decomposition was computed from
    pub block_index: u64,
}

impl SubspaceResult {
    /// Mean absolute magnitude of each subspace column across frequency bins
    pub fn column_mean_magnitudes(&self) -> Vec<f32> {
        let rows = self.eigen_magnitudes.len();
        if rows == 0 {
            return Vec::new();
        }
        let cols = self.eigen_magnitudes[0].len();
        let mut means = vec![0.0f32; cols];
        for row in &self.eigen_magnitudes {
            for (mean, &mag) in means.iter_mut().zip(row.iter()) {
                *mean += mag.abs();
            }
        }
        for mean in &mut means {
            *mean /= rows as f32;
        }
        means
    }
}

/// Raw azimuth detections for one block, plus the localization spectrum
/// over the candidate grid
pub struct Localization {
    /// Raw azimuth estimates in degrees, one per resolved source
    pub azimuths: Vec<f32>,
    /// Pseudo-spectrum sampled over the candidate azimuth grid
    pub spectrum: Vec<f32>,
}

/// Frequency band used for localization, converted to transform-bin
/// indices for the analysis capability
#[derive(Debug, Clone, Copy)]
pub struct FrequencyBand {
    pub low_hz: f32,
    pub high_hz: f32,
}

impl FrequencyBand {
    /// Transform-bin range `[low, high)` for a given rate and transform
    /// length, matching `round(f / Fs * nfft)` at each edge
    pub fn bin_range(&self, sample_rate: u32, nfft: usize) -> std::ops::Range<usize> {
        let to_bin = |f: f32| (f / sample_rate as f32 * nfft as f32).round() as usize;
        to_bin(self.low_hz)..to_bin(self.high_hz)
    }

    /// Resolve the band to the concrete bin selection handed to the
    /// localizer for a given rate and transform length
    pub fn select(&self, sample_rate: u32, nfft: usize) -> BandSelection {
        BandSelection {
            band: *self,
            bins: self.bin_range(sample_rate, nfft),
        }
    }
}

/// A frequency band resolved to transform-bin indices, the selection the
/// localization capability actually consumes
#[derive(Debug, Clone)]
pub struct BandSelection {
    pub band: FrequencyBand,
    pub bins: std::ops::Range<usize>,
}

/// Block → subspace decomposition
pub trait SpectralAnalyzer {
    fn analyze(&mut self, block: &AudioBlock) -> Result<SubspaceResult, DspError>;
}

/// Subspace decomposition + source count → raw azimuths.
///
/// The source count is an explicit call parameter; implementations must not
/// carry it as mutable state between calls.
pub trait Localizer {
    fn localize(
        &mut self,
        subspace: &SubspaceResult,
        source_count: usize,
        band: &BandSelection,
    ) -> Result<Localization, DspError>;
}

/// Opaque array weights produced by the weight-synthesis capability
pub struct BeamWeights(pub Vec<(f32, f32)>);

/// Beam-weight synthesis and response sampling
pub trait BeamformerBackend {
    /// Compute array weights steering at `source` while suppressing
    /// `interferers`; positions are unit-circle (x, y) pairs
    fn synthesize(
        &mut self,
        source: (f32, f32),
        interferers: &[(f32, f32)],
        regularization: f32,
    ) -> Result<BeamWeights, DspError>;

    /// Sample the response magnitude of `weights` over `angle_grid`
    /// (degrees) at `frequency` (Hz)
    fn respond(
        &self,
        weights: &BeamWeights,
        angle_grid: &[f32],
        frequency: f32,
    ) -> Result<Vec<f32>, DspError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_mean_magnitudes() {
        let subspace = SubspaceResult {
            eigen_magnitudes: vec![vec![1.0, -3.0], vec![3.0, 5.0]],
            block_index: 0,
        };
        assert_eq!(subspace.column_mean_magnitudes(), vec![2.0, 4.0]);
    }

    #[test]
    fn test_empty_subspace() {
        let subspace = SubspaceResult {
            eigen_magnitudes: Vec::new(),
            block_index: 0,
        };
        assert!(subspace.column_mean_magnitudes().is_empty());
    }

    #[test]
    fn test_bin_range_matches_reference() {
        // 300-1000 Hz at 44.1 kHz with nfft 1024 -> bins 7..23
        let band = FrequencyBand {
            low_hz: 300.0,
            high_hz: 1000.0,
        };
        assert_eq!(band.bin_range(44_100, 1024), 7..23);
    }

    #[test]
    fn test_band_selection_carries_bins() {
        let band = FrequencyBand {
            low_hz: 300.0,
            high_hz: 1000.0,
        };
        let selection = band.select(44_100, 1024);
        assert_eq!(selection.bins, 7..23);
        assert_eq!(selection.band.low_hz, 300.0);
    }
}
