//! Deterministic stand-in capabilities
//!
//! Used by the test suite and the binary's bring-up mode when the real
//! numerical backend is not wired in. The analyzer and localizer replay a
//! scripted scene of source azimuths; the beamformer models a uniform
//! linear array with steering plus interferer deflation. Complex values are
//! `(re, im)` tuples to keep the module self-contained.

use parking_lot::Mutex;
use std::f32::consts::PI;
use std::sync::Arc;

use crate::audio::AudioBlock;
use crate::constants::CANDIDATE_GRID_LEN;
use crate::dsp::{
    BandSelection, BeamWeights, BeamformerBackend, Localization, Localizer, SpectralAnalyzer,
    SubspaceResult,
};
use crate::error::DspError;

type C32 = (f32, f32);

#[inline]
fn c_mul(a: C32, b: C32) -> C32 {
    (a.0 * b.0 - a.1 * b.1, a.0 * b.1 + a.1 * b.0)
}

#[inline]
fn c_conj(a: C32) -> C32 {
    (a.0, -a.1)
}

#[inline]
fn c_abs(a: C32) -> f32 {
    (a.0 * a.0 + a.1 * a.1).sqrt()
}

#[inline]
fn c_exp(phase: f32) -> C32 {
    (phase.cos(), phase.sin())
}

/// A scripted acoustic scene shared between the synthetic analyzer and
/// localizer. Tests mutate it between blocks to move sources.
pub struct ScriptedScene {
    sources: Mutex<Vec<f32>>,
}

impl ScriptedScene {
    /// Create a scene with the given source azimuths (degrees)
    pub fn new(azimuths: Vec<f32>) -> Arc<Self> {
        Arc::new(Self {
            sources: Mutex::new(azimuths),
        })
    }

    /// Replace the active sources
    pub fn set_sources(&self, azimuths: Vec<f32>) {
        *self.sources.lock() = azimuths;
    }

    fn sources(&self) -> Vec<f32> {
        self.sources.lock().clone()
    }
}

/// Synthetic subspace decomposition: emits one strong eigen column per
/// scripted source and weak columns for the rest of the array
pub struct SyntheticAnalyzer {
    scene: Arc<ScriptedScene>,
    channels: usize,
    bins: usize,
    strong_magnitude: f32,
    weak_magnitude: f32,
}

impl SyntheticAnalyzer {
    pub fn new(scene: Arc<ScriptedScene>, channels: usize, eig_threshold: f32) -> Self {
        Self {
            scene,
            channels,
            bins: 16,
            strong_magnitude: eig_threshold * 10.0,
            weak_magnitude: eig_threshold / 10.0,
        }
    }
}

impl SpectralAnalyzer for SyntheticAnalyzer {
    fn analyze(&mut self, block: &AudioBlock) -> Result<SubspaceResult, DspError> {
        if block.channel_count() != self.channels {
            return Err(DspError::DimensionMismatch {
                expected: self.channels,
                actual: block.channel_count(),
            });
        }

        let active = self.scene.sources().len().min(self.channels);
        let row: Vec<f32> = (0..self.channels)
            .map(|col| {
                // noise columns first, signal columns last
                if col >= self.channels - active {
                    self.strong_magnitude
                } else {
                    self.weak_magnitude
                }
            })
            .collect();

        Ok(SubspaceResult {
            eigen_magnitudes: vec![row; self.bins],
            block_index: block.index,
        })
    }
}

/// Synthetic localizer: replays the scripted azimuths and paints a
/// Gaussian bump per source on the candidate grid
pub struct SyntheticLocalizer {
    scene: Arc<ScriptedScene>,
}

impl SyntheticLocalizer {
    pub fn new(scene: Arc<ScriptedScene>) -> Self {
        Self { scene }
    }
}

impl Localizer for SyntheticLocalizer {
    fn localize(
        &mut self,
        _subspace: &SubspaceResult,
        source_count: usize,
        _band: &BandSelection,
    ) -> Result<Localization, DspError> {
        let sources = self.scene.sources();
        let azimuths: Vec<f32> = sources.iter().copied().take(source_count).collect();

        let mut spectrum = vec![0.0f32; CANDIDATE_GRID_LEN];
        for (i, value) in spectrum.iter_mut().enumerate() {
            for &az in &azimuths {
                let d = i as f32 - az;
                *value += (-d * d / 50.0).exp();
            }
        }

        Ok(Localization { azimuths, spectrum })
    }
}

/// Uniform-linear-array beamformer: conjugate steering weights with
/// sequential deflation of interferer steering vectors
pub struct UlaBeamformer {
    elements: usize,
    spacing_m: f32,
    sound_speed_mps: f32,
}

impl UlaBeamformer {
    pub fn new(elements: usize, spacing_m: f32) -> Self {
        Self {
            elements,
            spacing_m,
            sound_speed_mps: 343.0,
        }
    }

    /// Steering phasors for a unit-circle direction at wavenumber `k`.
    /// For a linear array on the x axis the phase depends only on the x
    /// component of the direction.
    fn steering(&self, direction_x: f32, k: f32) -> Vec<C32> {
        (0..self.elements)
            .map(|n| c_exp(k * self.spacing_m * n as f32 * direction_x))
            .collect()
    }

    fn wavenumber(&self, frequency: f32) -> f32 {
        2.0 * PI * frequency / self.sound_speed_mps
    }
}

/// Design frequency for the synthetic weights; responses stay meaningful
/// when sampled near it
const DESIGN_FREQUENCY_HZ: f32 = 700.0;

impl BeamformerBackend for UlaBeamformer {
    fn synthesize(
        &mut self,
        source: (f32, f32),
        interferers: &[(f32, f32)],
        regularization: f32,
    ) -> Result<BeamWeights, DspError> {
        if self.elements == 0 {
            return Err(DspError::Beamforming("array has no elements".to_string()));
        }

        let k = self.wavenumber(DESIGN_FREQUENCY_HZ);
        let mut weights = self.steering(source.0, k);

        // Deflate each interferer steering vector out of the weights
        for interferer in interferers {
            let steer = self.steering(interferer.0, k);
            let mut inner: C32 = (0.0, 0.0);
            let mut norm_sq = 0.0f32;
            for (w, s) in weights.iter().zip(&steer) {
                let p = c_mul(*w, c_conj(*s));
                inner = (inner.0 + p.0, inner.1 + p.1);
                norm_sq += c_abs(*s) * c_abs(*s);
            }
            let denom = norm_sq + regularization;
            let coeff = (inner.0 / denom, inner.1 / denom);
            for (w, s) in weights.iter_mut().zip(&steer) {
                let proj = c_mul(coeff, *s);
                *w = (w.0 - proj.0, w.1 - proj.1);
            }
        }

        let norm: f32 = weights.iter().map(|w| c_abs(*w) * c_abs(*w)).sum::<f32>().sqrt();
        if norm > 0.0 {
            for w in &mut weights {
                *w = (w.0 / norm, w.1 / norm);
            }
        }

        Ok(BeamWeights(weights))
    }

    fn respond(
        &self,
        weights: &BeamWeights,
        angle_grid: &[f32],
        frequency: f32,
    ) -> Result<Vec<f32>, DspError> {
        if weights.0.len() != self.elements {
            return Err(DspError::DimensionMismatch {
                expected: self.elements,
                actual: weights.0.len(),
            });
        }

        let k = self.wavenumber(frequency);
        let response = angle_grid
            .iter()
            .map(|deg| {
                let dir_x = (deg * PI / 180.0).cos();
                let steer = self.steering(dir_x, k);
                let mut acc: C32 = (0.0, 0.0);
                for (w, s) in weights.0.iter().zip(&steer) {
                    let p = c_mul(c_conj(*w), *s);
                    acc = (acc.0 + p.0, acc.1 + p.1);
                }
                c_abs(acc)
            })
            .collect();

        Ok(response)
    }
}
