//! Beam-response synthesis for the strongest tracks
//!
//! Beam patterns are only meaningful (and affordable) for a small number
//! of simultaneous steer directions, so the synthesizer caps the number of
//! tracks it renders regardless of how many sources were detected. Each
//! selected track is steered at while the other selected tracks are
//! treated as interferers.

use std::f32::consts::PI;

use crate::config::BeamConfig;
use crate::constants::BEAM_GRID_LEN;
use crate::dsp::BeamformerBackend;
use crate::error::DspError;
use crate::frame::BeamResponse;
use crate::pipeline::tracking::TrackingState;

/// Wraps the external weight-synthesis capability and samples responses
/// over the fixed angle grid
pub struct BeamSynthesizer {
    max_beams: usize,
    eval_frequency: f32,
    regularization: f32,
    /// 0..180 degrees at 1 degree steps
    angle_grid: Vec<f32>,
}

impl BeamSynthesizer {
    pub fn new(config: &BeamConfig) -> Self {
        Self {
            max_beams: config.max_beams,
            eval_frequency: config.eval_frequency,
            regularization: config.regularization,
            angle_grid: (0..BEAM_GRID_LEN).map(|d| d as f32).collect(),
        }
    }

    /// Synthesize one response per selected track. `source_count` is the
    /// block's estimated source count; at most `max_beams` of the leading
    /// assigned slots are selected.
    pub fn synthesize(
        &self,
        backend: &mut dyn BeamformerBackend,
        state: &TrackingState,
        source_count: usize,
    ) -> Result<Vec<BeamResponse>, DspError> {
        let selected: Vec<(usize, f32)> = state
            .slots()
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_assigned())
            .map(|(i, slot)| (i, slot.azimuth))
            .take(source_count.min(self.max_beams))
            .collect();

        let positions: Vec<(f32, f32)> = selected
            .iter()
            .map(|(_, az)| {
                let rad = az * PI / 180.0;
                (rad.cos(), rad.sin())
            })
            .collect();

        let mut responses = Vec::with_capacity(selected.len());
        for (i, &(slot, azimuth)) in selected.iter().enumerate() {
            let interferers: Vec<(f32, f32)> = positions
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, &p)| p)
                .collect();

            let weights = backend.synthesize(positions[i], &interferers, self.regularization)?;
            let magnitudes = backend.respond(&weights, &self.angle_grid, self.eval_frequency)?;

            responses.push(BeamResponse {
                slot,
                azimuth,
                magnitudes,
            });
        }

        Ok(responses)
    }
}
