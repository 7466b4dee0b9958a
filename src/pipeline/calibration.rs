//! Per-channel gain calibration
//!
//! The first `init_blocks` blocks are used to estimate a per-channel gain
//! `1 / sqrt(variance)`; on the block immediately after the window the
//! per-block gains are averaged channel-wise and frozen. From then on the
//! stage is a pure elementwise scale of each incoming block.

use crate::audio::AudioBlock;
use crate::constants::MAX_CHANNEL_GAIN;

/// Calibration phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationPhase {
    /// Accumulating per-block gain estimates
    Calibrating,
    /// Gains are frozen; blocks are scaled in place
    Ready,
}

/// Outcome of ingesting one block
#[derive(Debug, Clone, Copy)]
pub struct CalibrationOutcome {
    pub phase: CalibrationPhase,
    /// True if a zero-variance channel forced a clamped gain this block
    pub degraded: bool,
}

/// Gain calibration stage. Gains are write-once: computed while
/// calibrating, frozen on the transition to ready, never mutated after.
pub struct CalibrationStage {
    init_blocks: usize,
    blocks_observed: usize,
    /// One gain vector per observed calibration block
    per_block_gains: Vec<Vec<f32>>,
    /// Frozen channel gains, valid once ready
    gains: Vec<f32>,
    phase: CalibrationPhase,
    degraded_blocks: u64,
}

impl CalibrationStage {
    pub fn new(init_blocks: usize) -> Self {
        Self {
            init_blocks,
            blocks_observed: 0,
            per_block_gains: Vec::with_capacity(init_blocks),
            gains: Vec::new(),
            phase: CalibrationPhase::Calibrating,
            degraded_blocks: 0,
        }
    }

    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    /// Frozen gain vector; empty until ready
    pub fn gains(&self) -> &[f32] {
        &self.gains
    }

    /// Blocks flagged degraded so far
    pub fn degraded_blocks(&self) -> u64 {
        self.degraded_blocks
    }

    /// Observe one block. While calibrating, records gain estimates and
    /// leaves the block untouched; once ready, scales the block in place
    /// by the frozen gains.
    pub fn ingest(&mut self, block: &mut AudioBlock) -> CalibrationOutcome {
        let mut degraded = false;

        match self.phase {
            CalibrationPhase::Calibrating => {
                if self.blocks_observed < self.init_blocks {
                    let gains: Vec<f32> = block
                        .channels()
                        .map(|samples| {
                            let v = variance(samples);
                            if v > 0.0 {
                                let g = 1.0 / v.sqrt();
                                if g.is_finite() && g <= MAX_CHANNEL_GAIN {
                                    g
                                } else {
                                    degraded = true;
                                    MAX_CHANNEL_GAIN
                                }
                            } else {
                                degraded = true;
                                MAX_CHANNEL_GAIN
                            }
                        })
                        .collect();
                    self.per_block_gains.push(gains);
                    self.blocks_observed += 1;
                } else {
                    // Block init_blocks: average the stored gains
                    // channel-wise and freeze. Happens exactly once.
                    let channels = block.channel_count();
                    let mut averaged = vec![0.0f32; channels];
                    for gains in &self.per_block_gains {
                        for (avg, &g) in averaged.iter_mut().zip(gains.iter()) {
                            *avg += g;
                        }
                    }
                    for avg in &mut averaged {
                        *avg /= self.per_block_gains.len() as f32;
                    }
                    self.gains = averaged;
                    self.per_block_gains.clear();
                    self.phase = CalibrationPhase::Ready;
                    self.blocks_observed += 1;
                }
            }
            CalibrationPhase::Ready => {
                for ch in 0..block.channel_count() {
                    let gain = self.gains.get(ch).copied().unwrap_or(1.0);
                    block.scale_channel(ch, gain);
                }
                self.blocks_observed += 1;
            }
        }

        if degraded {
            self.degraded_blocks += 1;
        }

        CalibrationOutcome {
            phase: self.phase,
            degraded,
        }
    }
}

/// Population variance
fn variance(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let n = samples.len() as f32;
    let mean = samples.iter().sum::<f32>() / n;
    samples.iter().map(|s| (s - mean) * (s - mean)).sum::<f32>() / n
}
