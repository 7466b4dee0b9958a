//! Multichannel audio blocks
//!
//! The capture callback deinterleaves each cpal buffer into an
//! [`AudioBlock`], the unit consumed by the processing pipeline.

/// One fixed-duration block of multichannel audio.
///
/// Owned exclusively by the capture thread until handed to processing;
/// the pipeline scales it in place during calibrated operation but it is
/// never shared across threads.
#[derive(Clone)]
pub struct AudioBlock {
    /// Per-channel sample buffers, all the same length
    channels: Vec<Vec<f32>>,
    /// Monotonic block index assigned at capture
    pub index: u64,
    /// Nominal sample rate in Hz
    pub sample_rate: u32,
}

impl AudioBlock {
    /// Build a block from an interleaved cpal buffer.
    ///
    /// Trailing samples that do not fill a whole interleaved frame are
    /// dropped.
    pub fn from_interleaved(data: &[f32], channels: u16, index: u64, sample_rate: u32) -> Self {
        let n_ch = channels as usize;
        let samples_per_channel = data.len() / n_ch;
        let mut bufs = vec![Vec::with_capacity(samples_per_channel); n_ch];
        for frame in data.chunks_exact(n_ch) {
            for (ch, &sample) in frame.iter().enumerate() {
                bufs[ch].push(sample);
            }
        }
        Self {
            channels: bufs,
            index,
            sample_rate,
        }
    }

    /// Build a block directly from per-channel buffers
    pub fn from_channels(channels: Vec<Vec<f32>>, index: u64, sample_rate: u32) -> Self {
        debug_assert!(channels.windows(2).all(|w| w[0].len() == w[1].len()));
        Self {
            channels,
            index,
            sample_rate,
        }
    }

    /// Number of channels
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel
    pub fn samples_per_channel(&self) -> usize {
        self.channels.first().map_or(0, |c| c.len())
    }

    /// One channel's samples
    pub fn channel(&self, ch: usize) -> &[f32] {
        &self.channels[ch]
    }

    /// Iterate over channels
    pub fn channels(&self) -> impl Iterator<Item = &[f32]> {
        self.channels.iter().map(|c| c.as_slice())
    }

    /// Multiply every sample of channel `ch` by `gain`
    pub fn scale_channel(&mut self, ch: usize, gain: f32) {
        for sample in &mut self.channels[ch] {
            *sample *= gain;
        }
    }

    /// Block duration in microseconds at the nominal rate
    pub fn duration_us(&self) -> u64 {
        (self.samples_per_channel() as u64 * 1_000_000) / self.sample_rate as u64
    }
}
