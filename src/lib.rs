//! # DOA Tracker
//!
//! Real-time multi-source direction-of-arrival tracking for microphone arrays.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        CAPTURE THREAD                            │
//! │  ┌─────────────┐                                                 │
//! │  │ Mic Array   │  fixed-size multichannel blocks (cpal callback) │
//! │  └──────┬──────┘                                                 │
//! │         ▼                                                        │
//! │  ┌──────────────────────────────────────────────────────────┐    │
//! │  │                Pipeline (pipeline::Pipeline)             │    │
//! │  │  Calibration → Subspace → Count → Localize → Assign →    │    │
//! │  │  Smooth → Beam synthesis                                 │    │
//! │  └──────────────────────────┬───────────────────────────────┘    │
//! │                             │ Frame (immutable)                  │
//! └─────────────────────────────┼────────────────────────────────────┘
//!                               ▼
//!                  ┌────────────────────────┐
//!                  │ FrameChannel           │  bounded, drop-oldest
//!                  └────────────┬───────────┘
//!                               │ latest wins
//! ┌─────────────────────────────┼────────────────────────────────────┐
//! │                        RENDER THREAD                             │
//! │  fixed-interval timer ──► drain channel ──► RenderSurface::draw  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The numerical array-processing capabilities (subspace decomposition,
//! azimuth localization, beam-weight synthesis) are external collaborators
//! behind the traits in [`dsp`]; the pipeline only reads aggregate
//! magnitudes and angle sets from them.

pub mod audio;
pub mod config;
pub mod dsp;
pub mod error;
pub mod frame;
pub mod pipeline;
pub mod render;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    /// Default sample rate of the array hardware
    pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

    /// Default channel count of the array
    pub const DEFAULT_CHANNELS: u16 = 8;

    /// Default samples per channel per block
    pub const DEFAULT_BLOCK_SIZE: u32 = 1200;

    /// Default number of track slots
    pub const DEFAULT_NUM_SOURCE: usize = 7;

    /// Frame channel capacity (frames pending between capture and render)
    pub const FRAME_CHANNEL_CAPACITY: usize = 8;

    /// Candidate azimuth grid: 0..=180 degrees at 1 degree steps
    pub const CANDIDATE_GRID_LEN: usize = 181;

    /// Beam response grid: 0..180 degrees at 1 degree steps
    pub const BEAM_GRID_LEN: usize = 180;

    /// Azimuth value marking a track slot as unassigned
    pub const UNASSIGNED_AZIMUTH: f32 = 0.0;

    /// Sentinel written into consumed assignment-matrix rows/columns.
    /// Infinite so it stays larger than any real angular distance even
    /// when the display remap pushes azimuths past 360 degrees.
    pub const DISTANCE_SENTINEL: f32 = f32::INFINITY;

    /// Ceiling for a calibration gain when a channel has zero variance
    pub const MAX_CHANNEL_GAIN: f32 = 1.0e6;
}
