//! Application configuration
//!
//! Loaded from a TOML file; every field has a deployment default matching
//! the reference array (8-channel linear array at 44.1 kHz).

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::constants::*;
use crate::error::ConfigError;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub capture: CaptureConfig,
    pub tracking: TrackingConfig,
    pub beam: BeamConfig,
    pub display: DisplayConfig,
}

/// Capture device settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Device id as reported by device listing; `None` selects the default
    /// input device
    pub device_id: Option<String>,
    pub channels: u16,
    pub sample_rate: u32,
    /// Samples per channel per block
    pub block_size: u32,
}

/// Source counting, localization, and track smoothing settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Number of persistent track slots
    pub num_source: usize,
    /// Calibration window length in blocks
    pub init_blocks: usize,
    /// Eigen-magnitude threshold for source counting
    pub eig_threshold: f32,
    /// Updates with a larger angular jump than this are rejected (degrees)
    pub angle_jump_threshold: f32,
    /// Exponential smoothing coefficient, in (0, 1)
    pub smoothing_factor: f32,
    /// Transform length used by the spectral analysis capability
    pub nfft: usize,
    /// Lower edge of the localization band (Hz)
    pub freq_low: f32,
    /// Upper edge of the localization band (Hz)
    pub freq_high: f32,
}

/// Beam-response synthesis settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BeamConfig {
    /// Frequency at which beam responses are evaluated (Hz)
    pub eval_frequency: f32,
    /// Beam patterns are synthesized for at most this many tracks
    pub max_beams: usize,
    /// Regularization constant passed to the weight synthesis capability
    pub regularization: f32,
}

/// Render loop and display-remap settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Render timer tick in milliseconds
    pub render_interval_ms: u64,
    /// Center angle of the azimuth display remap (degrees)
    pub remap_center: f32,
    /// Scale of the azimuth display remap (1.0 = identity)
    pub remap_scale: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
            tracking: TrackingConfig::default(),
            beam: BeamConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device_id: None,
            channels: DEFAULT_CHANNELS,
            sample_rate: DEFAULT_SAMPLE_RATE,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            num_source: DEFAULT_NUM_SOURCE,
            init_blocks: 10,
            eig_threshold: 100_000.0,
            angle_jump_threshold: 15.0,
            smoothing_factor: 0.9,
            nfft: 1024,
            freq_low: 300.0,
            freq_high: 1000.0,
        }
    }
}

impl Default for BeamConfig {
    fn default() -> Self {
        Self {
            eval_frequency: 700.0,
            max_beams: 2,
            regularization: 1e-6,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            render_interval_ms: 30,
            remap_center: 90.0,
            remap_scale: 1.7,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(format!("{}: {}", path.display(), e)))?;
        let config: AppConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the platform config directory if a file exists there,
    /// otherwise fall back to defaults
    pub fn load_or_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Platform config file location (e.g. `~/.config/doa-tracker/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "doa-tracker")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Check cross-field and range constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capture.channels == 0 {
            return Err(ConfigError::InvalidValue {
                field: "capture.channels",
                reason: "must be nonzero".into(),
            });
        }
        if self.capture.sample_rate == 0 {
            return Err(ConfigError::InvalidValue {
                field: "capture.sample_rate",
                reason: "must be nonzero".into(),
            });
        }
        if self.capture.block_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "capture.block_size",
                reason: "must be nonzero".into(),
            });
        }
        if self.tracking.num_source == 0 {
            return Err(ConfigError::InvalidValue {
                field: "tracking.num_source",
                reason: "must be nonzero".into(),
            });
        }
        let alpha = self.tracking.smoothing_factor;
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "tracking.smoothing_factor",
                reason: format!("{alpha} is outside (0, 1)"),
            });
        }
        if self.tracking.init_blocks == 0 {
            return Err(ConfigError::InvalidValue {
                field: "tracking.init_blocks",
                reason: "must be nonzero".into(),
            });
        }
        if self.tracking.freq_low >= self.tracking.freq_high {
            return Err(ConfigError::InvalidValue {
                field: "tracking.freq_low",
                reason: "band must have freq_low < freq_high".into(),
            });
        }
        if self.beam.max_beams == 0 {
            return Err(ConfigError::InvalidValue {
                field: "beam.max_beams",
                reason: "must be nonzero".into(),
            });
        }
        Ok(())
    }
}
