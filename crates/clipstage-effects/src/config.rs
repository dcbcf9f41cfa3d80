//! Stage configuration.
//!
//! [`StageConfig`] carries everything fixed at construction: sample rate,
//! block length, oversampling factor, the FIR table, per-curve tuning
//! overrides and the initial controls. With the `serde` feature it loads
//! from and saves to TOML:
//!
//! ```toml
//! sample_rate = 48000.0
//! block_len = 256
//! oversample_factor = 5
//!
//! [controls]
//! curve = "tanh"
//! drive = 0.7
//! tone = 0.6
//!
//! [[tuning]]
//! curve = "tanh"
//! gain_scale = 1.0
//! gain_offset = 1.0
//! output_scale = 0.9
//! ```
//!
//! Omitted fields keep their defaults. An omitted `coefficients` array
//! selects the built-in 75-tap table.

use clipstage_core::{
    ConfigError, DEFAULT_OVERSAMPLE_FACTOR, DriveCurve, DriveTuning, FirCoefficients,
    MAX_BLOCK_LEN, MAX_OVERSAMPLE_FACTOR,
};
#[cfg(feature = "serde")]
use std::path::Path;

use crate::error::StageError;
use crate::params::{Controls, TuningTable};

/// Default host sample rate.
pub const DEFAULT_SAMPLE_RATE: f32 = 44_100.0;

/// Default host block length.
pub const DEFAULT_BLOCK_LEN: usize = 128;

/// One per-curve tuning override.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TuningOverride {
    /// Curve the tuning applies to.
    #[cfg_attr(feature = "serde", serde(with = "curve_name"))]
    pub curve: DriveCurve,
    /// Multiplier on `drive² · 150`.
    pub gain_scale: f32,
    /// Pre-gain at zero drive.
    pub gain_offset: f32,
    /// Output compensation.
    pub output_scale: f32,
}

impl TuningOverride {
    /// Override `curve` with `tuning`.
    pub fn new(curve: DriveCurve, tuning: DriveTuning) -> Self {
        Self {
            curve,
            gain_scale: tuning.gain_scale,
            gain_offset: tuning.gain_offset,
            output_scale: tuning.output_scale,
        }
    }

    /// The tuning value.
    pub fn tuning(&self) -> DriveTuning {
        DriveTuning::new(self.gain_scale, self.gain_offset, self.output_scale)
    }
}

/// Construction-time configuration for a
/// [`NonlinearStage`](crate::NonlinearStage).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StageConfig {
    /// Host sample rate in Hz.
    pub sample_rate: f32,
    /// Largest block the host will hand over.
    pub block_len: usize,
    /// Oversampling factor used when oversampling is requested.
    pub oversample_factor: usize,
    /// Custom FIR taps; `None` selects the built-in table.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub coefficients: Option<Vec<f32>>,
    /// Controls in effect before the first setter call.
    pub controls: Controls,
    /// Per-curve tuning overrides, applied in order.
    #[cfg_attr(feature = "serde", serde(rename = "tuning"))]
    pub tunings: Vec<TuningOverride>,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            block_len: DEFAULT_BLOCK_LEN,
            oversample_factor: DEFAULT_OVERSAMPLE_FACTOR,
            coefficients: None,
            controls: Controls::default(),
            tunings: Vec::new(),
        }
    }
}

impl StageConfig {
    /// Set the host sample rate.
    pub fn with_sample_rate(mut self, sample_rate: f32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Set the block length.
    pub fn with_block_len(mut self, block_len: usize) -> Self {
        self.block_len = block_len;
        self
    }

    /// Set the oversampling factor.
    pub fn with_oversample_factor(mut self, factor: usize) -> Self {
        self.oversample_factor = factor;
        self
    }

    /// Use a custom FIR table.
    pub fn with_coefficients(mut self, taps: impl Into<Vec<f32>>) -> Self {
        self.coefficients = Some(taps.into());
        self
    }

    /// Override the tuning of one curve.
    pub fn with_tuning(mut self, curve: DriveCurve, tuning: DriveTuning) -> Self {
        self.tunings.push(TuningOverride::new(curve, tuning));
        self
    }

    /// Set the initial controls.
    pub fn with_controls(mut self, controls: Controls) -> Self {
        self.controls = controls;
        self
    }

    /// Check rate, block length and factor.
    pub fn validate(&self) -> Result<(), StageError> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(StageError::InvalidSampleRate(self.sample_rate));
        }
        if self.block_len == 0 || self.block_len > MAX_BLOCK_LEN {
            return Err(ConfigError::InvalidBlockLength {
                len: self.block_len,
                max: MAX_BLOCK_LEN,
            }
            .into());
        }
        if self.oversample_factor == 0 || self.oversample_factor > MAX_OVERSAMPLE_FACTOR {
            return Err(ConfigError::InvalidFactor {
                factor: self.oversample_factor,
                max: MAX_OVERSAMPLE_FACTOR,
            }
            .into());
        }
        Ok(())
    }

    /// Build the validated FIR table.
    pub fn filter_coefficients(&self) -> Result<FirCoefficients, StageError> {
        match &self.coefficients {
            Some(taps) => Ok(FirCoefficients::new(taps)?),
            None => Ok(FirCoefficients::default_lowpass()),
        }
    }

    /// Default tunings with every override applied.
    pub fn tuning_table(&self) -> Result<TuningTable, StageError> {
        let mut table = TuningTable::default();
        for o in &self.tunings {
            table.set(o.curve, o.tuning())?;
        }
        Ok(table)
    }
}

#[cfg(feature = "serde")]
impl StageConfig {
    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StageError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| StageError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Load a configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, StageError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Convert the configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String, StageError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Serialize a [`DriveCurve`] as its name.
#[cfg(feature = "serde")]
pub(crate) mod curve_name {
    use clipstage_core::DriveCurve;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(curve: &DriveCurve, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(curve.name())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DriveCurve, D::Error> {
        let name = String::deserialize(d)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}
