//! Error types for stage configuration.

use clipstage_core::{ConfigError, DriveCurve, ParseCurveError};
use thiserror::Error;

#[cfg(feature = "serde")]
use std::path::PathBuf;

/// Errors raised while building or configuring a stage.
///
/// None of these can occur on the audio path. Oversampling setup failures
/// are not errors either: [`NonlinearStage::begin`](crate::NonlinearStage::begin)
/// reports them by returning `false` and falls back to the direct rate.
#[derive(Debug, Error)]
pub enum StageError {
    /// Coefficient table or rate configuration rejected by the core
    #[error("invalid filter configuration: {0}")]
    Filter(#[from] ConfigError),

    /// Curve name not recognized
    #[error(transparent)]
    UnknownCurve(#[from] ParseCurveError),

    /// Sample rate is not a positive finite number
    #[error("invalid sample rate: {0}")]
    InvalidSampleRate(f32),

    /// A tuning contains a non-finite value
    #[error("tuning for curve '{curve}' must be finite")]
    NonFiniteTuning {
        /// Curve whose tuning was rejected.
        curve: DriveCurve,
    },

    /// Failed to read a configuration file
    #[cfg(feature = "serde")]
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[cfg(feature = "serde")]
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[cfg(feature = "serde")]
    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

#[cfg(feature = "serde")]
impl StageError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StageError::ReadFile {
            path: path.into(),
            source,
        }
    }
}
