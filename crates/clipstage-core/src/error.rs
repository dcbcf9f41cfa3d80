//! Error types for stage configuration.
//!
//! The per-sample path is total and never fails. The only recoverable
//! failure is building the oversampling filters, which is reported here and
//! handled by falling back to direct-rate processing.

use thiserror::Error;

/// Errors raised while building FIR kernels or the oversampler.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// The coefficient table has no taps.
    #[error("coefficient table is empty")]
    EmptyCoefficients,

    /// The coefficient table exceeds the supported tap count.
    #[error("coefficient table has {taps} taps, at most {max} are supported")]
    TooManyTaps {
        /// Number of taps supplied.
        taps: usize,
        /// Maximum supported tap count.
        max: usize,
    },

    /// A tap is NaN or infinite.
    #[error("coefficient {index} is not finite")]
    NonFiniteCoefficient {
        /// Index of the offending tap.
        index: usize,
    },

    /// The rate-change factor is out of range.
    #[error("rate-change factor {factor} is outside 1..={max}")]
    InvalidFactor {
        /// Requested factor.
        factor: usize,
        /// Maximum supported factor.
        max: usize,
    },

    /// The block length is zero or too large for the state buffers.
    #[error("block length {len} is outside 1..={max}")]
    InvalidBlockLength {
        /// Requested block length.
        len: usize,
        /// Maximum supported block length.
        max: usize,
    },
}
