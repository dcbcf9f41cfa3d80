//! One-pole lowpass filter for tone shaping.
//!
//! A single-pole IIR lowpass with the difference equation:
//!
//! ```text
//! y[n] = y[n-1] + alpha * (x[n] - y[n-1])
//! ```
//!
//! where `alpha = 1 - exp(-2π * freq / sample_rate)` (see [`omega`]).
//!
//! 6 dB/octave rolloff, zero latency, one multiply per sample. The clipping
//! stage cascades two of these after the drive curve to tame the
//! harshness of clipping-generated harmonics, and [`DcBlocker`](crate::DcBlocker)
//! derives its highpass from the same recurrence.
//!
//! # Usage
//!
//! ```rust
//! use clipstage_core::OnePole;
//!
//! let mut lp = OnePole::new(48000.0, 4000.0);
//! let filtered = lp.process(1.0);
//! assert!(filtered < 1.0); // first sample only moves part of the way
//! ```
//!
//! # Reference
//!
//! Julius O. Smith III, "Introduction to Digital Filters with Audio Applications",
//! Section: One-Pole Filter.

use crate::flush_denormal;
use libm::expf;

/// Map a corner frequency to a one-pole coefficient.
///
/// `alpha = 1 − exp(−2π · freq / sample_rate)`, clamped to `[0, 1]`.
/// Pass the *effective* sample rate: the oversampled rate when the stage is
/// running oversampled.
///
/// # Example
/// ```rust
/// use clipstage_core::omega;
///
/// let a = omega(1000.0, 44100.0);
/// assert!(a > 0.13 && a < 0.14);
/// ```
#[inline]
pub fn omega(freq_hz: f32, sample_rate: f32) -> f32 {
    if sample_rate <= 0.0 {
        return 1.0;
    }
    (1.0 - expf(-core::f32::consts::TAU * freq_hz / sample_rate)).clamp(0.0, 1.0)
}

/// One-pole (6 dB/oct) lowpass filter.
///
/// # Invariants
///
/// - `alpha` is always in `[0, 1]` for stable operation
/// - `state` is flushed to zero when below 1e-20 (denormal protection)
#[derive(Debug, Clone, Default)]
pub struct OnePole {
    state: f32,
    alpha: f32,
}

impl OnePole {
    /// Create a new one-pole lowpass filter.
    ///
    /// # Arguments
    ///
    /// * `sample_rate` - Effective sample rate in Hz
    /// * `freq_hz` - Cutoff frequency in Hz
    pub fn new(sample_rate: f32, freq_hz: f32) -> Self {
        Self::with_alpha(omega(freq_hz, sample_rate))
    }

    /// Create a filter from a precomputed coefficient.
    pub fn with_alpha(alpha: f32) -> Self {
        Self {
            state: 0.0,
            alpha: alpha.clamp(0.0, 1.0),
        }
    }

    /// Set the coefficient directly, keeping the filter memory.
    #[inline]
    pub fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha.clamp(0.0, 1.0);
    }

    /// Recompute the coefficient for a new cutoff.
    pub fn set_frequency(&mut self, freq_hz: f32, sample_rate: f32) {
        self.alpha = omega(freq_hz, sample_rate);
    }

    /// Current coefficient.
    #[inline]
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Current filter memory (last output).
    #[inline]
    pub fn state(&self) -> f32 {
        self.state
    }

    /// Process one sample through the lowpass filter.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        self.state = flush_denormal(self.state + (input - self.state) * self.alpha);
        self.state
    }

    /// Reset filter memory to zero.
    pub fn reset(&mut self) {
        self.state = 0.0;
    }
}
