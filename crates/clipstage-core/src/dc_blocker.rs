//! DC blocking filter for removing offset and sub-bass from audio signals.
//!
//! A first-order highpass built by subtracting a one-pole lowpass from its
//! input:
//!
//! ```text
//! lp[n] = lp[n-1] + alpha * (x[n] - lp[n-1])
//! y[n]  = x[n] - lp[n]
//! ```
//!
//! With `alpha = omega(f_c, f_s)` this has its -3 dB point near `f_c`. The
//! clipping stage uses it twice: a tunable pre-curve highpass (50–400 Hz) so
//! input offset and low end do not bias the nonlinearity, and a fixed 50 Hz
//! post-curve highpass that removes the offset the nonlinearity introduces.

use crate::OnePole;

/// One-pole highpass / DC blocker.
///
/// ## Example
///
/// ```rust
/// use clipstage_core::DcBlocker;
///
/// let mut blocker = DcBlocker::new(48000.0, 20.0);
///
/// let mut out = 0.0;
/// for _ in 0..48000 {
///     out = blocker.process(0.5);
/// }
/// assert!(out.abs() < 1e-3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DcBlocker {
    lowpass: OnePole,
}

impl DcBlocker {
    /// Create a DC blocker with the given corner frequency.
    ///
    /// # Arguments
    /// * `sample_rate` - Effective sample rate in Hz
    /// * `cutoff_hz` - Corner frequency in Hz
    pub fn new(sample_rate: f32, cutoff_hz: f32) -> Self {
        Self {
            lowpass: OnePole::new(sample_rate, cutoff_hz),
        }
    }

    /// Create a DC blocker from a precomputed one-pole coefficient.
    pub fn with_alpha(alpha: f32) -> Self {
        Self {
            lowpass: OnePole::with_alpha(alpha),
        }
    }

    /// Set the coefficient, keeping the filter memory.
    #[inline]
    pub fn set_alpha(&mut self, alpha: f32) {
        self.lowpass.set_alpha(alpha);
    }

    /// Current coefficient.
    #[inline]
    pub fn alpha(&self) -> f32 {
        self.lowpass.alpha()
    }

    /// Process a single sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        input - self.lowpass.process(input)
    }

    /// Reset the filter memory to zero.
    pub fn reset(&mut self) {
        self.lowpass.reset();
    }
}
