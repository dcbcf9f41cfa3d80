//! Block oversampler for anti-aliased nonlinear processing.
//!
//! Nonlinear stages (clipping, waveshaping, saturation) generate harmonics
//! that can exceed Nyquist and alias back into the audible range.
//! Oversampling mitigates this by:
//!
//! 1. **Upsampling**: Increase sample rate by factor N (FIR interpolation)
//! 2. **Processing**: Run the nonlinearity at N× sample rate
//! 3. **Downsampling**: Band-limit with the same FIR and keep every N-th sample
//!
//! ## Usage
//!
//! ```rust
//! use clipstage_core::{FirCoefficients, Oversampler, hard_clip};
//!
//! let coeffs = FirCoefficients::default_lowpass();
//! let mut os = Oversampler::new(5, &coeffs, 64).unwrap();
//!
//! let mut block = [0.9f32; 64];
//! os.process_block(&mut block, |hi_rate| {
//!     for s in hi_rate.iter_mut() {
//!         *s = hard_clip(*s * 4.0, 1.0);
//!     }
//! });
//! ```

use crate::{ConfigError, FirCoefficients, FirDecimator, FirInterpolator};

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

/// Maximum supported oversampling factor.
pub const MAX_OVERSAMPLE_FACTOR: usize = 16;

/// Oversampling factor used by the default configuration.
pub const DEFAULT_OVERSAMPLE_FACTOR: usize = 5;

/// Largest block length the state buffers can be sized for.
pub const MAX_BLOCK_LEN: usize = 4096;

/// Matched interpolate/decimate pair around a fixed rate factor.
///
/// Both halves are built from one [`FirCoefficients`] table, so the
/// band-limiting applied on the way up matches the way down.
///
/// # Signal Path
///
/// ```text
/// block (n) → FirInterpolator → work buffer (n × N) → user closure → FirDecimator → block (n)
/// ```
///
/// # Memory Usage
///
/// Everything is allocated in [`new`](Self::new):
/// - work buffer: `block_len × factor` samples
/// - interpolator history: `ceil(taps / factor) + block_len − 1` samples
/// - decimator history: `taps + block_len × factor − 1` samples
#[derive(Debug, Clone)]
pub struct Oversampler {
    factor: usize,
    block_len: usize,
    interpolator: FirInterpolator,
    decimator: FirDecimator,
    /// High-rate buffer between the two kernels.
    work: Vec<f32>,
    /// Length of the block currently in `work` (base-rate samples).
    active_len: usize,
}

impl Oversampler {
    /// Build the oversampler.
    ///
    /// # Arguments
    /// * `factor` - Rate-change factor (2 to [`MAX_OVERSAMPLE_FACTOR`])
    /// * `coefficients` - Shared low-pass table
    /// * `block_len` - Largest base-rate block that will be processed
    ///
    /// # Errors
    /// Returns [`ConfigError`] when the factor or block length is out of
    /// range. Callers are expected to fall back to direct-rate processing.
    pub fn new(
        factor: usize,
        coefficients: &FirCoefficients,
        block_len: usize,
    ) -> Result<Self, ConfigError> {
        if factor < 2 {
            return Err(ConfigError::InvalidFactor {
                factor,
                max: MAX_OVERSAMPLE_FACTOR,
            });
        }
        let interpolator = FirInterpolator::new(factor, coefficients, block_len)?;
        let decimator = FirDecimator::new(factor, coefficients, block_len)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            factor,
            block_len,
            taps = coefficients.len(),
            "oversampler: state allocated"
        );

        Ok(Self {
            factor,
            block_len,
            interpolator,
            decimator,
            work: vec![0.0; block_len * factor],
            active_len: 0,
        })
    }

    /// Get the oversampling factor.
    #[inline]
    pub fn factor(&self) -> usize {
        self.factor
    }

    /// Largest base-rate block accepted per call.
    #[inline]
    pub fn block_len(&self) -> usize {
        self.block_len
    }

    /// Interpolate `block` into the internal work buffer and return it.
    ///
    /// The returned slice is `block.len() × factor` samples long. Only the
    /// first [`block_len`](Self::block_len) samples of a longer block are
    /// taken; [`process_block`](Self::process_block) splits long blocks
    /// instead.
    pub fn upsample(&mut self, block: &[f32]) -> &mut [f32] {
        debug_assert!(block.len() <= self.block_len, "Block exceeds configured length");
        let n = block.len().min(self.block_len);
        let hi = n * self.factor;
        self.interpolator.process(&block[..n], &mut self.work[..hi]);
        self.active_len = n;
        &mut self.work[..hi]
    }

    /// Decimate the work buffer filled by the last [`upsample`](Self::upsample)
    /// back into `block`.
    pub fn downsample(&mut self, block: &mut [f32]) {
        let n = self.active_len.min(block.len());
        let hi = n * self.factor;
        self.decimator.process(&self.work[..hi], &mut block[..n]);
    }

    /// Run a full round-trip: upsample, apply `f` at the high rate, downsample.
    ///
    /// Blocks longer than [`block_len`](Self::block_len) run as consecutive
    /// pieces, with `f` called once per piece.
    pub fn process_block<F>(&mut self, block: &mut [f32], mut f: F)
    where
        F: FnMut(&mut [f32]),
    {
        for chunk in block.chunks_mut(self.block_len) {
            f(self.upsample(chunk));
            self.downsample(chunk);
        }
    }

    /// Clear both filter histories.
    pub fn reset(&mut self) {
        self.interpolator.reset();
        self.decimator.reset();
        self.work.fill(0.0);
        self.active_len = 0;
    }

    /// Round-trip latency in base-rate samples, rounded to the nearest sample.
    ///
    /// Each linear-phase kernel delays by `(taps − 1) / 2` high-rate samples;
    /// the exact delay is [`latency_high_rate`](Self::latency_high_rate)
    /// divided by the factor.
    pub fn latency_samples(&self) -> usize {
        (self.latency_high_rate() + self.factor / 2) / self.factor
    }

    /// Round-trip latency in high-rate samples.
    pub fn latency_high_rate(&self) -> usize {
        self.interpolator.group_delay() + self.decimator.group_delay()
    }
}
