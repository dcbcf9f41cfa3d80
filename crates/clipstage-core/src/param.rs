//! Parameter smoothing for click-free control changes.
//!
//! Gain and level controls can jump between blocks. Applying the jump in a
//! single sample is audible as a click, so each smoothed quantity keeps a
//! `current` value that ramps toward its `target` every sample:
//!
//! ```text
//! current += (target - current) * rate
//! ```
//!
//! The rate depends on direction. Rising toward a larger target uses a slow
//! rate so increases fade in; falling toward a smaller target uses
//! `rate = 1`, so a user pulling a control down is obeyed on the very next
//! sample and never hears a transient louder than what they asked for.
//!
//! ## Usage
//!
//! ```rust
//! use clipstage_core::SmoothedParam;
//!
//! let mut level = SmoothedParam::declick(1.0, 1.0);
//! level.set_target(0.25);
//! assert_eq!(level.advance(), 0.25); // drops at once
//!
//! level.set_target(1.0);
//! let next = level.advance();
//! assert!(next > 0.25 && next < 0.26); // fades in
//! ```

/// Rise rate per sample used for declicking at the oversampled rate.
///
/// Scaled up by the caller when running at a lower rate so the ramp takes
/// the same wall-clock time.
pub const DECLICK_RISE_RATE: f32 = 0.002;

/// A parameter with direction-dependent exponential smoothing.
///
/// # Memory Layout
///
/// Four `f32` fields, 16 bytes, `Copy`-cheap to keep per control.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothedParam {
    /// Current smoothed value
    current: f32,
    /// Target value we're smoothing towards
    target: f32,
    /// Per-sample rate when the target is above the current value
    rise_rate: f32,
    /// Per-sample rate when the target is at or below the current value
    fall_rate: f32,
}

impl SmoothedParam {
    /// Create a parameter that follows its target instantly.
    pub fn new(initial: f32) -> Self {
        Self::asymmetric(initial, 1.0, 1.0)
    }

    /// Create a parameter with separate rise and fall rates.
    ///
    /// Rates are clamped to `(0, 1]`; `1.0` means "snap".
    pub fn asymmetric(initial: f32, rise_rate: f32, fall_rate: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            rise_rate: clamp_rate(rise_rate),
            fall_rate: clamp_rate(fall_rate),
        }
    }

    /// Create a declicking parameter: slow rise, instant fall.
    ///
    /// The rise rate is [`DECLICK_RISE_RATE`] × `rate_scale`. Pass the ratio
    /// of the nominal oversampled rate to the rate actually being run so
    /// the ramp time stays the same in direct-rate fallback.
    pub fn declick(initial: f32, rate_scale: f32) -> Self {
        Self::asymmetric(initial, DECLICK_RISE_RATE * rate_scale, 1.0)
    }

    /// Set the target value (parameter will smooth towards this).
    #[inline]
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Set target and immediately snap to it (no smoothing).
    #[inline]
    pub fn set_immediate(&mut self, value: f32) {
        self.target = value;
        self.current = value;
    }

    /// Change the rise and fall rates, keeping the current value.
    pub fn set_rates(&mut self, rise_rate: f32, fall_rate: f32) {
        self.rise_rate = clamp_rate(rise_rate);
        self.fall_rate = clamp_rate(fall_rate);
    }

    /// Get the next smoothed value (advances by one sample).
    #[inline]
    pub fn advance(&mut self) -> f32 {
        let rate = if self.target > self.current {
            self.rise_rate
        } else {
            self.fall_rate
        };
        if rate >= 1.0 {
            self.current = self.target;
        } else {
            self.current += (self.target - self.current) * rate;
        }
        self.current
    }

    /// Get the current smoothed value without advancing.
    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }

    /// Get the target value.
    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Rise rate per sample.
    #[inline]
    pub fn rise_rate(&self) -> f32 {
        self.rise_rate
    }

    /// Fall rate per sample.
    #[inline]
    pub fn fall_rate(&self) -> f32 {
        self.fall_rate
    }

    /// Check if the parameter has reached its target (within epsilon).
    #[inline]
    pub fn is_settled(&self) -> bool {
        (self.current - self.target).abs() < 1e-6
    }

    /// Skip ahead to the target value immediately.
    #[inline]
    pub fn snap_to_target(&mut self) {
        self.current = self.target;
    }
}

impl Default for SmoothedParam {
    fn default() -> Self {
        Self::new(0.0)
    }
}

#[inline]
fn clamp_rate(rate: f32) -> f32 {
    if rate.is_nan() {
        1.0
    } else {
        rate.clamp(f32::MIN_POSITIVE, 1.0)
    }
}
