//! Small math helpers shared by the filters and drive curves.
//!
//! All functions are allocation-free and `no_std` friendly.

/// Hard clip to the ±threshold range.
///
/// Abrupt limiting that creates flat tops on waveforms. Produces
/// harsh odd harmonics, like a pair of silicon diodes to ground.
///
/// # Example
/// ```rust
/// use clipstage_core::hard_clip;
///
/// assert_eq!(hard_clip(2.0, 1.0), 1.0);
/// assert_eq!(hard_clip(-0.3, 1.0), -0.3);
/// ```
#[inline]
pub fn hard_clip(x: f32, threshold: f32) -> f32 {
    x.clamp(-threshold, threshold)
}

/// Flush denormal values to zero.
///
/// One-pole feedback states decay toward zero forever on silent input;
/// below ~1e-20 the state is replaced with an exact zero.
#[inline]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}

/// Clamp a control value into `[min, max]`, mapping NaN to `fallback`.
///
/// Used by parameter setters: out-of-range values are clamped rather than
/// rejected, and a non-finite value never reaches the coefficient math.
#[inline]
pub fn clamp_control(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(min, max)
    }
}
