//! Drive curves: the nonlinear transfer functions of the clipping stage.
//!
//! Each curve is a pure per-sample function. Any running state the stage
//! needs (DC blocking, tone) lives in the filters around the curve, never in
//! the curve itself, so switching curves between blocks is always safe.
//!
//! | Curve | Transfer function | Character |
//! |-------|-------------------|-----------|
//! | [`Linear`](DriveCurve::Linear) | `s` | True bypass |
//! | [`AbsFold`](DriveCurve::AbsFold) | `s·(2−|s|)`, `s ∈ [−1,1]` | Quadratic, gentle |
//! | [`Sigmoid`](DriveCurve::Sigmoid) | `atan(s)` | Soft, never flat |
//! | [`Tanh`](DriveCurve::Tanh) | `tanh(s)` | Classic soft clip |
//! | [`Cubic`](DriveCurve::Cubic) | `s − s³/3`, `s ∈ [−1,1]` | Smooth knee at ±1 |
//! | [`Hard`](DriveCurve::Hard) | `clamp(s, ±clip)` | Diode pair to ground |
//! | [`Polynomial`](DriveCurve::Polynomial) | `clip·(x − a·x³/3)`, `x = s/clip ∈ [−1,1]` | Tunable knee |
//! | [`Rational`](DriveCurve::Rational) | `(k+1)·s / (1+k·|s|)` | Warm → hard continuum |
//!
//! # Drive Mapping
//!
//! The user-facing drive control is normalized to `[0, 1]`. Each curve maps
//! it to an internal pre-gain and an output compensation through its
//! [`DriveTuning`] so that loudness stays roughly level across curves:
//!
//! ```text
//! gain = drive² · DRIVE_RANGE · gain_scale + gain_offset
//! out  = curve(in · gain) · output_scale · level
//! ```
//!
//! The tuning constants were fitted by ear. They are data, not derivations,
//! and can be overridden per curve.

use core::fmt;
use core::str::FromStr;

use libm::{atanf, tanhf};
use thiserror::Error;

use crate::hard_clip;

#[cfg(not(feature = "std"))]
use alloc::string::String;

/// Span of the squared drive control before per-curve scaling.
pub const DRIVE_RANGE: f32 = 150.0;

/// Largest curve amount ([`CurveShape::shape`]).
pub const MAX_CURVE_SHAPE: f32 = 10.0;

/// Nonlinear transfer function selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DriveCurve {
    /// No shaping. The stage passes blocks through untouched.
    Linear,
    /// Quadratic fold `s·(2−|s|)` on the clamped input.
    AbsFold,
    /// Arctangent saturation, output in `(−π/2, π/2)` before compensation.
    Sigmoid,
    /// Hyperbolic tangent saturation.
    Tanh,
    /// Cubic soft clip `s − s³/3` on the clamped input.
    Cubic,
    /// Hard clip at the clip threshold.
    #[default]
    Hard,
    /// Parametric cubic with a knee set by the curve amount, optionally
    /// applied to the positive half only.
    ///
    /// `a = shape / MAX_CURVE_SHAPE` runs from linear (`a = 0`) to a knee
    /// that flattens exactly at the clip threshold (`a = 1`), which is
    /// `s − k·s³` with `k = a / (3·clip²)`.
    Polynomial,
    /// Asymptotic rational curve `(k+1)·s / (1+k·|s|)` with optional bias.
    Rational,
}

/// Shape parameters shared by the curves that take them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveShape {
    /// Clip threshold for [`Hard`](DriveCurve::Hard) and
    /// [`Polynomial`](DriveCurve::Polynomial).
    pub clip: f32,
    /// Curve amount `[0, MAX_CURVE_SHAPE]`. [`Rational`](DriveCurve::Rational)
    /// uses it as `k` directly; [`Polynomial`](DriveCurve::Polynomial) maps
    /// it linearly onto its monotonic knee range.
    pub shape: f32,
    /// Input offset for [`Rational`](DriveCurve::Rational) (even harmonics).
    pub bias: f32,
    /// Positive-half-only cubic for [`Polynomial`](DriveCurve::Polynomial).
    pub asymmetric: bool,
}

impl Default for CurveShape {
    fn default() -> Self {
        Self {
            clip: 1.0,
            shape: 1.0 / 3.0,
            bias: 0.0,
            asymmetric: false,
        }
    }
}

/// Per-curve drive mapping and loudness compensation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveTuning {
    /// Multiplier on `drive² · DRIVE_RANGE`.
    pub gain_scale: f32,
    /// Pre-gain at zero drive.
    pub gain_offset: f32,
    /// Output compensation applied with the level control.
    pub output_scale: f32,
}

impl DriveTuning {
    /// Create a tuning.
    pub const fn new(gain_scale: f32, gain_offset: f32, output_scale: f32) -> Self {
        Self {
            gain_scale,
            gain_offset,
            output_scale,
        }
    }

    /// Internal pre-gain for a normalized drive value.
    #[inline]
    pub fn drive_gain(&self, drive: f32) -> f32 {
        drive * drive * DRIVE_RANGE * self.gain_scale + self.gain_offset
    }
}

impl Default for DriveTuning {
    fn default() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }
}

/// Dry/wet blend for the rational curve.
///
/// `dry = 1 / (1 + |gain| + 1.5·shape)`, `wet = 1 − dry`: hotter and more
/// curved settings lean toward fully wet.
#[inline]
pub fn rational_mix(gain: f32, shape: f32) -> (f32, f32) {
    let dry = 1.0 / (1.0 + gain.abs() + 1.5 * shape.max(0.0));
    (dry, 1.0 - dry)
}

#[inline]
fn rational(x: f32, k: f32) -> f32 {
    (k + 1.0) * x / (1.0 + k * x.abs())
}

impl DriveCurve {
    /// Every curve, in selector order.
    pub const ALL: [DriveCurve; 8] = [
        DriveCurve::Linear,
        DriveCurve::AbsFold,
        DriveCurve::Sigmoid,
        DriveCurve::Tanh,
        DriveCurve::Cubic,
        DriveCurve::Hard,
        DriveCurve::Polynomial,
        DriveCurve::Rational,
    ];

    /// Apply the transfer function to one (already gained) sample.
    #[inline]
    pub fn apply(self, s: f32, shape: &CurveShape) -> f32 {
        match self {
            DriveCurve::Linear => s,
            DriveCurve::AbsFold => {
                let s = s.clamp(-1.0, 1.0);
                s * (2.0 - s.abs())
            }
            DriveCurve::Sigmoid => atanf(s),
            DriveCurve::Tanh => tanhf(s),
            DriveCurve::Cubic => {
                let s = s.clamp(-1.0, 1.0);
                s - s * s * s / 3.0
            }
            DriveCurve::Hard => hard_clip(s, shape.clip),
            DriveCurve::Polynomial => {
                if shape.asymmetric {
                    let s = hard_clip(s, shape.clip);
                    if s > 0.0 { s - s * s * s / 3.0 } else { s }
                } else {
                    // Full amount flattens the curve exactly at the clip point.
                    let clip = shape.clip.max(f32::EPSILON);
                    let x = hard_clip(s, clip) / clip;
                    let amount = shape.shape.clamp(0.0, MAX_CURVE_SHAPE) / MAX_CURVE_SHAPE;
                    clip * (x - amount * x * x * x / 3.0)
                }
            }
            DriveCurve::Rational => {
                let k = shape.shape.max(0.0);
                rational(s + shape.bias, k) - rational(shape.bias, k)
            }
        }
    }

    /// Default tuning for this curve.
    pub fn default_tuning(self) -> DriveTuning {
        match self {
            DriveCurve::Linear => DriveTuning::new(0.0, 1.0, 1.0),
            DriveCurve::AbsFold => DriveTuning::new(0.6, 0.6, 1.0),
            DriveCurve::Sigmoid => DriveTuning::new(1.0, 1.0, core::f32::consts::FRAC_2_PI),
            DriveCurve::Tanh => DriveTuning::new(1.25, 1.1, 1.0),
            DriveCurve::Cubic => DriveTuning::new(1.0, 1.0, 1.5),
            DriveCurve::Hard => DriveTuning::new(1.0, 1.0, 1.0),
            DriveCurve::Polynomial => DriveTuning::new(1.0, 1.0, 1.0),
            DriveCurve::Rational => DriveTuning::new(1.0, 1.0, 1.0),
        }
    }

    /// Whether the curve bypasses the whole stage.
    #[inline]
    pub fn is_bypass(self) -> bool {
        self == DriveCurve::Linear
    }

    /// Whether the stage blends dry signal back in for this curve.
    #[inline]
    pub fn uses_dry_mix(self) -> bool {
        self == DriveCurve::Rational
    }

    /// Position in [`ALL`](Self::ALL).
    pub fn index(self) -> usize {
        self as usize
    }

    /// Look up a curve by selector index.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Map a normalized selector control (`0.0..=1.0`) onto a curve.
    ///
    /// The range is split evenly; out-of-range input is clamped.
    pub fn from_normalized(value: f32) -> Self {
        let last = Self::ALL.len() - 1;
        let v = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        let idx = libm::roundf(v * last as f32) as usize;
        Self::ALL[idx.min(last)]
    }

    /// Stable lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            DriveCurve::Linear => "linear",
            DriveCurve::AbsFold => "abs-fold",
            DriveCurve::Sigmoid => "sigmoid",
            DriveCurve::Tanh => "tanh",
            DriveCurve::Cubic => "cubic",
            DriveCurve::Hard => "hard",
            DriveCurve::Polynomial => "polynomial",
            DriveCurve::Rational => "rational",
        }
    }
}

impl fmt::Display for DriveCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a curve name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown drive curve '{0}'")]
pub struct ParseCurveError(pub String);

impl FromStr for DriveCurve {
    type Err = ParseCurveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let curve = match lower.as_str() {
            "linear" | "bypass" | "off" => DriveCurve::Linear,
            "abs-fold" | "absfold" | "abs_fold" | "fold" => DriveCurve::AbsFold,
            "sigmoid" | "atan" | "arctan" => DriveCurve::Sigmoid,
            "tanh" => DriveCurve::Tanh,
            "cubic" | "soft" | "soft-clip" => DriveCurve::Cubic,
            "hard" | "hard-clip" | "clip" => DriveCurve::Hard,
            "polynomial" | "poly" => DriveCurve::Polynomial,
            "rational" | "asymptotic" => DriveCurve::Rational,
            _ => return Err(ParseCurveError(String::from(s))),
        };
        Ok(curve)
    }
}
