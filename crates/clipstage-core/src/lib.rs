//! Clipstage Core - DSP primitives for an oversampled clipping stage
//!
//! This crate provides the building blocks of a diode/transistor style
//! distortion stage, designed for real-time processing with zero allocation
//! in the audio path. Everything that needs memory sizes it once at
//! construction from the configured block length, tap count and
//! oversampling factor.
//!
//! # Core Abstractions
//!
//! ## Block Processing
//!
//! - [`BlockProcessor`] - Object-safe trait for in-place block processing
//!
//! ## Multirate Filtering
//!
//! - [`FirCoefficients`] - Validated, immutable FIR tap table
//! - [`FirInterpolator`] - Zero-stuffing interpolator (polyphase, skips the zeros)
//! - [`FirDecimator`] - Anti-aliasing decimator
//! - [`Oversampler`] - Matched interpolate/decimate pair sharing one table
//!
//! ## Nonlinearity
//!
//! - [`DriveCurve`] - Tagged set of transfer functions (hard clip, tanh, ...)
//! - [`DriveTuning`] - Per-curve drive-to-gain mapping and loudness compensation
//!
//! ## Tone and DC
//!
//! - [`OnePole`] - One-pole lowpass, `y += (x - y) * alpha`
//! - [`DcBlocker`] - One-pole highpass derived from [`OnePole`]
//! - [`omega`] - Corner frequency to one-pole coefficient
//!
//! ## Parameter Smoothing
//!
//! - [`SmoothedParam`] - Exponential ramp with separate rise/fall rates
//!
//! # no_std Support
//!
//! Disable the default `std` feature to use the crate on embedded targets:
//!
//! ```toml
//! [dependencies]
//! clipstage-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Example
//!
//! ```rust
//! use clipstage_core::{FirCoefficients, Oversampler, DriveCurve, CurveShape};
//!
//! let coeffs = FirCoefficients::default_lowpass();
//! let mut os = Oversampler::new(5, &coeffs, 128).unwrap();
//! let shape = CurveShape::default();
//!
//! let mut block = [0.25f32; 128];
//! os.process_block(&mut block, |hi_rate| {
//!     for s in hi_rate.iter_mut() {
//!         *s = DriveCurve::Tanh.apply(*s * 8.0, &shape);
//!     }
//! });
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod dc_blocker;
pub mod drive;
pub mod effect;
pub mod error;
pub mod fir;
pub mod math;
pub mod one_pole;
pub mod oversample;
pub mod param;

// Re-export main types at crate root
pub use dc_blocker::DcBlocker;
pub use drive::{
    CurveShape, DRIVE_RANGE, DriveCurve, DriveTuning, MAX_CURVE_SHAPE, ParseCurveError, rational_mix,
};
pub use effect::BlockProcessor;
pub use error::ConfigError;
pub use fir::{DEFAULT_TAPS, FirCoefficients, FirDecimator, FirInterpolator, MAX_TAPS};
pub use math::{flush_denormal, hard_clip};
pub use one_pole::{OnePole, omega};
pub use oversample::{DEFAULT_OVERSAMPLE_FACTOR, MAX_BLOCK_LEN, MAX_OVERSAMPLE_FACTOR, Oversampler};
pub use param::{DECLICK_RISE_RATE, SmoothedParam};
