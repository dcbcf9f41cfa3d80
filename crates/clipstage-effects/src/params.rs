//! Cross-context parameter store.
//!
//! The control context (UI, MIDI, automation, the CLI) writes user controls;
//! the audio context reads them once per block. Everything the sample loop
//! needs is derived from the controls in one place and published as a
//! single [`ParamSnapshot`], so the audio context can never see a drive gain
//! from one update next to a compensation factor from another.
//!
//! ## Publication
//!
//! ```text
//! setter ──lock──► Controls ──derive──► ParamSnapshot ──ArcSwap::store──┐
//!                                                                       │
//! process_block ◄──────────────── ArcSwap::load (wait-free) ◄───────────┘
//! ```
//!
//! Writers serialize on a `parking_lot::Mutex` that is held only while the
//! fields are assigned and the snapshot is published. The reader never
//! touches the mutex.

use std::fmt;

use arc_swap::ArcSwap;
use clipstage_core::math::clamp_control;
use clipstage_core::{CurveShape, DriveCurve, DriveTuning, omega, rational_mix};
use parking_lot::Mutex;
use std::sync::Arc;

use crate::error::StageError;

/// Lowest clip threshold accepted by [`ParameterStore::set_clip`].
pub const MIN_CLIP: f32 = 0.05;
/// Largest curve amount accepted by [`ParameterStore::set_shape`].
pub const MAX_SHAPE: f32 = clipstage_core::MAX_CURVE_SHAPE;
/// Largest absolute bias accepted by [`ParameterStore::set_bias`].
pub const MAX_BIAS: f32 = 0.5;

/// Fixed corner of the post-curve DC blocker.
pub const POST_HIGHPASS_HZ: f32 = 50.0;
/// Fixed corner of the anti-harshness low-pass after the tone filter.
pub const SMOOTHING_LOWPASS_HZ: f32 = 10_000.0;

/// Pre-curve high-pass corner for a `bottom` control value.
///
/// `bottom = 1` gives the lowest corner (50 Hz, full low end),
/// `bottom = 0` the highest (400 Hz).
#[inline]
pub fn bottom_corner_hz(bottom: f32) -> f32 {
    (1.0 - bottom) * 350.0 + 50.0
}

/// Tone low-pass corner for a `tone` control value (800 to 8800 Hz).
#[inline]
pub fn tone_corner_hz(tone: f32) -> f32 {
    tone * 8000.0 + 800.0
}

/// User-facing controls, all normalized or range-limited.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Controls {
    /// Drive amount `[0, 1]`, mapped to a pre-gain by the curve's tuning.
    pub drive: f32,
    /// Output level `[0, 1]`.
    pub level: f32,
    /// Tone `[0, 1]`: low-pass corner from 800 Hz to 8.8 kHz.
    pub tone: f32,
    /// Bottom `[0, 1]`: pre high-pass corner from 400 Hz down to 50 Hz.
    pub bottom: f32,
    /// Selected transfer function.
    #[cfg_attr(feature = "serde", serde(with = "crate::config::curve_name"))]
    pub curve: DriveCurve,
    /// Clip threshold `[0.05, 1]`.
    pub clip: f32,
    /// Curve amount `[0, 10]`.
    pub shape: f32,
    /// Input bias `[-0.5, 0.5]` for the rational curve.
    pub bias: f32,
    /// Positive-half-only polynomial.
    pub asymmetric: bool,
}

impl Default for Controls {
    fn default() -> Self {
        let shape = CurveShape::default();
        Self {
            drive: 0.5,
            level: 1.0,
            tone: 1.0,
            bottom: 1.0,
            curve: DriveCurve::default(),
            clip: shape.clip,
            shape: shape.shape,
            bias: shape.bias,
            asymmetric: shape.asymmetric,
        }
    }
}

impl Controls {
    /// Clamp every field into range. NaN fields take the value from `previous`.
    pub fn sanitized(self, previous: &Controls) -> Self {
        Self {
            drive: clamp_control(self.drive, 0.0, 1.0, previous.drive),
            level: clamp_control(self.level, 0.0, 1.0, previous.level),
            tone: clamp_control(self.tone, 0.0, 1.0, previous.tone),
            bottom: clamp_control(self.bottom, 0.0, 1.0, previous.bottom),
            curve: self.curve,
            clip: clamp_control(self.clip, MIN_CLIP, 1.0, previous.clip),
            shape: clamp_control(self.shape, 0.0, MAX_SHAPE, previous.shape),
            bias: clamp_control(self.bias, -MAX_BIAS, MAX_BIAS, previous.bias),
            asymmetric: self.asymmetric,
        }
    }

    /// Shape parameters handed to [`DriveCurve::apply`].
    pub fn curve_shape(&self) -> CurveShape {
        CurveShape {
            clip: self.clip,
            shape: self.shape,
            bias: self.bias,
            asymmetric: self.asymmetric,
        }
    }
}

/// Per-curve tunings, indexed by [`DriveCurve::index`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TuningTable([DriveTuning; DriveCurve::ALL.len()]);

impl TuningTable {
    /// Tuning for `curve`.
    #[inline]
    pub fn get(&self, curve: DriveCurve) -> DriveTuning {
        self.0[curve.index()]
    }

    /// Replace the tuning for `curve`.
    ///
    /// Fails if any field is non-finite.
    pub fn set(&mut self, curve: DriveCurve, tuning: DriveTuning) -> Result<(), StageError> {
        let finite = tuning.gain_scale.is_finite()
            && tuning.gain_offset.is_finite()
            && tuning.output_scale.is_finite();
        if !finite {
            return Err(StageError::NonFiniteTuning { curve });
        }
        self.0[curve.index()] = tuning;
        Ok(())
    }
}

impl Default for TuningTable {
    fn default() -> Self {
        Self(DriveCurve::ALL.map(DriveCurve::default_tuning))
    }
}

/// Everything the audio context needs for one block.
///
/// Built from [`Controls`] in a single derivation step and published as a
/// whole. `Copy`, so the audio context takes it by value at the top of
/// each block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSnapshot {
    /// Controls the snapshot was derived from.
    pub controls: Controls,
    /// Pre-curve gain target.
    pub drive_gain: f32,
    /// Post-chain gain target: `level × output_scale`.
    pub output_level: f32,
    /// Dry (pre-curve) share for curves that blend.
    pub dry: f32,
    /// Shaped share for curves that blend (`1.0` otherwise).
    pub wet: f32,
    /// Coefficient of both pre-curve high-pass stages.
    pub pre_alpha: f32,
    /// Coefficient of the post-curve DC blocker.
    pub post_alpha: f32,
    /// Coefficient of the tone low-pass.
    pub tone_alpha: f32,
    /// Coefficient of the fixed anti-harshness low-pass.
    pub smooth_alpha: f32,
    /// Sample rate the coefficients were computed for.
    pub effective_rate: f32,
    /// Increases by one with every publication.
    pub generation: u64,
}

impl ParamSnapshot {
    /// Derive a snapshot from sanitized controls.
    pub fn derive(
        controls: Controls,
        tunings: &TuningTable,
        effective_rate: f32,
        generation: u64,
    ) -> Self {
        let tuning = tunings.get(controls.curve);
        let drive_gain = tuning.drive_gain(controls.drive);
        let (dry, wet) = if controls.curve.uses_dry_mix() {
            rational_mix(drive_gain, controls.shape)
        } else {
            (0.0, 1.0)
        };

        Self {
            controls,
            drive_gain,
            output_level: controls.level * tuning.output_scale,
            dry,
            wet,
            pre_alpha: omega(bottom_corner_hz(controls.bottom), effective_rate),
            post_alpha: omega(POST_HIGHPASS_HZ, effective_rate),
            tone_alpha: omega(tone_corner_hz(controls.tone), effective_rate),
            smooth_alpha: omega(SMOOTHING_LOWPASS_HZ, effective_rate),
            effective_rate,
            generation,
        }
    }

    /// Selected curve.
    #[inline]
    pub fn curve(&self) -> DriveCurve {
        self.controls.curve
    }

    /// Shape parameters for the selected curve.
    #[inline]
    pub fn shape(&self) -> CurveShape {
        self.controls.curve_shape()
    }
}

struct StoreState {
    controls: Controls,
    tunings: TuningTable,
    effective_rate: f32,
    generation: u64,
}

/// Thread-safe parameter store shared between the control and audio contexts.
///
/// Held behind an `Arc`; obtain it from
/// [`NonlinearStage::params`](crate::NonlinearStage::params) and move clones
/// into whichever threads drive the controls.
///
/// ```rust
/// use clipstage_core::DriveCurve;
/// use clipstage_effects::{NonlinearStage, StageConfig};
///
/// let stage = NonlinearStage::new(StageConfig::default()).unwrap();
/// let params = stage.params();
///
/// params.set_drive(DriveCurve::Tanh, 0.8);
/// let snap = params.snapshot();
/// assert_eq!(snap.curve(), DriveCurve::Tanh);
/// assert!(snap.drive_gain > 100.0);
/// ```
pub struct ParameterStore {
    state: Mutex<StoreState>,
    published: ArcSwap<ParamSnapshot>,
}

impl ParameterStore {
    /// Create a store and publish the first snapshot.
    ///
    /// `controls` are sanitized against the defaults.
    pub fn new(controls: Controls, tunings: TuningTable, effective_rate: f32) -> Self {
        let controls = controls.sanitized(&Controls::default());
        let first = ParamSnapshot::derive(controls, &tunings, effective_rate, 0);
        Self {
            state: Mutex::new(StoreState {
                controls,
                tunings,
                effective_rate,
                generation: 0,
            }),
            published: ArcSwap::from_pointee(first),
        }
    }

    /// Current snapshot. Wait-free; safe to call from the audio context.
    #[inline]
    pub fn snapshot(&self) -> ParamSnapshot {
        **self.published.load()
    }

    /// Current controls.
    pub fn controls(&self) -> Controls {
        self.state.lock().controls
    }

    /// Tuning currently in effect for `curve`.
    pub fn tuning(&self, curve: DriveCurve) -> DriveTuning {
        self.state.lock().tunings.get(curve)
    }

    /// Number of snapshots published after the initial one.
    pub fn generation(&self) -> u64 {
        self.published.load().generation
    }

    /// Set the drive control `[0, 1]`.
    pub fn set_gain(&self, drive: f32) {
        self.apply(|c| c.drive = drive);
    }

    /// Set the output level `[0, 1]`.
    pub fn set_level(&self, level: f32) {
        self.apply(|c| c.level = level);
    }

    /// Set the tone control `[0, 1]`.
    pub fn set_tone(&self, tone: f32) {
        self.apply(|c| c.tone = tone);
    }

    /// Set the bottom (pre high-pass) control `[0, 1]`.
    pub fn set_bottom(&self, bottom: f32) {
        self.apply(|c| c.bottom = bottom);
    }

    /// Select the transfer function.
    pub fn set_curve(&self, curve: DriveCurve) {
        self.apply(|c| c.curve = curve);
    }

    /// Select the transfer function by name (see [`DriveCurve`]'s `FromStr`).
    pub fn set_curve_by_name(&self, name: &str) -> Result<(), StageError> {
        let curve: DriveCurve = name.parse()?;
        self.set_curve(curve);
        Ok(())
    }

    /// Set the clip threshold `[0.05, 1]`.
    pub fn set_clip(&self, clip: f32) {
        self.apply(|c| c.clip = clip);
    }

    /// Set the curve amount `[0, 10]`.
    pub fn set_shape(&self, shape: f32) {
        self.apply(|c| c.shape = shape);
    }

    /// Set the rational-curve bias `[-0.5, 0.5]`.
    pub fn set_bias(&self, bias: f32) {
        self.apply(|c| c.bias = bias);
    }

    /// Toggle the positive-half-only polynomial.
    pub fn set_asymmetric(&self, asymmetric: bool) {
        self.apply(|c| c.asymmetric = asymmetric);
    }

    /// Switch curve and drive together.
    ///
    /// The new curve's gain mapping and compensation land in the same
    /// snapshot as the new drive value.
    pub fn set_drive(&self, curve: DriveCurve, drive: f32) {
        self.apply(|c| {
            c.curve = curve;
            c.drive = drive;
        });
    }

    /// Override the tuning for `curve`.
    pub fn set_tuning(&self, curve: DriveCurve, tuning: DriveTuning) -> Result<(), StageError> {
        let snapshot = {
            let mut state = self.state.lock();
            state.tunings.set(curve, tuning)?;
            self.publish(&mut state)
        };
        log_published(&snapshot);
        Ok(())
    }

    /// Update any number of controls in one critical section.
    ///
    /// The closure runs under the writer lock and must not block. Fields it
    /// leaves out of range are clamped; NaN fields keep their old value.
    ///
    /// ```rust
    /// use clipstage_core::DriveCurve;
    /// use clipstage_effects::{NonlinearStage, StageConfig};
    ///
    /// let stage = NonlinearStage::new(StageConfig::default()).unwrap();
    /// stage.params().apply(|c| {
    ///     c.curve = DriveCurve::Rational;
    ///     c.shape = 4.0;
    ///     c.bias = 0.2;
    /// });
    /// let snap = stage.params().snapshot();
    /// assert!(snap.dry > 0.0 && snap.wet < 1.0);
    /// ```
    pub fn apply<F>(&self, update: F)
    where
        F: FnOnce(&mut Controls),
    {
        let snapshot = {
            let mut state = self.state.lock();
            let previous = state.controls;
            let mut next = previous;
            update(&mut next);
            state.controls = next.sanitized(&previous);
            self.publish(&mut state)
        };
        log_published(&snapshot);
    }

    /// Recompute rate-dependent coefficients for a new effective rate.
    pub(crate) fn set_effective_rate(&self, effective_rate: f32) {
        let snapshot = {
            let mut state = self.state.lock();
            state.effective_rate = effective_rate;
            self.publish(&mut state)
        };
        log_published(&snapshot);
    }

    /// Derive and store the next snapshot. Called with the writer lock held.
    fn publish(&self, state: &mut StoreState) -> ParamSnapshot {
        state.generation += 1;
        let snapshot = ParamSnapshot::derive(
            state.controls,
            &state.tunings,
            state.effective_rate,
            state.generation,
        );
        self.published.store(Arc::new(snapshot));
        snapshot
    }
}

fn log_published(snapshot: &ParamSnapshot) {
    tracing::debug!(
        generation = snapshot.generation,
        curve = %snapshot.curve(),
        drive_gain = snapshot.drive_gain,
        output_level = snapshot.output_level,
        "params: snapshot published"
    );
}

impl fmt::Debug for ParameterStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterStore")
            .field("snapshot", &self.snapshot())
            .finish_non_exhaustive()
    }
}
