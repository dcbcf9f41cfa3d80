//! Oversampled nonlinear distortion stage.
//!
//! Per block, the stage takes one parameter snapshot and runs:
//!
//! ```text
//! block ─► [upsample ×N] ─► per sample:                                  ─► [downsample ×N] ─► block
//!                           pre HP ─► pre HP ─► ×gain ─► curve ─► tone LP
//!                           ─► 10 kHz LP ─► post HP (50 Hz) ─► ×level
//! ```
//!
//! Gain and level are smoothed per sample with a slow rise and an instant
//! fall. All one-pole coefficients are computed at the rate the sample loop
//! actually runs at, so the corners do not move when oversampling is off.
//!
//! The linear curve is a true bypass: the block is left untouched and
//! neither the oversampler nor the sample loop run.

use std::sync::Arc;

use clipstage_core::{
    BlockProcessor, DcBlocker, FirCoefficients, OnePole, Oversampler, SmoothedParam,
};

use crate::config::StageConfig;
use crate::error::StageError;
use crate::host::BlockHost;
use crate::params::{ParamSnapshot, ParameterStore};

/// Where the stage is inside a block.
///
/// Between calls the stage is always [`Idle`](StagePhase::Idle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StagePhase {
    /// Waiting for a block.
    #[default]
    Idle,
    /// The block has been interpolated into the work buffer.
    Upsampled,
    /// Running the per-sample chain.
    SampleLoop,
    /// The work buffer has been decimated back into the block.
    Downsampled,
}

impl StagePhase {
    /// Whether `next` may follow `self`.
    ///
    /// Long blocks are split, so a finished piece may go straight on to
    /// the next one.
    pub fn can_enter(self, next: StagePhase) -> bool {
        use StagePhase::{Downsampled, Idle, SampleLoop, Upsampled};
        matches!(
            (self, next),
            (Idle | Downsampled, Upsampled)
                | (Idle | Upsampled | SampleLoop, SampleLoop)
                | (SampleLoop, Downsampled)
                | (SampleLoop | Downsampled, Idle)
        )
    }

    #[inline]
    fn enter(&mut self, next: StagePhase) {
        debug_assert!(self.can_enter(next), "illegal phase change {self:?} -> {next:?}");
        *self = next;
    }
}

/// Filter memories and smoothers of the per-sample chain.
///
/// Owned by the audio context.
#[derive(Debug, Clone)]
struct SampleChain {
    pre: [DcBlocker; 2],
    tone: OnePole,
    smooth: OnePole,
    post: DcBlocker,
    gain: SmoothedParam,
    level: SmoothedParam,
}

impl SampleChain {
    fn new(rate_scale: f32) -> Self {
        Self {
            pre: [DcBlocker::default(), DcBlocker::default()],
            tone: OnePole::default(),
            smooth: OnePole::default(),
            post: DcBlocker::default(),
            gain: SmoothedParam::declick(0.0, rate_scale),
            level: SmoothedParam::declick(0.0, rate_scale),
        }
    }

    fn load(&mut self, snap: &ParamSnapshot) {
        for hp in &mut self.pre {
            hp.set_alpha(snap.pre_alpha);
        }
        self.tone.set_alpha(snap.tone_alpha);
        self.smooth.set_alpha(snap.smooth_alpha);
        self.post.set_alpha(snap.post_alpha);
        self.gain.set_target(snap.drive_gain);
        self.level.set_target(snap.output_level);
    }

    fn run(&mut self, samples: &mut [f32], snap: &ParamSnapshot) {
        let curve = snap.curve();
        let shape = snap.shape();
        let blend = curve.uses_dry_mix();

        for s in samples.iter_mut() {
            let mut x = *s;
            for hp in &mut self.pre {
                x = hp.process(x);
            }
            let dry = x;

            let mut y = curve.apply(x * self.gain.advance(), &shape);
            if blend {
                y = dry * snap.dry + y * snap.wet;
            }

            y = self.tone.process(y);
            y = self.smooth.process(y);
            y = self.post.process(y);
            *s = y * self.level.advance();
        }
    }

    fn clear_filters(&mut self) {
        for hp in &mut self.pre {
            hp.reset();
        }
        self.tone.reset();
        self.smooth.reset();
        self.post.reset();
    }

    fn reset(&mut self) {
        self.clear_filters();
        self.gain.set_immediate(0.0);
        self.level.set_immediate(0.0);
    }
}

/// Oversampled nonlinear distortion stage.
///
/// Construct with [`new`](Self::new), then call [`begin`](Self::begin) once
/// to choose between oversampled and direct-rate processing. Parameters
/// are changed through the shared [`ParameterStore`] from any thread.
///
/// # Example
///
/// ```rust
/// use clipstage_core::DriveCurve;
/// use clipstage_effects::{NonlinearStage, StageConfig};
///
/// let mut stage = NonlinearStage::new(StageConfig::default()).unwrap();
/// assert!(stage.begin(true));
///
/// stage.params().set_drive(DriveCurve::Tanh, 0.6);
/// stage.params().set_tone(0.4);
///
/// let mut block = vec![0.25f32; 128];
/// stage.process_block(&mut block);
/// assert!(block.iter().all(|s| s.is_finite()));
/// ```
#[derive(Debug)]
pub struct NonlinearStage {
    sample_rate: f32,
    block_len: usize,
    factor: usize,
    coefficients: FirCoefficients,
    oversampler: Option<Oversampler>,
    params: Arc<ParameterStore>,
    chain: SampleChain,
    phase: StagePhase,
    /// Generation of the snapshot last loaded into the chain.
    loaded: Option<u64>,
    bypassed: bool,
}

impl NonlinearStage {
    /// Build a stage from `config`.
    ///
    /// The stage starts at the direct rate; call [`begin`](Self::begin) to
    /// enable oversampling.
    pub fn new(config: StageConfig) -> Result<Self, StageError> {
        config.validate()?;
        let coefficients = config.filter_coefficients()?;
        let tunings = config.tuning_table()?;
        let params = Arc::new(ParameterStore::new(
            config.controls,
            tunings,
            config.sample_rate,
        ));

        tracing::debug!(
            sample_rate = config.sample_rate,
            block_len = config.block_len,
            factor = config.oversample_factor,
            taps = coefficients.len(),
            "nonlinear stage: created"
        );

        Ok(Self {
            sample_rate: config.sample_rate,
            block_len: config.block_len,
            factor: config.oversample_factor,
            coefficients,
            oversampler: None,
            params,
            chain: SampleChain::new(config.oversample_factor as f32),
            phase: StagePhase::Idle,
            loaded: None,
            bypassed: false,
        })
    }

    /// Select oversampled or direct-rate processing.
    ///
    /// Returns whether oversampling is active. A `false` return after
    /// requesting oversampling means the oversampler could not be built
    /// for this configuration and the stage runs at the direct rate; it is
    /// fully functional either way.
    ///
    /// Allocates; call from the control context before processing starts.
    pub fn begin(&mut self, use_oversampling: bool) -> bool {
        if !use_oversampling {
            self.oversampler = None;
        } else if self.oversampler.is_none() {
            match Oversampler::new(self.factor, &self.coefficients, self.block_len) {
                Ok(os) => self.oversampler = Some(os),
                Err(err) => {
                    tracing::warn!(
                        %err,
                        factor = self.factor,
                        "oversampling unavailable, processing at the direct rate"
                    );
                }
            }
        }

        let active = self.active_factor();
        // Same ramp duration at every rate
        let rate_scale = self.factor as f32 / active as f32;
        let rise = clipstage_core::DECLICK_RISE_RATE * rate_scale;
        self.chain.gain.set_rates(rise, 1.0);
        self.chain.level.set_rates(rise, 1.0);

        self.params.set_effective_rate(self.effective_rate());
        self.loaded = None;

        tracing::debug!(
            oversampling = self.is_oversampling(),
            effective_rate = self.effective_rate(),
            "nonlinear stage: begin"
        );
        self.is_oversampling()
    }

    /// Shared parameter store.
    pub fn params(&self) -> Arc<ParameterStore> {
        Arc::clone(&self.params)
    }

    /// Whether the sample loop runs at the oversampled rate.
    #[inline]
    pub fn is_oversampling(&self) -> bool {
        self.oversampler.is_some()
    }

    /// Rate factor of the sample loop (1 when not oversampling).
    #[inline]
    pub fn active_factor(&self) -> usize {
        self.oversampler.as_ref().map_or(1, Oversampler::factor)
    }

    /// Sample rate of the sample loop.
    #[inline]
    pub fn effective_rate(&self) -> f32 {
        self.sample_rate * self.active_factor() as f32
    }

    /// Host sample rate.
    #[inline]
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Largest block processed in one pass.
    #[inline]
    pub fn block_len(&self) -> usize {
        self.block_len
    }

    /// Current phase. Always [`StagePhase::Idle`] between calls.
    #[inline]
    pub fn phase(&self) -> StagePhase {
        self.phase
    }

    /// Process one block in place.
    ///
    /// Blocks longer than [`block_len`](Self::block_len) are processed in
    /// block-sized pieces. Lock-free and allocation-free.
    pub fn process_block(&mut self, block: &mut [f32]) {
        if block.is_empty() {
            return;
        }

        let snap = self.params.snapshot();
        if snap.curve().is_bypass() {
            self.bypassed = true;
            return;
        }
        if self.bypassed {
            // Histories are stale after a bypassed stretch
            self.bypassed = false;
            self.chain.clear_filters();
            if let Some(os) = self.oversampler.as_mut() {
                os.reset();
            }
        }
        if self.loaded != Some(snap.generation) {
            self.chain.load(&snap);
            self.loaded = Some(snap.generation);
        }

        for chunk in block.chunks_mut(self.block_len) {
            match self.oversampler.as_mut() {
                Some(os) => {
                    let hi = os.upsample(chunk);
                    self.phase.enter(StagePhase::Upsampled);
                    self.phase.enter(StagePhase::SampleLoop);
                    self.chain.run(hi, &snap);
                    os.downsample(chunk);
                    self.phase.enter(StagePhase::Downsampled);
                }
                None => {
                    self.phase.enter(StagePhase::SampleLoop);
                    self.chain.run(chunk, &snap);
                }
            }
        }
        self.phase.enter(StagePhase::Idle);
    }

    /// Process an owned block and hand it back.
    pub fn process<B: AsMut<[f32]>>(&mut self, mut block: B) -> B {
        self.process_block(block.as_mut());
        block
    }

    /// Run one host cycle: acquire, process, emit, release.
    ///
    /// Returns `false` without doing anything when the host has no input.
    pub fn run_cycle<H: BlockHost>(&mut self, host: &mut H) -> bool {
        let Some(mut block) = host.acquire_input_block() else {
            return false;
        };
        self.process_block(block.as_mut());
        host.emit(&block);
        host.release_block(block);
        true
    }

    /// Clear filter memories and histories; gain and level fade in again.
    pub fn reset(&mut self) {
        self.chain.reset();
        if let Some(os) = self.oversampler.as_mut() {
            os.reset();
        }
        self.loaded = None;
        self.phase = StagePhase::Idle;
    }

    /// Round-trip latency of the oversampler in host samples.
    pub fn latency_samples(&self) -> usize {
        self.oversampler
            .as_ref()
            .map_or(0, Oversampler::latency_samples)
    }
}

impl BlockProcessor for NonlinearStage {
    fn process_block(&mut self, block: &mut [f32]) {
        NonlinearStage::process_block(self, block);
    }

    fn reset(&mut self) {
        NonlinearStage::reset(self);
    }

    fn latency_samples(&self) -> usize {
        NonlinearStage::latency_samples(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipstage_core::DriveCurve;

    fn stage(oversample: bool) -> NonlinearStage {
        let mut stage = NonlinearStage::new(StageConfig::default()).unwrap();
        stage.begin(oversample);
        stage
    }

    #[test]
    fn begin_reports_oversampling() {
        let mut s = NonlinearStage::new(StageConfig::default()).unwrap();
        assert!(!s.is_oversampling());
        assert!(s.begin(true));
        assert_eq!(s.effective_rate(), 220_500.0);
        assert_eq!(s.latency_samples(), 15);
        assert!(!s.begin(false));
        assert_eq!(s.effective_rate(), 44_100.0);
        assert_eq!(s.latency_samples(), 0);
    }

    #[test]
    fn unity_factor_falls_back() {
        let config = StageConfig::default().with_oversample_factor(1);
        let mut s = NonlinearStage::new(config).unwrap();
        assert!(!s.begin(true));
        assert_eq!(s.active_factor(), 1);
    }

    #[test]
    fn rise_rate_scales_with_fallback() {
        let os = stage(true);
        let direct = stage(false);
        let ratio = direct.chain.gain.rise_rate() / os.chain.gain.rise_rate();
        assert!((ratio - 5.0).abs() < 1e-4);
        assert!((os.chain.level.rise_rate() - 0.002).abs() < 1e-7);
    }

    #[test]
    fn linear_is_bit_identical() {
        for oversample in [false, true] {
            let mut s = stage(oversample);
            s.params().set_curve(DriveCurve::Linear);
            let input: Vec<f32> = (0..128).map(|i| (i as f32 * 0.37).sin() * 3.0).collect();
            let mut block = input.clone();
            s.process_block(&mut block);
            assert_eq!(block, input);
        }
    }

    #[test]
    fn phase_transitions() {
        use StagePhase::{Downsampled, Idle, SampleLoop, Upsampled};
        assert!(Idle.can_enter(Upsampled));
        assert!(Idle.can_enter(SampleLoop));
        assert!(Upsampled.can_enter(SampleLoop));
        assert!(SampleLoop.can_enter(Downsampled));
        assert!(Downsampled.can_enter(Idle));
        assert!(Downsampled.can_enter(Upsampled));
        assert!(!Idle.can_enter(Downsampled));
        assert!(!Upsampled.can_enter(Idle));
        assert!(!Downsampled.can_enter(SampleLoop));
    }

    #[test]
    fn empty_block_is_noop() {
        let mut s = stage(true);
        let mut block: [f32; 0] = [];
        s.process_block(&mut block);
        assert_eq!(s.phase(), StagePhase::Idle);
    }

    #[test]
    fn snapshot_loaded_once_per_generation() {
        let mut s = stage(false);
        let mut block = [0.1f32; 16];
        s.process_block(&mut block);
        let gen_before = s.loaded;
        s.process_block(&mut block);
        assert_eq!(s.loaded, gen_before);
        s.params().set_level(0.3);
        s.process_block(&mut block);
        assert_ne!(s.loaded, gen_before);
        assert_eq!(s.chain.level.target(), 0.3);
    }

    #[test]
    fn level_drop_is_immediate() {
        let mut s = stage(false);
        s.params().set_drive(DriveCurve::Hard, 0.0);
        let mut block = [0.5f32; 128];
        for _ in 0..200 {
            block.fill(0.5);
            s.process_block(&mut block);
        }
        s.params().set_level(0.0);
        block.fill(0.5);
        s.process_block(&mut block);
        assert!(block.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn oversized_block_processed_in_pieces() {
        let mut s = stage(true);
        s.params().set_drive(DriveCurve::Tanh, 0.5);
        let mut block = vec![0.3f32; 128 * 3 + 17];
        s.process_block(&mut block);
        assert!(block.iter().all(|x| x.is_finite()));
        assert_eq!(s.phase(), StagePhase::Idle);
    }

    #[test]
    fn reset_restarts_fade_in() {
        let mut s = stage(true);
        let mut block = [0.5f32; 128];
        for _ in 0..50 {
            block.fill(0.5);
            s.process_block(&mut block);
        }
        s.reset();
        assert_eq!(s.chain.gain.get(), 0.0);
        assert_eq!(s.chain.level.get(), 0.0);
    }
}
