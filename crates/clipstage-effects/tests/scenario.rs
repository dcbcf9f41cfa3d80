//! End-to-end scenarios for the nonlinear stage.
//!
//! Drives complete stages through the host contract and measures the
//! output: aliasing with and without oversampling, bypass identity,
//! missing input, fallback, and extreme control settings.

use std::collections::VecDeque;

use clipstage_core::DriveCurve;
use clipstage_effects::{BlockHost, NonlinearStage, StageConfig, StagePhase};
use rustfft::{FftPlanner, num_complex::Complex};

const SAMPLE_RATE: usize = 44_100;
const BLOCK: usize = 128;
const TONE_HZ: usize = 1000;
/// Samples per exact repetition of a 1 kHz tone at 44.1 kHz (10 cycles).
const PERIOD: usize = 441;
/// Analysis window: 100 cycles, 10 Hz bins, harmonics on every 100th bin.
const WINDOW: usize = PERIOD * 10;

/// Sine whose phase is reduced exactly, so every period repeats bit for bit.
fn sine(amplitude: f32, len: usize) -> Vec<f32> {
    (0..len)
        .map(|n| {
            let phase = ((n * TONE_HZ) % SAMPLE_RATE) as f32 / SAMPLE_RATE as f32;
            amplitude * libm::sinf(core::f32::consts::TAU * phase)
        })
        .collect()
}

/// Host that feeds a queue of blocks and collects the output.
struct QueueHost {
    input: VecDeque<Vec<f32>>,
    output: Vec<f32>,
    emitted: usize,
    released: usize,
}

impl QueueHost {
    fn new(signal: &[f32]) -> Self {
        Self {
            input: signal.chunks(BLOCK).map(<[f32]>::to_vec).collect(),
            output: Vec::with_capacity(signal.len()),
            emitted: 0,
            released: 0,
        }
    }
}

impl BlockHost for QueueHost {
    type Block = Vec<f32>;

    fn acquire_input_block(&mut self) -> Option<Vec<f32>> {
        self.input.pop_front()
    }

    fn emit(&mut self, block: &Vec<f32>) {
        self.output.extend_from_slice(block);
        self.emitted += 1;
    }

    fn release_block(&mut self, _block: Vec<f32>) {
        self.released += 1;
    }
}

fn run(stage: &mut NonlinearStage, signal: &[f32]) -> Vec<f32> {
    let mut host = QueueHost::new(signal);
    while stage.run_cycle(&mut host) {
        assert_eq!(stage.phase(), StagePhase::Idle);
    }
    assert_eq!(host.emitted, host.released);
    host.output
}

fn tanh_stage(oversample: bool) -> NonlinearStage {
    let mut stage = NonlinearStage::new(StageConfig::default()).unwrap();
    assert_eq!(stage.begin(oversample), oversample);
    stage.params().apply(|c| {
        c.curve = DriveCurve::Tanh;
        c.drive = 1.0;
        c.level = 1.0;
        c.tone = 1.0;
        c.bottom = 1.0;
    });
    stage
}

/// Split the energy of one analysis window into harmonic and inharmonic parts.
///
/// Harmonics of 1 kHz land on every 100th bin; every other bin holds
/// energy folded back from above Nyquist.
fn harmonic_and_alias_energy(signal: &[f32]) -> (f64, f64) {
    assert_eq!(signal.len(), WINDOW);
    let mut spectrum: Vec<Complex<f64>> = signal
        .iter()
        .map(|&x| Complex::new(f64::from(x), 0.0))
        .collect();
    FftPlanner::<f64>::new().plan_fft_forward(WINDOW).process(&mut spectrum);

    let bin_hz = SAMPLE_RATE / WINDOW;
    let bins_per_harmonic = TONE_HZ / bin_hz;
    let mut harmonic = 0.0;
    let mut alias = 0.0;
    for (k, bin) in spectrum.iter().enumerate().take(WINDOW / 2).skip(1) {
        let energy = bin.norm_sqr();
        if k % bins_per_harmonic == 0 {
            harmonic += energy;
        } else {
            alias += energy;
        }
    }
    (harmonic, alias)
}

// ============================================================================
// Aliasing
// ============================================================================

#[test]
fn oversampled_tanh_suppresses_aliasing() {
    let signal = sine(1.2, BLOCK * 90);
    let tail = signal.len() - WINDOW;

    let over = run(&mut tanh_stage(true), &signal);
    let direct = run(&mut tanh_stage(false), &signal);

    let peak = over[tail..].iter().fold(0.0f32, |m, s| m.max(s.abs()));
    assert!(peak > 0.8, "Clipped output should stay loud, peak {peak}");
    assert!(peak < 1.2, "Clipped output should sit near ±1, peak {peak}");

    let (harm_os, alias_os) = harmonic_and_alias_energy(&over[tail..]);
    let (harm_direct, alias_direct) = harmonic_and_alias_energy(&direct[tail..]);

    assert!(harm_os > 0.0 && harm_direct > 0.0);
    let os_db = 10.0 * (alias_os / harm_os).log10();
    let direct_db = 10.0 * (alias_direct / harm_direct).log10();
    assert!(
        alias_os < 0.1 * alias_direct,
        "Oversampling should cut aliasing by >10 dB: {os_db:.1} dB vs {direct_db:.1} dB"
    );
    assert!(os_db < -30.0, "Alias floor too high: {os_db:.1} dB");
}

#[test]
fn drive_saturates_toward_unity() {
    let signal = sine(0.05, BLOCK * 60);
    let out = run(&mut tanh_stage(true), &signal);
    let tail = &out[out.len() - WINDOW..];
    let peak = tail.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    // Quiet input at full drive still clips close to the ceiling.
    assert!(peak > 0.7 && peak < 1.2, "peak {peak}");
}

// ============================================================================
// Host contract
// ============================================================================

#[test]
fn bypass_is_bit_identical_through_host() {
    let mut stage = NonlinearStage::new(StageConfig::default()).unwrap();
    stage.begin(true);
    stage.params().set_curve(DriveCurve::Linear);

    let signal = sine(3.0, BLOCK * 8 + 31);
    let out = run(&mut stage, &signal);
    assert_eq!(out, signal);
}

#[test]
fn missing_input_is_silent_noop() {
    struct Empty {
        emitted: bool,
    }
    impl BlockHost for Empty {
        type Block = [f32; 4];
        fn acquire_input_block(&mut self) -> Option<[f32; 4]> {
            None
        }
        fn emit(&mut self, _block: &[f32; 4]) {
            self.emitted = true;
        }
        fn release_block(&mut self, _block: [f32; 4]) {}
    }

    let mut stage = NonlinearStage::new(StageConfig::default()).unwrap();
    stage.begin(true);
    let mut host = Empty { emitted: false };
    assert!(!stage.run_cycle(&mut host));
    assert!(!host.emitted);
    assert_eq!(stage.phase(), StagePhase::Idle);
}

#[test]
fn owned_blocks_round_trip() {
    let mut stage = tanh_stage(true);
    let block = stage.process([0.1f32; BLOCK]);
    assert!(block.iter().all(|s| s.is_finite()));
    let boxed: Box<[f32]> = stage.process(vec![0.0f32; 64].into_boxed_slice());
    assert_eq!(boxed.len(), 64);
}

// ============================================================================
// Fallback and configuration
// ============================================================================

#[test]
fn direct_rate_fallback_still_processes() {
    let config = StageConfig::default().with_oversample_factor(1);
    let mut stage = NonlinearStage::new(config).unwrap();
    assert!(!stage.begin(true));
    assert_eq!(stage.latency_samples(), 0);

    stage.params().set_drive(DriveCurve::Hard, 1.0);
    let out = run(&mut stage, &sine(1.0, BLOCK * 40));
    let peak = out[BLOCK * 20..].iter().fold(0.0f32, |m, s| m.max(s.abs()));
    assert!(peak > 0.5 && peak < 1.2, "peak {peak}");
}

#[test]
fn custom_coefficients_are_used() {
    // Five taps at 5x: two high-rate samples of delay per kernel, 0.8 host samples.
    let taps = [0.05f32, 0.2, 0.5, 0.2, 0.05];
    let config = StageConfig::default().with_coefficients(taps.to_vec());
    let mut stage = NonlinearStage::new(config).unwrap();
    assert!(stage.begin(true));
    assert_eq!(stage.latency_samples(), 1);

    stage.params().set_drive(DriveCurve::Cubic, 0.2);
    let out = run(&mut stage, &sine(0.5, BLOCK * 4));
    assert!(out.iter().all(|s| s.is_finite()));
}

#[test]
fn invalid_config_is_rejected() {
    assert!(NonlinearStage::new(StageConfig::default().with_block_len(0)).is_err());
    assert!(NonlinearStage::new(StageConfig::default().with_coefficients(Vec::new())).is_err());
    assert!(NonlinearStage::new(StageConfig::default().with_sample_rate(f32::NAN)).is_err());
}

// ============================================================================
// Curves and extremes
// ============================================================================

#[test]
fn rational_bias_keeps_silence_silent() {
    let mut stage = NonlinearStage::new(StageConfig::default()).unwrap();
    stage.begin(true);
    stage.params().apply(|c| {
        c.curve = DriveCurve::Rational;
        c.drive = 1.0;
        c.shape = 5.0;
        c.bias = 0.4;
    });
    let out = run(&mut stage, &vec![0.0; BLOCK * 4]);
    assert!(out.iter().all(|&s| s == 0.0));
}

#[test]
fn level_zero_is_silent() {
    let mut stage = tanh_stage(true);
    stage.params().set_level(0.0);
    let out = run(&mut stage, &sine(1.0, BLOCK * 8));
    assert!(out.iter().all(|&s| s == 0.0));
}

#[test]
fn extreme_controls_stay_finite() {
    for curve in DriveCurve::ALL {
        for &(lo, oversample) in &[(true, true), (false, true), (true, false), (false, false)] {
            let mut stage = NonlinearStage::new(StageConfig::default()).unwrap();
            stage.begin(oversample);
            stage.params().apply(|c| {
                let v = if lo { 0.0 } else { 1.0 };
                c.curve = curve;
                c.drive = v;
                c.level = v;
                c.tone = v;
                c.bottom = v;
                c.clip = if lo { 0.0 } else { 1.0 };
                c.shape = if lo { 0.0 } else { 100.0 };
                c.bias = if lo { -1.0 } else { 1.0 };
                c.asymmetric = lo;
            });
            let out = run(&mut stage, &sine(4.0, BLOCK * 4));
            assert!(
                out.iter().all(|s| s.is_finite()),
                "{curve} (lo = {lo}, oversample = {oversample}) produced non-finite output"
            );
        }
    }
}

#[test]
fn reset_clears_tail() {
    let mut stage = tanh_stage(true);
    run(&mut stage, &sine(1.0, BLOCK * 10));
    stage.reset();
    let out = run(&mut stage, &vec![0.0; BLOCK * 2]);
    assert!(out.iter().all(|&s| s == 0.0));
}
