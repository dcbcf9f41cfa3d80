//! Property-based tests for the assembled stage and its parameter store.
//!
//! Verifies that any control setting and any finite input give finite
//! output, that the linear curve is a bit-exact bypass, and that the store
//! keeps every control inside its range no matter what the caller sends.

use clipstage_core::DriveCurve;
use clipstage_effects::params::{MAX_BIAS, MAX_SHAPE, MIN_CLIP};
use clipstage_effects::{Controls, NonlinearStage, StageConfig};
use proptest::prelude::*;

fn any_control() -> impl Strategy<Value = f32> {
    prop_oneof![
        -2.0f32..=2.0f32,
        Just(f32::NAN),
        Just(f32::INFINITY),
        Just(f32::NEG_INFINITY),
    ]
}

fn stage_with(curve_idx: usize, values: &[f32; 8], oversample: bool) -> NonlinearStage {
    let mut stage = NonlinearStage::new(StageConfig::default()).unwrap();
    stage.begin(oversample);
    stage.params().apply(|c| {
        c.curve = DriveCurve::ALL[curve_idx % DriveCurve::ALL.len()];
        c.drive = values[0];
        c.level = values[1];
        c.tone = values[2];
        c.bottom = values[3];
        c.clip = values[4];
        c.shape = values[5] * MAX_SHAPE;
        c.bias = values[6] - 0.5;
        c.asymmetric = values[7] > 0.5;
    });
    stage
}

fn assert_in_range(c: &Controls) {
    for v in [c.drive, c.level, c.tone, c.bottom] {
        assert!((0.0..=1.0).contains(&v), "normalized control out of range: {v}");
    }
    assert!((MIN_CLIP..=1.0).contains(&c.clip), "clip {}", c.clip);
    assert!((0.0..=MAX_SHAPE).contains(&c.shape), "shape {}", c.shape);
    assert!((-MAX_BIAS..=MAX_BIAS).contains(&c.bias), "bias {}", c.bias);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Any controls, any finite input, either rate: finite output.
    #[test]
    fn any_settings_finite_output(
        input in prop::collection::vec(-8.0f32..=8.0f32, 1..400),
        values in prop::array::uniform8(0.0f32..=1.0f32),
        curve_idx in 0usize..8,
        oversample in any::<bool>(),
    ) {
        let mut stage = stage_with(curve_idx, &values, oversample);
        let mut block = input.clone();
        stage.process_block(&mut block);
        prop_assert!(
            block.iter().all(|s| s.is_finite()),
            "{} produced non-finite output",
            DriveCurve::ALL[curve_idx]
        );
        prop_assert_eq!(block.len(), input.len());
    }

    /// The linear curve hands the block back untouched.
    #[test]
    fn linear_is_bit_exact_bypass(
        input in prop::collection::vec(-100.0f32..=100.0f32, 1..300),
        values in prop::array::uniform8(0.0f32..=1.0f32),
        oversample in any::<bool>(),
    ) {
        let mut stage = stage_with(DriveCurve::Linear.index(), &values, oversample);
        let mut block = input.clone();
        stage.process_block(&mut block);
        prop_assert_eq!(block, input);
    }

    /// Whatever a setter receives, the stored controls stay in range.
    #[test]
    fn setters_keep_controls_in_range(
        drive in any_control(),
        level in any_control(),
        tone in any_control(),
        bottom in any_control(),
        clip in any_control(),
        shape in prop_oneof![-50.0f32..=50.0f32, Just(f32::NAN)],
        bias in any_control(),
    ) {
        let stage = NonlinearStage::new(StageConfig::default()).unwrap();
        let params = stage.params();
        params.set_gain(drive);
        params.set_level(level);
        params.set_tone(tone);
        params.set_bottom(bottom);
        params.set_clip(clip);
        params.set_shape(shape);
        params.set_bias(bias);

        let controls = params.controls();
        assert_in_range(&controls);
        prop_assert_eq!(params.snapshot().controls, controls);
        prop_assert!(params.snapshot().drive_gain.is_finite());
    }

    /// NaN never replaces a good value.
    #[test]
    fn nan_keeps_previous(value in 0.0f32..=1.0f32) {
        let stage = NonlinearStage::new(StageConfig::default()).unwrap();
        let params = stage.params();
        params.set_tone(value);
        params.set_tone(f32::NAN);
        prop_assert_eq!(params.controls().tone, value);
    }
}
