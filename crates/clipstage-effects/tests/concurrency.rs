//! Cross-thread parameter stress tests.
//!
//! Control threads hammer the store while an audio thread processes blocks
//! and a reader checks that every snapshot it sees is internally
//! consistent: derived values must always belong to the controls they sit
//! next to.

use std::sync::atomic::{AtomicBool, Ordering};

use clipstage_core::{DriveCurve, rational_mix};
use clipstage_effects::{NonlinearStage, ParamSnapshot, ParameterStore, StageConfig};

const WRITES: usize = 20_000;

fn assert_consistent(store: &ParameterStore, snap: &ParamSnapshot) {
    let c = snap.controls;
    let tuning = store.tuning(c.curve);
    assert_eq!(
        snap.drive_gain,
        tuning.drive_gain(c.drive),
        "drive gain from another update (curve {}, drive {})",
        c.curve,
        c.drive
    );
    assert_eq!(snap.output_level, c.level * tuning.output_scale);
    if c.curve.uses_dry_mix() {
        assert_eq!((snap.dry, snap.wet), rational_mix(snap.drive_gain, c.shape));
    } else {
        assert_eq!((snap.dry, snap.wet), (0.0, 1.0));
    }
}

#[test]
fn snapshots_are_never_torn() {
    let mut stage = NonlinearStage::new(StageConfig::default()).unwrap();
    stage.begin(true);
    let store = stage.params();
    store.apply(|c| {
        c.drive = 0.0;
        c.level = 0.0;
    });
    let done = AtomicBool::new(false);

    std::thread::scope(|s| {
        // Multi-field writer: drive and level always move together.
        s.spawn(|| {
            for i in 0..WRITES {
                let v = (i % 101) as f32 / 100.0;
                let curve = DriveCurve::ALL[i % DriveCurve::ALL.len()];
                store.apply(|c| {
                    c.curve = curve;
                    c.drive = v;
                    c.level = v;
                    c.shape = v * 10.0;
                });
            }
            done.store(true, Ordering::Release);
        });

        // Single-field writer on unrelated controls.
        s.spawn(|| {
            let mut i = 0usize;
            while !done.load(Ordering::Acquire) {
                let v = (i % 17) as f32 / 16.0;
                store.set_tone(v);
                store.set_bottom(1.0 - v);
                i += 1;
            }
        });

        // Reader
        s.spawn(|| {
            let mut last_generation = 0;
            while !done.load(Ordering::Acquire) {
                let snap = store.snapshot();
                assert!(snap.generation >= last_generation, "generation went backwards");
                last_generation = snap.generation;
                assert_eq!(
                    snap.controls.drive, snap.controls.level,
                    "drive and level from different updates"
                );
                assert_consistent(&store, &snap);
            }
        });

        // Audio context
        s.spawn(|| {
            let mut block = vec![0.0f32; 128];
            let mut n = 0usize;
            while !done.load(Ordering::Acquire) {
                for (i, x) in block.iter_mut().enumerate() {
                    *x = ((n + i) % 64) as f32 / 32.0 - 1.0;
                }
                stage.process_block(&mut block);
                assert!(block.iter().all(|x| x.is_finite()));
                n += block.len();
            }
        });
    });

    let snap = store.snapshot();
    assert_consistent(&store, &snap);
    assert_eq!(snap.controls.drive, snap.controls.level);
}

#[test]
fn concurrent_setters_all_land() {
    let stage = NonlinearStage::new(StageConfig::default()).unwrap();
    let store = stage.params();
    let before = store.generation();

    std::thread::scope(|s| {
        for t in 0..4 {
            let store = &store;
            s.spawn(move || {
                for i in 0..1000 {
                    store.set_shape((t * 1000 + i) as f32 / 4000.0);
                }
            });
        }
    });

    assert_eq!(store.generation() - before, 4000);
    let shape = store.controls().shape;
    assert!((0.0..=1.0).contains(&shape));
}
