//! Criterion benchmarks for the corvid-core driver loop
//!
//! Run with: cargo bench -p corvid-core
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use corvid_core::{CvEngine, EngineConfig, NUM_CHANNELS, NullNotifier, Scale, Segment};

const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512, 1024];

const MAJOR: [f32; 7] = [0.0, 2.0, 4.0, 5.0, 7.0, 9.0, 11.0];

/// Every channel busy: slews, looping-ish programs, clocks and a quantizer.
fn busy_engine() -> CvEngine {
    let mut engine = CvEngine::new(EngineConfig::default());
    let envelope = [
        Segment::new(5.0, 0.01),
        Segment::new(2.0, 0.05),
        Segment::new(0.0, 0.2),
    ];
    for ch in 1..=2 {
        engine.set_slew_time(ch, 0.5).unwrap();
        engine.set_voltage(ch, 4.0).unwrap();
    }
    for ch in 3..=5 {
        engine.set_program(ch, &envelope).unwrap();
        engine.trigger_program(ch).unwrap();
    }
    engine.set_clock_mode(6, 0.25, None).unwrap();
    engine.set_clock_mode(7, 1.0, Some(&envelope)).unwrap();
    engine.set_scale(8, &MAJOR, 12.0, 1.0).unwrap();
    engine.set_slew_time(8, 2.0).unwrap();
    engine.set_voltage(8, 3.0).unwrap();
    engine
}

fn bench_process_sample(c: &mut Criterion) {
    let mut group = c.benchmark_group("Engine");
    let dt = EngineConfig::default().sample_time();

    for &block_size in BLOCK_SIZES {
        group.bench_with_input(
            BenchmarkId::new("process_block", block_size),
            &block_size,
            |b, &size| {
                let mut engine = busy_engine();
                let mut frames = vec![[0.0; NUM_CHANNELS]; size];
                b.iter(|| {
                    black_box(engine.process_block(black_box(dt), &mut frames, &mut NullNotifier));
                });
            },
        );
    }

    group.bench_function("idle_sample", |b| {
        let mut engine = CvEngine::default();
        let mut frame = [0.0; NUM_CHANNELS];
        b.iter(|| {
            black_box(engine.process_sample(black_box(dt), &mut frame, &mut NullNotifier));
        });
    });

    group.finish();
}

fn bench_quantize(c: &mut Criterion) {
    let mut group = c.benchmark_group("Scale");
    let scale = Scale::chromatic_octave(&MAJOR);

    group.bench_function("quantize", |b| {
        let mut v = -5.0_f32;
        b.iter(|| {
            v = if v > 5.0 { -5.0 } else { v + 0.0137 };
            black_box(scale.quantize(black_box(v)))
        });
    });

    group.finish();
}

criterion_group!(benches, bench_process_sample, bench_quantize);

criterion_main!(benches);
