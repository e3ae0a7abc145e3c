//! # Step Benchmark
//!
//! Cost of one `Race::step` at the default step size:
//! 1. Simulation only (render off), growing grids
//! 2. Simulation + render pass + fetch, growing resolutions
//! 3. Surroundings probe

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kartlab::{Action, GraphicsConfig, Race, RaceConfig, Runtime};

fn runtime(width: u32, height: u32) -> Runtime {
    let mut runtime = Runtime::new();
    runtime
        .init(GraphicsConfig::ld().with_resolution(width, height))
        .expect("runtime init");
    runtime
}

fn bench_simulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("step_simulation");
    let runtime = runtime(8, 8);

    for karts in [1_u32, 4, 8] {
        let config = RaceConfig {
            num_kart: karts,
            render: false,
            ..RaceConfig::default()
        };
        let mut race = Race::new(&runtime, config).expect("session");
        race.start().expect("start");

        group.bench_with_input(BenchmarkId::new("karts", karts), &karts, |b, _| {
            b.iter(|| {
                if !race.step_single(black_box(&Action::FULL_THROTTLE)) {
                    race.restart();
                }
            });
        });
    }

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("step_render");

    for (width, height) in [(64_u32, 48_u32), (160, 120), (320, 240)] {
        let runtime = runtime(width, height);
        let mut race = Race::new(&runtime, RaceConfig::default()).expect("session");
        race.start().expect("start");

        group.throughput(criterion::Throughput::Elements(u64::from(width * height)));
        group.bench_with_input(
            BenchmarkId::new("pixels", width * height),
            &(width, height),
            |b, _| {
                b.iter(|| {
                    if !race.step_single(black_box(&Action::FULL_THROTTLE)) {
                        race.restart();
                    }
                });
            },
        );
    }

    group.finish();
}

fn bench_surroundings(c: &mut Criterion) {
    let runtime = runtime(8, 8);
    let config = RaceConfig {
        num_kart: 4,
        render: false,
        ..RaceConfig::default()
    };
    let mut race = Race::new(&runtime, config).expect("session");
    race.start().expect("start");

    c.bench_function("surroundings_probe", |b| {
        b.iter(|| black_box(race.surroundings(black_box(0))));
    });
}

criterion_group!(benches, bench_simulation, bench_render, bench_surroundings);
criterion_main!(benches);
