//! Sweep-join throughput on a synthetic overflight.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use track_archive::TrackBlock;
use visibility_kernel::{compute_hits, KernelConfig, VesselFrame};

fn synthetic_inputs(n_vessels: usize) -> (TrackBlock, VesselFrame) {
    let m = 4000usize;
    let mut sat = TrackBlock::default();
    for i in 0..m {
        let t = (60 * i) as f64;
        sat.push(t, 30.0, -110.0 + 10.0 * i as f32 / (m - 1) as f32, 6571.0);
    }

    let span = 60 * (m - 1) as i64;
    let mut vessels = VesselFrame::default();
    for i in 0..n_vessels {
        let frac = i as f64 / (n_vessels - 1) as f64;
        vessels.push(
            (i % 1000) as u32,
            (span as f64 * frac) as i64,
            (25.0 + 15.0 * frac) as f32,
            (-108.0 + 6.0 * ((i * 7) % 1000) as f64 / 1000.0) as f32,
        );
    }
    (sat, vessels)
}

fn bench_compute_hits(c: &mut Criterion) {
    let (sat, vessels) = synthetic_inputs(1_000_000);

    let mut group = c.benchmark_group("compute_hits");
    group.sample_size(10);
    for workers in [1usize, 4, 8] {
        group.bench_with_input(
            BenchmarkId::new("workers", workers),
            &workers,
            |b, &workers| {
                let cfg = KernelConfig {
                    workers: Some(workers),
                    ..KernelConfig::default()
                };
                b.iter(|| compute_hits(&sat, &vessels, &cfg).unwrap());
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_compute_hits);
criterion_main!(benches);
