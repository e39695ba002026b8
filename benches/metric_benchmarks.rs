use criterion::{criterion_group, criterion_main, Criterion};
use ringgauge::quality::metrics;
use ringgauge::testing::{checkerboard_luma, gradient_luma};

fn bench_blur_variance(c: &mut Criterion) {
    let luma = checkerboard_luma(160, 8, 60, 190);
    c.bench_function("blur_variance_160", |b| {
        b.iter(|| metrics::blur_variance_of_laplacian(luma.data(), 160, 160))
    });
}

fn bench_motion_mad(c: &mut Criterion) {
    let curr = checkerboard_luma(160, 8, 60, 190);
    let prev = gradient_luma(160);
    c.bench_function("motion_mad_160", |b| {
        b.iter(|| metrics::motion_mean_abs_diff(curr.data(), prev.data()))
    });
}

fn bench_exposure_stats(c: &mut Criterion) {
    let luma = gradient_luma(160);
    c.bench_function("exposure_stats_160", |b| {
        b.iter(|| metrics::exposure_stats(luma.data()))
    });
}

criterion_group!(
    benches,
    bench_blur_variance,
    bench_motion_mad,
    bench_exposure_stats
);
criterion_main!(benches);
