// benches/benchmarks.rs — CPU pipeline benchmarks.
//
//   cargo bench --bench benchmarks
//
// Covers the scalar convolver and the normalizer at a few representative
// image sizes. The GPU comparison lives in gpu_benchmarks.rs (it needs a
// Vulkan device).

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use edgebatch::convolve::{Convolver, ScalarConvolver};
use edgebatch::image::Image;
use edgebatch::kernel::VERTICAL_EDGE;
use edgebatch::normalize::normalize_min_max;

/// Synthetic test image: diagonal gradient with a few bright rectangles,
/// enough structure that the edge response is non-degenerate.
fn make_scene(w: usize, h: usize) -> Image<f32> {
    let mut img = Image::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let base = ((x * 200 / w) + (y * 55 / h)) as f32;
            img.set(x, y, base);
        }
    }
    for rect in 0..6 {
        let rx = (50 + rect * 100) % w;
        let ry = (40 + (rect % 3) * 120) % h;
        for y in ry..(ry + 60).min(h) {
            for x in rx..(rx + 80).min(w) {
                img.set(x, y, 220.0);
            }
        }
    }
    img
}

fn bench_scalar_convolve(c: &mut Criterion) {
    let conv = ScalarConvolver::new();

    let mut group = c.benchmark_group("convolve");
    for (w, h) in [(320, 240), (640, 480), (1280, 720)] {
        let img = make_scene(w, h);
        group.bench_function(BenchmarkId::new("scalar", format!("{w}x{h}")), |b| {
            b.iter(|| conv.convolve(&img, &VERTICAL_EDGE).unwrap())
        });
    }
    group.finish();
}

fn bench_normalize(c: &mut Criterion) {
    let conv = ScalarConvolver::new();
    let img = make_scene(640, 480);
    let raw = conv.convolve(&img, &VERTICAL_EDGE).unwrap();

    let mut group = c.benchmark_group("normalize");
    group.bench_function("min_max_640x480", |b| {
        b.iter(|| normalize_min_max(&raw))
    });
    group.finish();
}

criterion_group!(benches, bench_scalar_convolve, bench_normalize);
criterion_main!(benches);
