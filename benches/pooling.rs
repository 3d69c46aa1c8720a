//! Benchmark for the compact bilinear pooling engine on a realistic
//! block3_conv3-sized feature tensor.

use criterion::{criterion_group, criterion_main, Criterion};
use deeptexture::CompactBilinearPooling;
use ndarray::Array4;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn benchmark_compact_bilinear_pooling(c: &mut Criterion) {
    // Configure criterion with smaller sample size
    let mut group = c.benchmark_group("compact_bilinear_pooling");
    group.sample_size(10);

    let mut rng = StdRng::seed_from_u64(7);
    let features = Array4::from_shape_fn((1, 256, 28, 28), |_| rng.gen_range(-1.0f32..1.0));
    let engine = CompactBilinearPooling::new(256, 1024).expect("valid pooling dimensions");

    group.bench_function("pool_256ch_28x28_to_1024", |b| {
        b.iter(|| {
            let _descriptor = engine.forward(&features).expect("pooling succeeds");
        })
    });

    group.finish();
}

criterion_group!(benches, benchmark_compact_bilinear_pooling);
criterion_main!(benches);
