//! Benchmarks for vector distance calculations.
//!
//! Run with: `cargo bench -p lsmvec-vector`
//!
//! Compare SIMD vs scalar: `cargo bench -p lsmvec-vector --features scalar`

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lsmvec_vector::distance::{dot_product, l2_squared};
use lsmvec_vector::encoding::{decode_vector, encode_vector};
use rand::Rng;

/// Generate a random vector of the specified dimension.
fn random_vector(dim: usize) -> Vec<f32> {
    let mut rng = rand::thread_rng();
    (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

fn bench_l2_squared(c: &mut Criterion) {
    let mut group = c.benchmark_group("l2_squared");

    for dim in [128, 384, 768, 1536] {
        let a = random_vector(dim);
        let b = random_vector(dim);

        group.throughput(Throughput::Elements(dim as u64));
        group.bench_with_input(BenchmarkId::from_parameter(dim), &dim, |bench, _| {
            bench.iter(|| l2_squared(black_box(&a), black_box(&b)));
        });
    }

    group.finish();
}

fn bench_dot_product(c: &mut Criterion) {
    let mut group = c.benchmark_group("dot_product");

    for dim in [128, 384, 768, 1536] {
        let a = random_vector(dim);
        let b = random_vector(dim);

        group.throughput(Throughput::Elements(dim as u64));
        group.bench_with_input(BenchmarkId::from_parameter(dim), &dim, |bench, _| {
            bench.iter(|| dot_product(black_box(&a), black_box(&b)));
        });
    }

    group.finish();
}

/// Blob decoding runs once per row in a linear scan.
fn bench_blob_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("blob_decode");

    for dim in [128, 768] {
        let blob = encode_vector(&random_vector(dim)).unwrap();

        group.throughput(Throughput::Elements(dim as u64));
        group.bench_with_input(BenchmarkId::from_parameter(dim), &dim, |bench, _| {
            bench.iter(|| decode_vector(black_box(&blob)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_l2_squared, bench_dot_product, bench_blob_decode);
criterion_main!(benches);
