//! Benchmarks for linear-scan and flat IVF search over an in-memory engine.
//!
//! Run with: `cargo bench -p lsmvec-vector --bench linear_scan`

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lsmvec_core::{FieldInfo, IndexId, TableLayout};
use lsmvec_storage::backends::RedbEngine;
use lsmvec_storage::StorageEngine;
use lsmvec_vector::encoding::encode_vector;
use lsmvec_vector::index::{
    create_vector_index, IndexConfig, LinearScanOptions, SearchParams, Strategy,
};
use lsmvec_vector::quantization::InMemoryTrainedData;
use lsmvec_vector::VectorIndex;
use rand::Rng;

const DIM: usize = 64;

fn random_vector(dim: usize) -> Vec<f32> {
    let mut rng = rand::thread_rng();
    (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

fn pk(i: u32) -> Vec<u8> {
    let mut pk = vec![0, 0, 0, 1];
    pk.extend_from_slice(&i.to_be_bytes());
    pk
}

fn linear_index(engine: &RedbEngine, rows: u32) -> VectorIndex {
    let layout = TableLayout::new(vec![FieldInfo::blob(2)]);
    let config = IndexConfig::new(DIM, Strategy::LinearScan)
        .with_linear_scan(LinearScanOptions::new(layout, 0));
    let index = create_vector_index(IndexId::new(1), config, &InMemoryTrainedData::new()).unwrap();
    let VectorIndex::LinearScan(linear) = &index else { unreachable!() };

    let mut tx = engine.begin_write().unwrap();
    for i in 0..rows {
        let blob = encode_vector(&random_vector(DIM)).unwrap();
        let mut row = u16::try_from(blob.len()).unwrap().to_le_bytes().to_vec();
        row.extend_from_slice(&blob);
        linear.put_row(&mut tx, &pk(i), &row).unwrap();
    }
    tx.commit().unwrap();
    index
}

fn flat_index(engine: &RedbEngine, rows: u32) -> VectorIndex {
    let config = IndexConfig::new(DIM, Strategy::Flat);
    let index = create_vector_index(IndexId::new(2), config, &InMemoryTrainedData::new()).unwrap();
    let VectorIndex::Ivf(ivf) = &index else { unreachable!() };

    let mut tx = engine.begin_write().unwrap();
    for i in 0..rows {
        let assignment = ivf.assign_vector(&random_vector(DIM)).unwrap();
        ivf.store().put_entry(&mut tx, &assignment, &pk(i), None).unwrap();
    }
    tx.commit().unwrap();
    index
}

fn bench_knn(c: &mut Criterion) {
    let mut group = c.benchmark_group("knn_search");
    group.sample_size(20);

    for rows in [1_000u32, 10_000] {
        let engine = RedbEngine::in_memory().unwrap();
        let linear = linear_index(&engine, rows);
        let flat = flat_index(&engine, rows);
        let params = SearchParams::new(random_vector(DIM), 10);
        let tx = engine.begin_read().unwrap();

        group.bench_with_input(BenchmarkId::new("linear_scan", rows), &rows, |bench, _| {
            bench.iter(|| linear.knn_search_with_value(&tx, black_box(&params), None).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("flat_ivf", rows), &rows, |bench, _| {
            bench.iter(|| flat.knn_search(&tx, black_box(&params), None, None).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_knn);
criterion_main!(benches);
