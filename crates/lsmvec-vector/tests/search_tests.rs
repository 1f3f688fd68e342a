//! End-to-end search tests over an in-memory engine.

use lsmvec_core::{FieldInfo, IndexId, ListId, TableLayout};
use lsmvec_storage::backends::RedbEngine;
use lsmvec_storage::{StorageEngine, Transaction};
use lsmvec_vector::encoding::encode_vector;
use lsmvec_vector::index::{
    create_vector_index, DimensionPolicy, IndexConfig, LinearScanOptions, SearchParams, Strategy,
};
use lsmvec_vector::quantization::{
    store_trained_data, InMemoryTrainedData, StoredTrainedData, TrainedIndexData, TrainedSource,
};
use lsmvec_vector::store::{ListFilter, RowView};
use lsmvec_vector::{
    CancellationFlag, Coordinate, HandlerPhase, Metric, SearchHandler, SearchMode, VectorError,
    VectorIndex,
};

fn pk(table: u8, id: u32) -> Vec<u8> {
    let mut pk = vec![0, 0, 0, table];
    pk.extend_from_slice(&id.to_be_bytes());
    pk
}

fn last_id(key: &[u8]) -> u32 {
    u32::from_be_bytes(key[key.len() - 4..].try_into().expect("id suffix"))
}

/// Drain a handler into row ids.
fn drain<T: Transaction>(handler: &mut SearchHandler<'_, T>) -> Vec<u32> {
    let mut ids = Vec::new();
    while handler.has_next().expect("has_next") {
        ids.push(last_id(handler.current_key().expect("key")));
        handler.advance().expect("advance");
    }
    ids
}

fn grid_vectors() -> Vec<(u32, Vec<f32>)> {
    // Two clusters, around (0, 0, 0) and (10, 10, 10).
    let mut out = Vec::new();
    for i in 0..10u32 {
        let offset = i as f32 * 0.1;
        out.push((i, vec![offset, 0.0, 0.0]));
        out.push((100 + i, vec![10.0 + offset, 10.0, 10.0]));
    }
    out
}

fn trained_centroids() -> TrainedIndexData {
    TrainedIndexData {
        nlist: 2,
        quantizer_codes: vec![0.0, 0.0, 0.0, 10.0, 10.0, 10.0],
        ..TrainedIndexData::default()
    }
}

fn insert_ivf(engine: &RedbEngine, index: &VectorIndex, rows: &[(u32, Vec<f32>)], aux: bool) {
    let VectorIndex::Ivf(ivf) = index else { panic!("expected an IVF index") };
    let mut tx = engine.begin_write().expect("write");
    for (id, v) in rows {
        let assignment = index.assign_vector(v).expect("assign");
        let parity = [(id % 2) as u8];
        ivf.store()
            .put_entry(&mut tx, &assignment, &pk(1, *id), aux.then_some(&parity[..]))
            .expect("put");
    }
    tx.commit().expect("commit");
}

#[test]
fn ivf_flat_search_with_stored_trained_data() {
    let engine = RedbEngine::in_memory().expect("engine");
    let source = TrainedSource::new("trained_index_data", "ivf_3d");
    let mut tx = engine.begin_write().expect("write");
    store_trained_data(&mut tx, &source, &trained_centroids()).expect("store");
    tx.commit().expect("commit");

    let config = IndexConfig::new(3, Strategy::IvfFlat)
        .with_trained_source(source)
        .with_trained_list_count(2);
    let index = create_vector_index(IndexId::new(10), config, &StoredTrainedData::new(&engine))
        .expect("index");
    insert_ivf(&engine, &index, &grid_vectors(), false);

    let tx = engine.begin_read().expect("read");
    let mut handler = SearchHandler::new(&index, &tx);
    handler.prepare(SearchMode::KnnFirst, SearchParams::new(vec![10.0, 10.0, 10.0], 3)).expect("prepare");
    handler.execute().expect("execute");
    assert_eq!(drain(&mut handler), vec![100, 101, 102]);

    let info = index.dump_info();
    assert_eq!(info.nlist, 2);
    assert_eq!(info.ntotal, 10);
    assert_eq!(info.hit, 1);
}

#[test]
fn ivf_pq_end_to_end() {
    let engine = RedbEngine::in_memory().expect("engine");
    let source = TrainedSource::new("trained", "pq");
    // m = 3 one-float segments, 1 bit each: codebook {0, 1} per segment.
    let data = TrainedIndexData {
        pq_m: 3,
        pq_nbits: 1,
        pq_codes: vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0],
        ..trained_centroids()
    };
    let sources = InMemoryTrainedData::new().with(source.clone(), data);
    let index = create_vector_index(
        IndexId::new(11),
        IndexConfig::new(3, Strategy::IvfPq).with_trained_source(source),
        &sources,
    )
    .expect("index");
    let rows = vec![(1, vec![1.0, 0.0, 0.0]), (2, vec![0.0, 1.0, 1.0]), (3, vec![11.0, 11.0, 10.0])];
    insert_ivf(&engine, &index, &rows, false);

    let tx = engine.begin_read().expect("read");
    let params = SearchParams::new(vec![1.0, 0.0, 0.0], 3).with_nprobe(2);
    let hits = index.knn_search(&tx, &params, None, None).expect("search");
    let ids: Vec<u32> = hits.iter().map(|h| last_id(&h.key)).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert!(hits[0].distance.abs() < 1e-6);

    let info = index.dump_info();
    assert_eq!(info.pq_m, Some(3));
    assert_eq!(info.pq_nbits, Some(1));
    assert_eq!(info.code_size, 1);
}

#[test]
fn predicate_pushdown_filters_inside_list_scan() {
    let engine = RedbEngine::in_memory().expect("engine");
    let index = create_vector_index(
        IndexId::new(12),
        IndexConfig::new(3, Strategy::Flat),
        &InMemoryTrainedData::new(),
    )
    .expect("index");
    insert_ivf(&engine, &index, &grid_vectors(), true);

    let layout = TableLayout::new(vec![FieldInfo::fixed(1)]);
    let even =
        ListFilter::on_fields(layout, vec![0], |row: &RowView<'_>| row.field(0) == Some(&[0u8][..]));
    let tx = engine.begin_read().expect("read");
    let mut handler = SearchHandler::new(&index, &tx).with_filter(&even);
    handler.prepare(SearchMode::KnnFirst, SearchParams::new(vec![0.0, 0.0, 0.0], 3)).expect("prepare");
    handler.execute().expect("execute");
    assert_eq!(drain(&mut handler), vec![0, 2, 4]);

    // Filtered-out rows still count towards the list size.
    assert_eq!(index.dump_info().ntotal, 20);
}

#[test]
fn adjacent_indexes_do_not_leak() {
    let engine = RedbEngine::in_memory().expect("engine");
    let source = InMemoryTrainedData::new();
    let a = create_vector_index(IndexId::new(20), IndexConfig::new(3, Strategy::Flat), &source)
        .expect("a");
    let b = create_vector_index(IndexId::new(21), IndexConfig::new(3, Strategy::Flat), &source)
        .expect("b");
    insert_ivf(&engine, &a, &[(1, vec![0.0; 3])], false);
    insert_ivf(&engine, &b, &[(2, vec![0.0; 3]), (3, vec![1.0; 3])], false);

    let tx = engine.begin_read().expect("read");
    let params = SearchParams::new(vec![0.0; 3], 10);
    assert_eq!(a.knn_search(&tx, &params, None, None).expect("a").len(), 1);
    assert_eq!(b.knn_search(&tx, &params, None, None).expect("b").len(), 2);
}

#[test]
fn padded_query_matches_explicit_padding() {
    let engine = RedbEngine::in_memory().expect("engine");
    let source = InMemoryTrainedData::new();
    let index = create_vector_index(IndexId::new(30), IndexConfig::new(3, Strategy::Flat), &source)
        .expect("index");
    insert_ivf(&engine, &index, &grid_vectors(), false);
    let tx = engine.begin_read().expect("read");

    let short = index.knn_search(&tx, &SearchParams::new(vec![0.5, 0.0], 4), None, None).expect("short");
    let full =
        index.knn_search(&tx, &SearchParams::new(vec![0.5, 0.0, 0.0], 4), None, None).expect("full");
    assert_eq!(short, full);

    let long = index.knn_search(&tx, &SearchParams::new(vec![0.0; 4], 4), None, None);
    assert!(matches!(long, Err(VectorError::InvalidArgument(_))));

    let strict = create_vector_index(
        IndexId::new(31),
        IndexConfig::new(3, Strategy::Flat).with_dimension_policy(DimensionPolicy::Strict),
        &source,
    )
    .expect("strict");
    let result = strict.knn_search(&tx, &SearchParams::new(vec![0.5, 0.0], 4), None, None);
    assert!(matches!(result, Err(VectorError::InvalidArgument(_))));
}

fn linear_rows(engine: &RedbEngine, index: &VectorIndex, rows: &[(u32, [f32; 3], Coordinate)]) {
    let VectorIndex::LinearScan(linear) = index else { panic!("expected a linear scan index") };
    let mut tx = engine.begin_write().expect("write");
    for (id, v, at) in rows {
        let blob = encode_vector(v).unwrap();
        let geometry = at.to_geometry();
        let mut row = id.to_le_bytes().to_vec();
        row.extend_from_slice(&u16::try_from(blob.len()).expect("len").to_le_bytes());
        row.extend_from_slice(&blob);
        row.extend_from_slice(&u16::try_from(geometry.len()).expect("len").to_le_bytes());
        row.extend_from_slice(&geometry);
        linear.put_row(&mut tx, &pk(2, *id), &row).expect("put");
    }
    tx.commit().expect("commit");
}

fn linear_index() -> VectorIndex {
    let layout = TableLayout::new(vec![FieldInfo::fixed(4), FieldInfo::blob(2), FieldInfo::blob(2)]);
    let config = IndexConfig::new(3, Strategy::LinearScan)
        .with_linear_scan(LinearScanOptions::new(layout, 1).with_spatial_field(2));
    create_vector_index(IndexId::new(40), config, &InMemoryTrainedData::new()).expect("index")
}

#[test]
fn linear_scan_k3_of_5_with_ties() {
    let engine = RedbEngine::in_memory().expect("engine");
    let index = linear_index();
    let here = Coordinate::new(0.0, 0.0);
    // Squared distances to the origin: 4, 1, 9, 1, 0.25.
    linear_rows(
        &engine,
        &index,
        &[
            (1, [2.0, 0.0, 0.0], here),
            (2, [0.0, 1.0, 0.0], here),
            (3, [0.0, 0.0, 3.0], here),
            (4, [0.0, 0.0, -1.0], here),
            (5, [0.5, 0.0, 0.0], here),
        ],
    );
    let tx = engine.begin_read().expect("read");
    let mut handler = SearchHandler::new(&index, &tx);
    handler.prepare(SearchMode::KnnFirst, SearchParams::new(vec![0.0; 3], 3)).expect("prepare");
    handler.execute().expect("execute");

    let mut ranked = Vec::new();
    while handler.has_next().expect("has_next") {
        let value = handler.current_value().expect("value");
        ranked.push((
            u32::from_le_bytes(value[..4].try_into().expect("id")),
            handler.current_distance().expect("distance").expect("ranked"),
        ));
        handler.advance().expect("advance");
    }
    assert_eq!(ranked, vec![(5, 0.25), (2, 1.0), (4, 1.0)]);
}

#[test]
fn hybrid_ranking_flips_with_weight() {
    let engine = RedbEngine::in_memory().expect("engine");
    let index = linear_index();
    // Row 1 is nearer in vector space, row 2 nearer on the map.
    linear_rows(
        &engine,
        &index,
        &[(1, [1.0, 0.0, 0.0], Coordinate::new(1.0, 1.0)), (2, [3.0, 0.0, 0.0], Coordinate::new(0.0, 0.0))],
    );
    let tx = engine.begin_read().expect("read");
    let base = SearchParams::new(vec![0.0; 3], 2)
        .with_coordinate(Coordinate::new(0.0, 0.0))
        .with_metric(Metric::L2);

    let mut order = Vec::new();
    for weight in [0.0f32, 1e-6, 1e-3] {
        let mut handler = SearchHandler::new(&index, &tx);
        handler.prepare(SearchMode::KnnHybrid, base.clone().with_weight(weight)).expect("prepare");
        handler.execute().expect("execute");
        order.push(drain(&mut handler));
    }
    assert_eq!(order[0], vec![1, 2]);
    assert_eq!(order[2], vec![2, 1]);
}

#[test]
fn cancellation_aborts_without_results() {
    let engine = RedbEngine::in_memory().expect("engine");
    let index = linear_index();
    linear_rows(&engine, &index, &[(1, [1.0, 0.0, 0.0], Coordinate::new(0.0, 0.0))]);
    let flag = CancellationFlag::new();
    let tx = engine.begin_read().expect("read");
    let mut handler = SearchHandler::new(&index, &tx).with_cancellation(flag.clone());
    handler.prepare(SearchMode::KnnFirst, SearchParams::new(vec![0.0; 3], 1)).expect("prepare");
    flag.cancel();
    assert!(matches!(handler.execute(), Err(VectorError::Cancelled)));
    assert_eq!(handler.phase(), HandlerPhase::Exhausted);
}

#[test]
fn analyze_fills_list_statistics() {
    let engine = RedbEngine::in_memory().expect("engine");
    let sources = InMemoryTrainedData::new()
        .with(TrainedSource::new("t", "c"), trained_centroids());
    let index = create_vector_index(
        IndexId::new(50),
        IndexConfig::new(3, Strategy::IvfFlat).with_trained_source(TrainedSource::new("t", "c")),
        &sources,
    )
    .expect("index");
    let mut rows = grid_vectors();
    rows.push((200, vec![9.0, 9.0, 9.0]));
    insert_ivf(&engine, &index, &rows, false);

    let tx = engine.begin_read().expect("read");
    index.analyze(&tx, 0, None).expect("analyze");
    let info = index.dump_info();
    assert_eq!(info.ntotal, 21);
    assert_eq!(info.min_list_size, 10);
    assert_eq!(info.max_list_size, 11);
    assert_eq!(info.avg_list_size, 10);
    assert_eq!(info.median_list_size, 11);

    let VectorIndex::Ivf(ivf) = &index else { panic!("expected an IVF index") };
    let in_list_one = ivf
        .store()
        .iterate(&tx, ListId::new(1), None, None)
        .expect("iterate")
        .count();
    assert_eq!(in_list_one, 11);
}
