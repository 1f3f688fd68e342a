//! Linear-scan strategy.
//!
//! Rows live directly under the index as `[index_id][pk suffix] -> packed
//! row`. Every search walks the whole index range, decodes the vector field of
//! each row and keeps a bounded top-k.

use std::sync::atomic::{AtomicU64, Ordering};

use lsmvec_core::encoding::decode_fields;
use lsmvec_core::{IndexId, ListId};
use lsmvec_storage::{Cursor, Transaction};
use tracing::debug;

use super::config::{IndexConfig, Strategy};
use super::encode_flat_codes;
use super::info::IndexInfo;
use super::params::SearchParams;
use crate::cancel::CancellationFlag;
use crate::encoding::{decode_vector, encode_row_key, index_range, pk_suffix};
use crate::error::{Result, VectorError};
use crate::ops::{Coordinate, HybridCombiner, SearchHit, SpatialDistance, TopK};
use crate::store::{Assignment, INDEX_TABLE};

/// A brute-force index over stored rows.
#[derive(Debug)]
pub struct LinearScanIndex {
    index_id: IndexId,
    config: IndexConfig,
    /// Rows seen by the last completed full scan.
    ntotal: AtomicU64,
    hit: AtomicU64,
}

impl LinearScanIndex {
    /// Create the index.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::InvalidConfig`] if the configuration is invalid
    /// or not a linear-scan configuration.
    pub fn setup(index_id: IndexId, config: IndexConfig) -> Result<Self> {
        if config.strategy != Strategy::LinearScan {
            return Err(VectorError::InvalidConfig(format!(
                "{:?} is not a linear scan strategy",
                config.strategy
            )));
        }
        config.validate()?;
        debug!(%index_id, dimension = config.dimension, "linear scan index ready");
        Ok(Self { index_id, config, ntotal: AtomicU64::new(0), hit: AtomicU64::new(0) })
    }

    /// The index id.
    #[must_use]
    pub const fn index_id(&self) -> IndexId {
        self.index_id
    }

    /// The index configuration.
    #[must_use]
    pub const fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Encode a vector as raw codes in the single implicit list.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::InvalidArgument`] on a dimension mismatch.
    pub fn assign_vector(&self, vector: &[f32]) -> Result<Assignment> {
        if vector.len() != self.config.dimension {
            return Err(VectorError::InvalidArgument(format!(
                "vector has {} elements, index dimension is {}",
                vector.len(),
                self.config.dimension
            )));
        }
        Ok(Assignment { list_id: ListId::new(0), codes: encode_flat_codes(vector) })
    }

    /// Store a packed row under the caller's write transaction.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::InvalidArgument`] for an empty primary key, or
    /// the storage error.
    pub fn put_row<T: Transaction>(&self, tx: &mut T, pk: &[u8], row: &[u8]) -> Result<()> {
        tx.put(INDEX_TABLE, &encode_row_key(self.index_id, pk_suffix(pk)?), row)?;
        Ok(())
    }

    /// Delete a stored row. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::InvalidArgument`] for an empty primary key, or
    /// the storage error.
    pub fn delete_row<T: Transaction>(&self, tx: &mut T, pk: &[u8]) -> Result<bool> {
        Ok(tx.delete(INDEX_TABLE, &encode_row_key(self.index_id, pk_suffix(pk)?))?)
    }

    /// The `k` rows nearest the query, with their stored values.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::InvalidArgument`] for bad parameters,
    /// [`VectorError::CorruptData`] for an undecodable row,
    /// [`VectorError::Cancelled`], or the storage error.
    pub fn knn_search_with_value<T: Transaction>(
        &self,
        tx: &T,
        params: &SearchParams,
        cancel: Option<&CancellationFlag>,
    ) -> Result<Vec<SearchHit>> {
        params.validate_knn()?;
        self.ranked(tx, params, params.k, cancel)
    }

    /// Up to `index_scan_cap` rows nearest the query, ignoring `k`.
    ///
    /// # Errors
    ///
    /// As [`knn_search_with_value`](Self::knn_search_with_value).
    pub fn index_scan_with_value<T: Transaction>(
        &self,
        tx: &T,
        params: &SearchParams,
        cancel: Option<&CancellationFlag>,
    ) -> Result<Vec<SearchHit>> {
        params.validate_scan()?;
        self.ranked(tx, params, self.config.linear_scan.index_scan_cap, cancel)
    }

    fn ranked<T: Transaction>(
        &self,
        tx: &T,
        params: &SearchParams,
        k: usize,
        cancel: Option<&CancellationFlag>,
    ) -> Result<Vec<SearchHit>> {
        let query = self.config.normalize_query(&params.query)?;
        self.hit.fetch_add(1, Ordering::Relaxed);
        let vector_field = self.config.linear_scan.vector_field;
        debug!(index_id = %self.index_id, k, metric = %params.metric, "linear scan");

        let mut top = TopK::new(k, params.metric);
        self.scan(tx, &[vector_field], cancel, &mut top, |fields| {
            let vector = self.decode_vector_field(fields[0])?;
            Ok(vector.map(|v| (params.metric.score(&query, &v), ())))
        })?;
        Ok(top
            .into_sorted()
            .into_iter()
            .map(|(distance, ((), (key, value)))| SearchHit::new(key, distance).with_value(value))
            .collect())
    }

    /// Hybrid search over the `k` rows nearest the query vector.
    ///
    /// The pool of `k` vector neighbours is reranked by
    /// `vector cost + weight * spatial distance` and returned in that order,
    /// with the combined cost as the reported distance. Callers wanting `n`
    /// results pass a `k` larger than `n` so that rows outside the vector
    /// top `n` can still win on the combined cost.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::InvalidConfig`] if the index has no spatial
    /// field, [`VectorError::CorruptData`] for an undecodable vector or
    /// geometry, plus the errors of
    /// [`knn_search_with_value`](Self::knn_search_with_value).
    pub fn knn_search_hybrid_with_value<T: Transaction>(
        &self,
        tx: &T,
        params: &SearchParams,
        spatial: &dyn SpatialDistance,
        cancel: Option<&CancellationFlag>,
    ) -> Result<Vec<SearchHit>> {
        params.validate_hybrid()?;
        let options = &self.config.linear_scan;
        let spatial_field = options.spatial_field.ok_or_else(|| {
            VectorError::InvalidConfig(format!("index {} has no spatial field", self.index_id))
        })?;
        let origin = params.coordinate.ok_or_else(|| {
            VectorError::InvalidArgument("hybrid search needs a query coordinate".to_string())
        })?;
        let query = self.config.normalize_query(&params.query)?;
        self.hit.fetch_add(1, Ordering::Relaxed);
        let combiner = HybridCombiner::new(params.weight);
        debug!(
            index_id = %self.index_id,
            k = params.k,
            weight = params.weight,
            "hybrid linear scan"
        );

        let mut pool = TopK::new(params.k, params.metric);
        self.scan(tx, &[options.vector_field, spatial_field], cancel, &mut pool, |fields| {
            let Some(vector) = self.decode_vector_field(fields[0])? else {
                return Ok(None);
            };
            if fields[1].is_empty() {
                return Ok(None);
            }
            let point = Coordinate::from_geometry(fields[1])?;
            let score = params.metric.score(&query, &vector);
            let combined =
                combiner.combine(params.metric.as_cost(score), spatial.distance(origin, point));
            Ok(Some((score, combined)))
        })?;

        // Stable sort keeps vector order among equal combined costs.
        let mut reranked: Vec<(f32, Row)> =
            pool.into_sorted().into_iter().map(|(_, entry)| entry).collect();
        reranked.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(reranked
            .into_iter()
            .map(|(cost, (key, value))| SearchHit::new(key, cost).with_value(value))
            .collect())
    }

    /// Walk every non-empty row of the index, offering the score of each row to `top`.
    ///
    /// `score` sees the decoded `fields` and returns the ranking score plus
    /// any extra per-row data, or `None` to skip the row.
    fn scan<T, E, F>(
        &self,
        tx: &T,
        fields: &[usize],
        cancel: Option<&CancellationFlag>,
        top: &mut TopK<(E, Row)>,
        mut score: F,
    ) -> Result<()>
    where
        T: Transaction,
        F: FnMut(&[&[u8]]) -> Result<Option<(f32, E)>>,
    {
        let range = index_range(self.index_id);
        let (start, end) = range.bounds();
        let mut cursor = tx.range(INDEX_TABLE, start, end)?;
        let layout = &self.config.linear_scan.table_layout;
        let mut rows = 0u64;
        while let Some((key, value)) = cursor.next()? {
            if let Some(cancel) = cancel {
                cancel.check()?;
            }
            if value.is_empty() {
                continue;
            }
            rows += 1;
            let decoded = decode_fields(layout, &value, fields)?;
            if let Some((s, extra)) = score(&decoded)? {
                top.push(s, (extra, (key, value)));
            }
        }
        self.ntotal.store(rows, Ordering::Relaxed);
        Ok(())
    }

    /// Decode a vector column; `None` for a null column.
    fn decode_vector_field(&self, blob: &[u8]) -> Result<Option<Vec<f32>>> {
        if blob.is_empty() {
            return Ok(None);
        }
        let vector = decode_vector(blob)?;
        if vector.len() != self.config.dimension {
            return Err(VectorError::CorruptData(format!(
                "stored vector has {} elements, index {} has dimension {}",
                vector.len(),
                self.index_id,
                self.config.dimension
            )));
        }
        Ok(Some(vector))
    }

    /// Linear scan has no list statistics to gather.
    ///
    /// # Errors
    ///
    /// Never fails.
    pub fn analyze(&self) -> Result<()> {
        Ok(())
    }

    /// Diagnostics snapshot: only `ntotal` and `hit` are meaningful.
    #[must_use]
    pub fn dump_info(&self) -> IndexInfo {
        IndexInfo {
            ntotal: self.ntotal.load(Ordering::Relaxed),
            hit: self.hit.load(Ordering::Relaxed),
            ..IndexInfo::default()
        }
    }
}

/// A stored `(key, value)` pair.
type Row = (Vec<u8>, Vec<u8>);


#[cfg(test)]
mod tests {
    use lsmvec_core::{FieldInfo, TableLayout};
    use lsmvec_storage::backends::RedbEngine;
    use lsmvec_storage::StorageEngine;

    use super::*;
    use crate::index::LinearScanOptions;
    use crate::encoding::encode_vector;
    use crate::ops::Haversine;

    const INDEX: IndexId = IndexId::new(7);

    fn pk(id: u8) -> Vec<u8> {
        vec![0, 0, 0, 1, id]
    }

    /// `[id: fixed 1][vector: blob, 2-byte length][geometry: blob, 1-byte length]`.
    fn layout() -> TableLayout {
        TableLayout::new(vec![FieldInfo::fixed(1), FieldInfo::blob(2), FieldInfo::blob(1)])
    }

    fn row(id: u8, vector: &[f32], at: Coordinate) -> Vec<u8> {
        let blob = encode_vector(vector).unwrap();
        let geometry = at.to_geometry();
        let mut out = vec![id];
        out.extend_from_slice(&u16::try_from(blob.len()).unwrap().to_le_bytes());
        out.extend_from_slice(&blob);
        out.push(u8::try_from(geometry.len()).unwrap());
        out.extend_from_slice(&geometry);
        out
    }

    fn index() -> LinearScanIndex {
        let options = LinearScanOptions::new(layout(), 1).with_spatial_field(2);
        LinearScanIndex::setup(
            INDEX,
            IndexConfig::new(2, Strategy::LinearScan).with_linear_scan(options),
        )
        .unwrap()
    }

    fn load(engine: &RedbEngine, index: &LinearScanIndex, rows: &[(u8, [f32; 2], Coordinate)]) {
        let mut tx = engine.begin_write().unwrap();
        for (id, v, at) in rows {
            index.put_row(&mut tx, &pk(*id), &row(*id, v, *at)).unwrap();
        }
        tx.commit().unwrap();
    }

    fn ids(hits: &[SearchHit]) -> Vec<u8> {
        hits.iter().map(|h| h.value.as_ref().unwrap()[0]).collect()
    }

    fn origin() -> Coordinate {
        Coordinate::new(0.0, 0.0)
    }

    #[test]
    fn knn_returns_smallest_distances_in_order() {
        let engine = RedbEngine::in_memory().unwrap();
        let index = index();
        // Squared distances to the origin: 25, 1, 4, 1, 9.
        load(
            &engine,
            &index,
            &[
                (1, [3.0, 4.0], origin()),
                (2, [1.0, 0.0], origin()),
                (3, [0.0, 2.0], origin()),
                (4, [0.0, -1.0], origin()),
                (5, [3.0, 0.0], origin()),
            ],
        );
        let tx = engine.begin_read().unwrap();
        let hits =
            index.knn_search_with_value(&tx, &SearchParams::new(vec![0.0, 0.0], 3), None).unwrap();
        assert_eq!(ids(&hits), vec![2, 4, 3]);
        let distances: Vec<f32> = hits.iter().map(|h| h.distance).collect();
        assert_eq!(distances, vec![1.0, 1.0, 4.0]);
        assert_eq!(hits[0].key, encode_row_key(INDEX, &[2]));
        assert_eq!(index.dump_info().ntotal, 5);
        assert_eq!(index.dump_info().hit, 1);
    }

    #[test]
    fn index_scan_uses_cap_not_k() {
        let engine = RedbEngine::in_memory().unwrap();
        let options = LinearScanOptions::new(layout(), 1).with_index_scan_cap(2);
        let index = LinearScanIndex::setup(
            INDEX,
            IndexConfig::new(2, Strategy::LinearScan).with_linear_scan(options),
        )
        .unwrap();
        load(
            &engine,
            &index,
            &[(1, [5.0, 0.0], origin()), (2, [1.0, 0.0], origin()), (3, [2.0, 0.0], origin())],
        );
        let tx = engine.begin_read().unwrap();
        let hits =
            index.index_scan_with_value(&tx, &SearchParams::new(vec![0.0, 0.0], 1), None).unwrap();
        assert_eq!(ids(&hits), vec![2, 3]);
    }

    #[test]
    fn hybrid_weight_flips_ranking() {
        let engine = RedbEngine::in_memory().unwrap();
        let index = index();
        // Row 1 is closer in vector space, row 2 is closer on the map.
        load(
            &engine,
            &index,
            &[(1, [1.0, 0.0], Coordinate::new(0.0, 1.0)), (2, [2.0, 0.0], Coordinate::new(0.0, 0.01))],
        );
        let tx = engine.begin_read().unwrap();
        let params = SearchParams::new(vec![0.0, 0.0], 2).with_coordinate(origin());

        let hits = index.knn_search_hybrid_with_value(&tx, &params, &Haversine, None).unwrap();
        assert_eq!(ids(&hits), vec![1, 2]);

        let params = params.with_weight(0.001);
        let hits = index.knn_search_hybrid_with_value(&tx, &params, &Haversine, None).unwrap();
        assert_eq!(ids(&hits), vec![2, 1]);
    }

    #[test]
    fn hybrid_reranks_the_vector_pool() {
        let engine = RedbEngine::in_memory().unwrap();
        let index = index();
        // Vector order is 1, 2, 3. Rows 2 and 3 sit on the query point, row 1
        // is about 1100 km away.
        load(
            &engine,
            &index,
            &[
                (1, [1.0, 0.0], Coordinate::new(0.0, 10.0)),
                (2, [2.0, 0.0], origin()),
                (3, [5.0, 0.0], origin()),
            ],
        );
        let tx = engine.begin_read().unwrap();
        let params =
            SearchParams::new(vec![0.0, 0.0], 1).with_weight(0.001).with_coordinate(origin());
        let hits = index.knn_search_hybrid_with_value(&tx, &params, &Haversine, None).unwrap();
        assert_eq!(ids(&hits), vec![1]);

        // Row 3 has a lower combined cost than row 1 but is outside the pool.
        let mut params = params;
        params.k = 2;
        let hits = index.knn_search_hybrid_with_value(&tx, &params, &Haversine, None).unwrap();
        assert_eq!(ids(&hits), vec![2, 1]);
        assert!((hits[0].distance - 4.0).abs() < 1e-6);
    }

    #[test]
    fn hybrid_needs_spatial_field() {
        let index = LinearScanIndex::setup(
            INDEX,
            IndexConfig::new(2, Strategy::LinearScan)
                .with_linear_scan(LinearScanOptions::new(layout(), 1)),
        )
        .unwrap();
        let engine = RedbEngine::in_memory().unwrap();
        let tx = engine.begin_read().unwrap();
        let params = SearchParams::new(vec![0.0, 0.0], 2).with_coordinate(origin());
        assert!(matches!(
            index.knn_search_hybrid_with_value(&tx, &params, &Haversine, None),
            Err(VectorError::InvalidConfig(_))
        ));
    }

    #[test]
    fn wrong_stored_dimension_is_corrupt() {
        let engine = RedbEngine::in_memory().unwrap();
        let index = index();
        let mut tx = engine.begin_write().unwrap();
        index.put_row(&mut tx, &pk(1), &row(1, &[1.0, 2.0, 3.0], origin())).unwrap();
        tx.commit().unwrap();
        let tx = engine.begin_read().unwrap();
        let result = index.knn_search_with_value(&tx, &SearchParams::new(vec![0.0, 0.0], 1), None);
        assert!(matches!(result, Err(VectorError::CorruptData(_))));
    }

    #[test]
    fn empty_values_are_skipped_and_deletes_apply() {
        let engine = RedbEngine::in_memory().unwrap();
        let index = index();
        load(&engine, &index, &[(1, [1.0, 0.0], origin()), (2, [2.0, 0.0], origin())]);
        let mut tx = engine.begin_write().unwrap();
        index.put_row(&mut tx, &pk(3), &[]).unwrap();
        assert!(index.delete_row(&mut tx, &pk(1)).unwrap());
        tx.commit().unwrap();

        let tx = engine.begin_read().unwrap();
        let hits =
            index.knn_search_with_value(&tx, &SearchParams::new(vec![0.0, 0.0], 5), None).unwrap();
        assert_eq!(ids(&hits), vec![2]);
    }

    #[test]
    fn scan_is_cancellable() {
        let engine = RedbEngine::in_memory().unwrap();
        let index = index();
        load(&engine, &index, &[(1, [1.0, 0.0], origin())]);
        let flag = CancellationFlag::new();
        flag.cancel();
        let tx = engine.begin_read().unwrap();
        let result =
            index.knn_search_with_value(&tx, &SearchParams::new(vec![0.0, 0.0], 1), Some(&flag));
        assert!(matches!(result, Err(VectorError::Cancelled)));
    }

    #[test]
    fn assignment_is_list_zero() {
        let a = index().assign_vector(&[1.0, 2.0]).unwrap();
        assert_eq!(a.list_id, ListId::new(0));
        assert_eq!(a.codes.len(), 8);
        assert!(index().assign_vector(&[1.0]).is_err());
    }
}
