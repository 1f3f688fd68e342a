//! Inverted-file strategy.
//!
//! Vectors are routed to the list of their nearest trained centroid and
//! stored as flat `f32` codes or as product-quantized residuals. A search
//! probes the `nprobe` lists nearest the query and ranks every entry of those
//! lists.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use lsmvec_core::{IndexId, ListId};
use lsmvec_storage::Transaction;
use tracing::{debug, info, warn};

use super::config::{IndexConfig, Strategy};
use super::info::IndexInfo;
use super::params::SearchParams;
use super::{decode_flat_codes, encode_flat_codes};
use crate::cancel::CancellationFlag;
use crate::distance::{dot_product, Metric};
use crate::error::{Result, VectorError};
use crate::ops::{SearchHit, TopK};
use crate::quantization::{CoarseQuantizer, DistanceTable, ProductQuantizer, TrainedDataSource};
use crate::store::{Assignment, InvertedListStore, ListCursor, ListEntry, ListFilter};

/// Sentinel for a list whose size has not been observed.
const UNKNOWN_SIZE: i64 = -1;

/// An IVF index: Flat, IVFFlat or IVFPQ.
#[derive(Debug)]
pub struct IvfIndex {
    index_id: IndexId,
    config: IndexConfig,
    quantizer: CoarseQuantizer,
    pq: Option<ProductQuantizer>,
    store: InvertedListStore,
    /// Entry count per list, [`UNKNOWN_SIZE`] until a scan of the list completes.
    list_sizes: Vec<AtomicI64>,
    hit: AtomicU64,
}

impl IvfIndex {
    /// Build the index from its configuration and trained data.
    ///
    /// Flat indexes need no trained data: they use one all-zero centroid.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::InvalidConfig`] if the configuration is invalid
    /// or inconsistent with the trained data, or the error of `source`.
    pub fn setup<S>(index_id: IndexId, config: IndexConfig, source: &S) -> Result<Self>
    where
        S: TrainedDataSource + ?Sized,
    {
        config.validate()?;
        let dimension = config.dimension;
        let (quantizer, pq) = match config.strategy {
            Strategy::Flat => (CoarseQuantizer::flat(dimension), None),
            Strategy::IvfFlat | Strategy::IvfPq => {
                let trained_source = config.trained_source.as_ref().ok_or_else(|| {
                    VectorError::InvalidConfig("missing trained data source".to_string())
                })?;
                let data = source.load(trained_source)?;
                Self::load_trained(index_id, &config, data)
                    .inspect_err(|e| warn!(%index_id, error = %e, "invalid trained data"))?
            }
            Strategy::LinearScan => {
                return Err(VectorError::InvalidConfig(
                    "linear scan is not an IVF strategy".to_string(),
                ));
            }
        };

        let nlist = quantizer.nlist();
        let code_size = pq.as_ref().map_or(dimension * 4, ProductQuantizer::code_size);
        info!(
            %index_id,
            strategy = ?config.strategy,
            nlist,
            code_size,
            pq_m = pq.as_ref().map(ProductQuantizer::m),
            pq_nbits = pq.as_ref().map(ProductQuantizer::nbits),
            "vector index ready"
        );
        Ok(Self {
            index_id,
            config,
            quantizer,
            pq,
            store: InvertedListStore::new(index_id, nlist, code_size),
            list_sizes: (0..nlist).map(|_| AtomicI64::new(UNKNOWN_SIZE)).collect(),
            hit: AtomicU64::new(0),
        })
    }

    fn load_trained(
        index_id: IndexId,
        config: &IndexConfig,
        data: crate::quantization::TrainedIndexData,
    ) -> Result<(CoarseQuantizer, Option<ProductQuantizer>)> {
        if let Some(expected) = config.trained_list_count {
            if expected != data.nlist {
                return Err(VectorError::InvalidConfig(format!(
                    "index {index_id} expects {expected} lists, trained data has {}",
                    data.nlist
                )));
            }
        }
        let quantizer = CoarseQuantizer::new(config.dimension, data.nlist, data.quantizer_codes)?;
        let pq = if config.strategy == Strategy::IvfPq {
            Some(ProductQuantizer::new(config.dimension, data.pq_m, data.pq_nbits, data.pq_codes)?)
        } else {
            None
        };
        Ok((quantizer, pq))
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

    /// The list storage of this index.
    #[must_use]
    pub const fn store(&self) -> &InvertedListStore {
        &self.store
    }

    /// Number of inverted lists.
    #[must_use]
    pub fn nlist(&self) -> usize {
        self.list_sizes.len()
    }

    /// Route a vector and encode it for storage.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::InvalidArgument`] if the vector does not have
    /// exactly the index dimension.
    pub fn assign_vector(&self, vector: &[f32]) -> Result<Assignment> {
        if vector.len() != self.config.dimension {
            return Err(VectorError::InvalidArgument(format!(
                "vector has {} elements, index dimension is {}",
                vector.len(),
                self.config.dimension
            )));
        }
        let list_id = self.quantizer.assign(vector);
        let codes = match &self.pq {
            Some(pq) => pq.encode(&self.residual(vector, list_id)),
            None => encode_flat_codes(vector),
        };
        self.store.add_entry(list_id, &codes)
    }

    fn residual(&self, vector: &[f32], list_id: ListId) -> Vec<f32> {
        match self.quantizer.centroid(list_id) {
            Some(c) => vector.iter().zip(c).map(|(v, c)| v - c).collect(),
            None => vector.to_vec(),
        }
    }

    /// The `k` best entries of the `nprobe` lists nearest the query.
    ///
    /// Hits carry keys only.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::InvalidArgument`] for bad parameters, or the
    /// first error of any list scan; no partial results are returned.
    pub fn knn_search<T: Transaction>(
        &self,
        tx: &T,
        params: &SearchParams,
        filter: Option<&ListFilter>,
        cancel: Option<&CancellationFlag>,
    ) -> Result<Vec<SearchHit>> {
        params.validate_knn()?;
        let query = self.config.normalize_query(&params.query)?;
        self.hit.fetch_add(1, Ordering::Relaxed);
        let lists = self.quantizer.nearest_lists(&query, params.nprobe);
        debug!(
            index_id = %self.index_id,
            nprobe = lists.len(),
            k = params.k,
            metric = %params.metric,
            "ivf knn search"
        );

        let ip_table = match (&self.pq, params.metric) {
            (Some(pq), Metric::InnerProduct) => Some(pq.ip_table(&query)),
            _ => None,
        };
        let mut top = TopK::new(params.k, params.metric);
        for list_id in lists {
            let scorer = self.scorer(&query, list_id, params.metric, ip_table.as_ref());
            let mut cursor = self.store.iterate(tx, list_id, filter, cancel)?;
            while let Some(entry) = cursor.next_entry()? {
                top.push(scorer.score(&entry.codes), entry.key);
            }
            self.record_list_size(list_id, cursor.completed());
        }
        Ok(top
            .into_sorted()
            .into_iter()
            .map(|(distance, key)| SearchHit::new(key, distance))
            .collect())
    }

    fn scorer<'q>(
        &'q self,
        query: &'q [f32],
        list_id: ListId,
        metric: Metric,
        ip_table: Option<&'q DistanceTable>,
    ) -> Scorer<'q> {
        let Some(pq) = &self.pq else {
            return Scorer::Flat { query, metric };
        };
        let centroid = self.quantizer.centroid(list_id).unwrap_or(&[]);
        match (metric, ip_table) {
            (Metric::InnerProduct, Some(table)) => {
                Scorer::PqInnerProduct { base: dot_product(query, centroid), table }
            }
            _ => Scorer::PqL2(pq.l2_table(&self.residual(query, list_id))),
        }
    }

    /// A lazy cursor over the entries of the `nprobe` lists nearest the query.
    ///
    /// Entries are not ranked.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::InvalidArgument`] for bad parameters.
    pub fn index_scan<'t, T: Transaction + 't>(
        &'t self,
        tx: &'t T,
        params: &SearchParams,
        filter: Option<&'t ListFilter>,
        cancel: Option<&CancellationFlag>,
    ) -> Result<IvfScanCursor<'t, T>> {
        params.validate_scan()?;
        let query = self.config.normalize_query(&params.query)?;
        self.hit.fetch_add(1, Ordering::Relaxed);
        let lists = self.quantizer.nearest_lists(&query, params.nprobe);
        debug!(index_id = %self.index_id, nprobe = lists.len(), "ivf index scan");
        Ok(IvfScanCursor {
            index: self,
            tx,
            filter,
            cancel: cancel.cloned(),
            lists: lists.into_iter(),
            current: None,
        })
    }

    /// Count the entries of every list.
    ///
    /// Stops early, successfully, once more than `max_rows` entries were
    /// counted (`0` means no limit). A list's size is recorded only once it
    /// was counted in full.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::Cancelled`] if the flag is set, or the first
    /// scan error.
    pub fn analyze<T: Transaction>(
        &self,
        tx: &T,
        max_rows: u64,
        cancel: Option<&CancellationFlag>,
    ) -> Result<()> {
        let result = self.count_lists(tx, max_rows, cancel);
        match &result {
            Ok(rows) => info!(index_id = %self.index_id, rows, "analyze finished"),
            Err(VectorError::Cancelled) => info!(index_id = %self.index_id, "analyze cancelled"),
            Err(_) => {}
        }
        result.map(|_| ())
    }

    fn count_lists<T: Transaction>(
        &self,
        tx: &T,
        max_rows: u64,
        cancel: Option<&CancellationFlag>,
    ) -> Result<u64> {
        let mut rows = 0u64;
        for list in 0..self.nlist() as u64 {
            if let Some(cancel) = cancel {
                cancel.check()?;
            }
            let list_id = ListId::new(list);
            let mut cursor = self.store.iterate(tx, list_id, None, cancel)?;
            while cursor.next_entry()?.is_some() {
                rows += 1;
                if max_rows > 0 && rows > max_rows {
                    debug!(index_id = %self.index_id, max_rows, "analyze row budget exhausted");
                    return Ok(rows);
                }
            }
            self.record_list_size(list_id, cursor.completed());
        }
        Ok(rows)
    }

    fn record_list_size(&self, list_id: ListId, size: Option<usize>) {
        let (Some(size), Some(slot)) = (size, self.list_sizes.get(list_id.as_usize())) else {
            return;
        };
        slot.store(i64::try_from(size).unwrap_or(i64::MAX), Ordering::Relaxed);
    }

    /// Diagnostics snapshot.
    #[must_use]
    pub fn dump_info(&self) -> IndexInfo {
        let sizes = self
            .list_sizes
            .iter()
            .filter_map(|s| u64::try_from(s.load(Ordering::Relaxed)).ok())
            .collect();
        IndexInfo {
            hit: self.hit.load(Ordering::Relaxed),
            code_size: self.store.code_size(),
            nlist: self.nlist(),
            pq_m: self.pq.as_ref().map(ProductQuantizer::m),
            pq_nbits: self.pq.as_ref().map(ProductQuantizer::nbits),
            ..IndexInfo::default()
        }
        .with_list_sizes(sizes)
    }
}

/// Per-list distance computation.
enum Scorer<'q> {
    /// Raw vectors, scored exactly.
    Flat { query: &'q [f32], metric: Metric },
    /// Squared L2 from a table over `query - centroid`.
    PqL2(DistanceTable),
    /// `<query, centroid> + <query, residual>`.
    PqInnerProduct { base: f32, table: &'q DistanceTable },
}

impl Scorer<'_> {
    fn score(&self, codes: &[u8]) -> f32 {
        match self {
            Self::Flat { query, metric } => metric.score(query, &decode_flat_codes(codes)),
            Self::PqL2(table) => table.lookup(codes),
            Self::PqInnerProduct { base, table } => base + table.lookup(codes),
        }
    }
}

/// Lazy cursor over the probed lists of an [`IvfIndex::index_scan`].
///
/// Lists are opened one at a time; a list's size is recorded when its scan
/// completes.
pub struct IvfScanCursor<'t, T: Transaction + 't> {
    index: &'t IvfIndex,
    tx: &'t T,
    filter: Option<&'t ListFilter>,
    cancel: Option<CancellationFlag>,
    lists: std::vec::IntoIter<ListId>,
    current: Option<ListCursor<'t, T>>,
}

impl<'t, T: Transaction + 't> IvfScanCursor<'t, T> {
    /// The next entry of the probed lists.
    ///
    /// # Errors
    ///
    /// Returns the error of the underlying list scan.
    pub fn next_entry(&mut self) -> Result<Option<ListEntry>> {
        loop {
            if let Some(cursor) = self.current.as_mut() {
                if let Some(entry) = cursor.next_entry()? {
                    return Ok(Some(entry));
                }
                self.index.record_list_size(cursor.list_id(), cursor.completed());
                self.current = None;
            }
            let Some(list_id) = self.lists.next() else {
                return Ok(None);
            };
            let cursor =
                self.index.store.iterate(self.tx, list_id, self.filter, self.cancel.as_ref())?;
            self.current = Some(cursor);
        }
    }
}

impl<'t, T: Transaction + 't> Iterator for IvfScanCursor<'t, T> {
    type Item = Result<ListEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry().transpose()
    }
}
