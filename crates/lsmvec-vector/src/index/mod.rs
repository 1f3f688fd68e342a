//! Vector indexes for similarity search.
//!
//! # Overview
//!
//! Two strategies share one contract, the [`VectorIndex`] enum:
//!
//! - **IVF** ([`IvfIndex`]): vectors are routed to the inverted list of their
//!   nearest trained centroid. A search probes the `nprobe` nearest lists.
//!   Codes are raw `f32` (Flat, IVFFlat) or product-quantized residuals
//!   (IVFPQ). The Flat strategy is IVF with one all-zero centroid.
//! - **Linear scan** ([`LinearScanIndex`]): rows are stored directly under the
//!   index and every search decodes the vector column of every row. Supports
//!   hybrid vector + spatial ranking.
//!
//! # Capability probing
//!
//! Not every strategy implements every method. A missing method returns
//! [`VectorError::Unsupported`]; callers probe with
//! [`VectorError::is_unsupported`] and fall back to an alternate method:
//!
//! | method | IVF | linear scan |
//! |---|---|---|
//! | `knn_search` | yes | unsupported |
//! | `knn_search_with_value` | unsupported | yes |
//! | `knn_search_hybrid_with_value` | unsupported | yes |
//! | `index_scan` | yes | unsupported |
//! | `index_scan_with_value` | unsupported | yes |
//!
//! # Example
//!
//! ```ignore
//! use lsmvec_core::IndexId;
//! use lsmvec_storage::backends::RedbEngine;
//! use lsmvec_vector::index::{create_vector_index, IndexConfig, SearchParams, Strategy};
//! use lsmvec_vector::quantization::InMemoryTrainedData;
//!
//! let engine = RedbEngine::in_memory()?;
//! let config = IndexConfig::new(3, Strategy::Flat);
//! let index = create_vector_index(IndexId::new(1), config, &InMemoryTrainedData::new())?;
//!
//! let tx = engine.begin_read()?;
//! let hits = index.knn_search(&tx, &SearchParams::new(vec![0.1, 0.2, 0.3], 10), None, None)?;
//! ```

pub mod config;
mod info;
mod ivf;
mod linear;
mod params;

pub use config::{DimensionPolicy, IndexConfig, LinearScanOptions, Strategy};
pub use info::IndexInfo;
pub use ivf::{IvfIndex, IvfScanCursor};
pub use linear::LinearScanIndex;
pub use params::SearchParams;

use lsmvec_core::IndexId;
use lsmvec_storage::Transaction;

use crate::cancel::CancellationFlag;
use crate::error::{Result, VectorError};
use crate::ops::{SearchHit, SpatialDistance};
use crate::quantization::TrainedDataSource;
use crate::store::{Assignment, ListFilter};

/// A vector index of either strategy.
#[derive(Debug)]
pub enum VectorIndex {
    /// Inverted-file index.
    Ivf(IvfIndex),
    /// Brute-force index.
    LinearScan(LinearScanIndex),
}

/// Create and set up the index described by `config`.
///
/// Flat, IVFFlat and IVFPQ configurations build an [`IvfIndex`], loading
/// trained data from `source` where needed; linear-scan configurations build
/// a [`LinearScanIndex`].
///
/// # Errors
///
/// Returns [`VectorError::InvalidConfig`] if the configuration or its trained
/// data is invalid.
pub fn create_vector_index<S>(
    index_id: IndexId,
    config: IndexConfig,
    source: &S,
) -> Result<VectorIndex>
where
    S: TrainedDataSource + ?Sized,
{
    match config.strategy {
        Strategy::LinearScan => {
            LinearScanIndex::setup(index_id, config).map(VectorIndex::LinearScan)
        }
        Strategy::Flat | Strategy::IvfFlat | Strategy::IvfPq => {
            IvfIndex::setup(index_id, config, source).map(VectorIndex::Ivf)
        }
    }
}

impl VectorIndex {
    /// The index id.
    #[must_use]
    pub const fn index_id(&self) -> IndexId {
        match self {
            Self::Ivf(index) => index.index_id(),
            Self::LinearScan(index) => index.index_id(),
        }
    }

    /// The index configuration.
    #[must_use]
    pub const fn config(&self) -> &IndexConfig {
        match self {
            Self::Ivf(index) => index.config(),
            Self::LinearScan(index) => index.config(),
        }
    }

    /// Route and encode a vector for the write path.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::InvalidArgument`] on a dimension mismatch.
    pub fn assign_vector(&self, vector: &[f32]) -> Result<Assignment> {
        match self {
            Self::Ivf(index) => index.assign_vector(vector),
            Self::LinearScan(index) => index.assign_vector(vector),
        }
    }

    /// Ranked keys of the `k` nearest entries.
    ///
    /// # Errors
    ///
    /// [`VectorError::Unsupported`] for linear scan; otherwise see
    /// [`IvfIndex::knn_search`].
    pub fn knn_search<T: Transaction>(
        &self,
        tx: &T,
        params: &SearchParams,
        filter: Option<&ListFilter>,
        cancel: Option<&CancellationFlag>,
    ) -> Result<Vec<SearchHit>> {
        match self {
            Self::Ivf(index) => index.knn_search(tx, params, filter, cancel),
            Self::LinearScan(_) => Err(VectorError::Unsupported("knn_search")),
        }
    }

    /// Ranked keys and values of the `k` nearest rows.
    ///
    /// # Errors
    ///
    /// [`VectorError::Unsupported`] for IVF; otherwise see
    /// [`LinearScanIndex::knn_search_with_value`].
    pub fn knn_search_with_value<T: Transaction>(
        &self,
        tx: &T,
        params: &SearchParams,
        cancel: Option<&CancellationFlag>,
    ) -> Result<Vec<SearchHit>> {
        match self {
            Self::Ivf(_) => Err(VectorError::Unsupported("knn_search_with_value")),
            Self::LinearScan(index) => index.knn_search_with_value(tx, params, cancel),
        }
    }

    /// The `k` vector neighbours reranked by combined vector and spatial cost.
    ///
    /// # Errors
    ///
    /// [`VectorError::Unsupported`] for IVF; otherwise see
    /// [`LinearScanIndex::knn_search_hybrid_with_value`].
    pub fn knn_search_hybrid_with_value<T: Transaction>(
        &self,
        tx: &T,
        params: &SearchParams,
        spatial: &dyn SpatialDistance,
        cancel: Option<&CancellationFlag>,
    ) -> Result<Vec<SearchHit>> {
        match self {
            Self::Ivf(_) => Err(VectorError::Unsupported("knn_search_hybrid_with_value")),
            Self::LinearScan(index) => {
                index.knn_search_hybrid_with_value(tx, params, spatial, cancel)
            }
        }
    }

    /// A lazy, unranked cursor over the probed lists.
    ///
    /// # Errors
    ///
    /// [`VectorError::Unsupported`] for linear scan; otherwise see
    /// [`IvfIndex::index_scan`].
    pub fn index_scan<'t, T: Transaction + 't>(
        &'t self,
        tx: &'t T,
        params: &SearchParams,
        filter: Option<&'t ListFilter>,
        cancel: Option<&CancellationFlag>,
    ) -> Result<IvfScanCursor<'t, T>> {
        match self {
            Self::Ivf(index) => index.index_scan(tx, params, filter, cancel),
            Self::LinearScan(_) => Err(VectorError::Unsupported("index_scan")),
        }
    }

    /// A bounded, materialized prefetch of the rows nearest the query.
    ///
    /// # Errors
    ///
    /// [`VectorError::Unsupported`] for IVF; otherwise see
    /// [`LinearScanIndex::index_scan_with_value`].
    pub fn index_scan_with_value<T: Transaction>(
        &self,
        tx: &T,
        params: &SearchParams,
        cancel: Option<&CancellationFlag>,
    ) -> Result<Vec<SearchHit>> {
        match self {
            Self::Ivf(_) => Err(VectorError::Unsupported("index_scan_with_value")),
            Self::LinearScan(index) => index.index_scan_with_value(tx, params, cancel),
        }
    }

    /// Gather list statistics.
    ///
    /// # Errors
    ///
    /// See [`IvfIndex::analyze`]; linear scan never fails.
    pub fn analyze<T: Transaction>(
        &self,
        tx: &T,
        max_rows: u64,
        cancel: Option<&CancellationFlag>,
    ) -> Result<()> {
        match self {
            Self::Ivf(index) => index.analyze(tx, max_rows, cancel),
            Self::LinearScan(index) => index.analyze(),
        }
    }

    /// Diagnostics snapshot.
    #[must_use]
    pub fn dump_info(&self) -> IndexInfo {
        match self {
            Self::Ivf(index) => index.dump_info(),
            Self::LinearScan(index) => index.dump_info(),
        }
    }
}

/// Encode a vector as little-endian `f32` codes.
pub(crate) fn encode_flat_codes(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Decode little-endian `f32` codes. Trailing bytes are ignored.
pub(crate) fn decode_flat_codes(codes: &[u8]) -> Vec<f32> {
    codes.chunks_exact(4).map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantization::InMemoryTrainedData;

    #[test]
    fn flat_codes_round_trip() {
        let v = [1.5f32, -0.25, 3.0];
        let codes = encode_flat_codes(&v);
        assert_eq!(codes.len(), 12);
        assert_eq!(decode_flat_codes(&codes), v.to_vec());
    }

    #[test]
    fn strategies_map_to_variants() {
        let source = InMemoryTrainedData::new();
        let flat = create_vector_index(IndexId::new(1), IndexConfig::new(2, Strategy::Flat), &source)
            .unwrap();
        assert!(matches!(flat, VectorIndex::Ivf(_)));

        let linear =
            create_vector_index(IndexId::new(2), IndexConfig::new(2, Strategy::LinearScan), &source);
        // The default layout has no vector field.
        assert!(matches!(linear, Err(VectorError::InvalidConfig(_))));

        let ivf = create_vector_index(IndexId::new(3), IndexConfig::new(2, Strategy::IvfFlat), &source);
        assert!(matches!(ivf, Err(VectorError::InvalidConfig(_))));
    }

    #[test]
    fn unsupported_methods_are_signalled() {
        use lsmvec_storage::backends::RedbEngine;
        use lsmvec_storage::StorageEngine;

        let engine = RedbEngine::in_memory().unwrap();
        let tx = engine.begin_read().unwrap();
        let index = create_vector_index(
            IndexId::new(1),
            IndexConfig::new(2, Strategy::Flat),
            &InMemoryTrainedData::new(),
        )
        .unwrap();
        let params = SearchParams::new(vec![0.0, 0.0], 1);
        assert!(index.knn_search_with_value(&tx, &params, None).unwrap_err().is_unsupported());
        assert!(index.index_scan_with_value(&tx, &params, None).unwrap_err().is_unsupported());
        assert!(index
            .knn_search_hybrid_with_value(&tx, &params, &crate::ops::Haversine, None)
            .unwrap_err()
            .is_unsupported());
        assert!(index.knn_search(&tx, &params, None, None).unwrap().is_empty());
    }
}
