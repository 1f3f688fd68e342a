//! Vector index configuration.

use std::borrow::Cow;

use lsmvec_core::TableLayout;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::distance::Metric;
use crate::error::{Result, VectorError};
use crate::quantization::TrainedSource;

/// Default number of rows a linear-scan `index_scan` prefetches.
pub const DEFAULT_INDEX_SCAN_CAP: usize = 100;

/// Default multiple of the limit a hybrid search ranks before truncation.
pub const DEFAULT_HYBRID_WIDEN_FACTOR: usize = 5;

/// Physical organization of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// One list holding raw vectors; needs no trained data.
    Flat,
    /// Trained centroids, raw vector codes.
    IvfFlat,
    /// Trained centroids, product-quantized residual codes.
    IvfPq,
    /// Rows stored directly under the index and scanned in full.
    LinearScan,
}

impl Strategy {
    /// Whether this strategy routes vectors through inverted lists.
    #[must_use]
    pub const fn is_ivf(self) -> bool {
        !matches!(self, Self::LinearScan)
    }
}

/// What to do with a query vector shorter than the index dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionPolicy {
    /// Pad with zeros to the index dimension.
    #[default]
    ZeroPad,
    /// Reject with [`VectorError::InvalidArgument`].
    Strict,
}

/// Row decoding settings of a linear-scan index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearScanOptions {
    /// Layout of the stored rows.
    pub table_layout: TableLayout,
    /// Field holding the vector blob.
    pub vector_field: usize,
    /// Field holding the point geometry, for hybrid searches.
    pub spatial_field: Option<usize>,
    /// Rows returned by `index_scan_with_value`.
    pub index_scan_cap: usize,
    /// Hybrid searches rank `limit * hybrid_widen_factor` rows before truncating.
    pub hybrid_widen_factor: usize,
}

impl Default for LinearScanOptions {
    fn default() -> Self {
        Self {
            table_layout: TableLayout::default(),
            vector_field: 0,
            spatial_field: None,
            index_scan_cap: DEFAULT_INDEX_SCAN_CAP,
            hybrid_widen_factor: DEFAULT_HYBRID_WIDEN_FACTOR,
        }
    }
}

impl LinearScanOptions {
    /// Options for rows laid out per `layout` with the vector in `vector_field`.
    #[must_use]
    pub fn new(table_layout: TableLayout, vector_field: usize) -> Self {
        Self { table_layout, vector_field, ..Self::default() }
    }

    /// Set the geometry field used by hybrid searches.
    #[must_use]
    pub const fn with_spatial_field(mut self, field: usize) -> Self {
        self.spatial_field = Some(field);
        self
    }

    /// Set the `index_scan_with_value` row cap.
    #[must_use]
    pub const fn with_index_scan_cap(mut self, cap: usize) -> Self {
        self.index_scan_cap = cap;
        self
    }

    /// Set the hybrid widening factor.
    #[must_use]
    pub const fn with_hybrid_widen_factor(mut self, factor: usize) -> Self {
        self.hybrid_widen_factor = factor;
        self
    }
}

/// Configuration of one vector index. Immutable once the index is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Vector dimension.
    pub dimension: usize,
    /// Metric used where a search does not name one.
    #[serde(default)]
    pub metric: Metric,
    /// Physical organization.
    pub strategy: Strategy,
    /// Expected list count of the trained data, checked at setup when set.
    #[serde(default)]
    pub trained_list_count: Option<usize>,
    /// Where the trained centroids live; required by `ivf_flat` and `ivf_pq`.
    #[serde(default)]
    pub trained_source: Option<TrainedSource>,
    /// Handling of short query vectors.
    #[serde(default)]
    pub dimension_policy: DimensionPolicy,
    /// Row decoding for `linear_scan`.
    #[serde(default)]
    pub linear_scan: LinearScanOptions,
}

impl IndexConfig {
    /// Create a configuration with the L2 metric and zero-padding.
    #[must_use]
    pub fn new(dimension: usize, strategy: Strategy) -> Self {
        Self {
            dimension,
            metric: Metric::L2,
            strategy,
            trained_list_count: None,
            trained_source: None,
            dimension_policy: DimensionPolicy::ZeroPad,
            linear_scan: LinearScanOptions::default(),
        }
    }

    /// Set the default metric.
    #[must_use]
    pub const fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// Set the trained data source.
    #[must_use]
    pub fn with_trained_source(mut self, source: TrainedSource) -> Self {
        self.trained_source = Some(source);
        self
    }

    /// Set the expected trained list count.
    #[must_use]
    pub const fn with_trained_list_count(mut self, nlist: usize) -> Self {
        self.trained_list_count = Some(nlist);
        self
    }

    /// Set the short-query policy.
    #[must_use]
    pub const fn with_dimension_policy(mut self, policy: DimensionPolicy) -> Self {
        self.dimension_policy = policy;
        self
    }

    /// Set the linear-scan row options.
    #[must_use]
    pub fn with_linear_scan(mut self, options: LinearScanOptions) -> Self {
        self.linear_scan = options;
        self
    }

    /// Check the configuration on its own, before any trained data is loaded.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::InvalidConfig`] describing the first problem.
    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(VectorError::InvalidConfig("dimension must be positive".to_string()));
        }
        match self.strategy {
            Strategy::IvfFlat | Strategy::IvfPq if self.trained_source.is_none() => {
                Err(VectorError::InvalidConfig(format!(
                    "{:?} index needs a trained data source",
                    self.strategy
                )))
            }
            Strategy::LinearScan => {
                let options = &self.linear_scan;
                options.table_layout.validate()?;
                let fields = options.table_layout.field_count();
                if options.vector_field >= fields {
                    return Err(VectorError::InvalidConfig(format!(
                        "vector field {} out of range for {fields} fields",
                        options.vector_field
                    )));
                }
                if let Some(spatial) = options.spatial_field.filter(|&f| f >= fields) {
                    return Err(VectorError::InvalidConfig(format!(
                        "spatial field {spatial} out of range for {fields} fields"
                    )));
                }
                if options.hybrid_widen_factor == 0 {
                    return Err(VectorError::InvalidConfig(
                        "hybrid widen factor must be positive".to_string(),
                    ));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Bring a query vector to the index dimension.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::InvalidArgument`] for an empty or over-long
    /// query, or a short one under [`DimensionPolicy::Strict`].
    pub fn normalize_query<'q>(&self, query: &'q [f32]) -> Result<Cow<'q, [f32]>> {
        let len = query.len();
        if len == 0 {
            return Err(VectorError::InvalidArgument("empty query vector".to_string()));
        }
        if len > self.dimension {
            info!(len, dimension = self.dimension, "query vector longer than index dimension");
            return Err(VectorError::InvalidArgument(format!(
                "query vector has {len} elements, index dimension is {}",
                self.dimension
            )));
        }
        if len == self.dimension {
            return Ok(Cow::Borrowed(query));
        }
        match self.dimension_policy {
            DimensionPolicy::ZeroPad => {
                let mut padded = query.to_vec();
                padded.resize(self.dimension, 0.0);
                Ok(Cow::Owned(padded))
            }
            DimensionPolicy::Strict => Err(VectorError::InvalidArgument(format!(
                "query vector has {len} elements, index dimension is {}",
                self.dimension
            ))),
        }
    }
}
