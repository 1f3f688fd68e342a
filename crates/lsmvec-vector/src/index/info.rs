//! Index diagnostics.

use serde::Serialize;

/// Snapshot returned by `dump_info`.
///
/// Purely observational. List sizes aggregate only lists whose size is known,
/// i.e. lists fully scanned by a search or by `analyze`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexInfo {
    /// Approximate number of stored vectors.
    pub ntotal: u64,
    /// Number of searches served.
    pub hit: u64,
    /// Bytes per stored code.
    pub code_size: usize,
    /// Number of inverted lists.
    pub nlist: usize,
    /// PQ segment count, for product-quantized indexes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pq_m: Option<usize>,
    /// PQ bits per segment, for product-quantized indexes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pq_nbits: Option<u8>,
    /// Smallest known list size.
    pub min_list_size: u64,
    /// Largest known list size.
    pub max_list_size: u64,
    /// Mean known list size, rounded down.
    pub avg_list_size: u64,
    /// Median known list size.
    pub median_list_size: u64,
}

impl IndexInfo {
    /// Fill `ntotal` and the list size aggregates from known list sizes.
    #[must_use]
    pub fn with_list_sizes(mut self, mut sizes: Vec<u64>) -> Self {
        self.ntotal = sizes.iter().sum();
        if sizes.is_empty() {
            return self;
        }
        sizes.sort_unstable();
        self.min_list_size = sizes[0];
        self.max_list_size = sizes[sizes.len() - 1];
        self.avg_list_size = self.ntotal / sizes.len() as u64;
        self.median_list_size = sizes[sizes.len() / 2];
        self
    }
}
