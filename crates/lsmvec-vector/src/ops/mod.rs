//! Search operations shared by the index strategies.
//!
//! - [`topk`] - Bounded best-k selection with metric polarity
//! - [`hybrid`] - Vector + spatial ranking

pub mod hybrid;
pub mod topk;

pub use hybrid::{Coordinate, Haversine, HybridCombiner, SpatialDistance};
pub use topk::TopK;

/// One ranked search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// The full stored key of the entry.
    pub key: Vec<u8>,
    /// Ranking score: the metric's score, or the combined cost for hybrid searches.
    pub distance: f32,
    /// The stored row value, for strategies that return one.
    pub value: Option<Vec<u8>>,
}

impl SearchHit {
    /// A hit without a row value.
    #[must_use]
    pub const fn new(key: Vec<u8>, distance: f32) -> Self {
        Self { key, distance, value: None }
    }

    /// Attach the stored row value.
    #[must_use]
    pub fn with_value(mut self, value: Vec<u8>) -> Self {
        self.value = Some(value);
        self
    }
}
