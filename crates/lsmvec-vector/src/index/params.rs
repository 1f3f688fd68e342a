//! Per-query search parameters.

use crate::distance::Metric;
use crate::error::{Result, VectorError};
use crate::ops::Coordinate;

/// Parameters of one search call.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    /// Ranking metric.
    pub metric: Metric,
    /// Number of results.
    pub k: usize,
    /// Inverted lists probed by IVF searches.
    pub nprobe: usize,
    /// Spatial weight of hybrid searches.
    pub weight: f32,
    /// Query vector, possibly shorter than the index dimension.
    pub query: Vec<f32>,
    /// Query coordinate of hybrid searches.
    pub coordinate: Option<Coordinate>,
}

impl SearchParams {
    /// L2 search for the `k` nearest neighbours of `query`, probing one list.
    #[must_use]
    pub fn new(query: Vec<f32>, k: usize) -> Self {
        Self { metric: Metric::L2, k, nprobe: 1, weight: 0.0, query, coordinate: None }
    }

    /// Set the metric.
    #[must_use]
    pub const fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// Set the number of probed lists.
    #[must_use]
    pub const fn with_nprobe(mut self, nprobe: usize) -> Self {
        self.nprobe = nprobe;
        self
    }

    /// Set the spatial weight.
    #[must_use]
    pub const fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    /// Set the hybrid query coordinate.
    #[must_use]
    pub const fn with_coordinate(mut self, coordinate: Coordinate) -> Self {
        self.coordinate = Some(coordinate);
        self
    }

    /// Check what every search needs: a non-empty query.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::InvalidArgument`] for an empty query vector.
    pub fn validate_scan(&self) -> Result<()> {
        if self.query.is_empty() {
            return Err(VectorError::InvalidArgument("empty query vector".to_string()));
        }
        Ok(())
    }

    /// Check the parameters of a k-nearest-neighbour search.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::InvalidArgument`] for an empty query or a zero `k`.
    pub fn validate_knn(&self) -> Result<()> {
        self.validate_scan()?;
        if self.k == 0 {
            return Err(VectorError::InvalidArgument("limit must be positive".to_string()));
        }
        Ok(())
    }

    /// Check the parameters of a hybrid search.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::InvalidArgument`] if the knn checks fail, the
    /// coordinate is missing, or the weight is negative or not finite.
    pub fn validate_hybrid(&self) -> Result<()> {
        self.validate_knn()?;
        if self.coordinate.is_none() {
            return Err(VectorError::InvalidArgument(
                "hybrid search needs a query coordinate".to_string(),
            ));
        }
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(VectorError::InvalidArgument(format!(
                "hybrid weight must be a non-negative number, got {}",
                self.weight
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knn_needs_query_and_limit() {
        assert!(SearchParams::new(vec![1.0], 3).validate_knn().is_ok());
        assert!(SearchParams::new(vec![], 3).validate_knn().is_err());
        assert!(SearchParams::new(vec![1.0], 0).validate_knn().is_err());
        assert!(SearchParams::new(vec![1.0], 0).validate_scan().is_ok());
    }

    #[test]
    fn hybrid_needs_coordinate_and_weight() {
        let params = SearchParams::new(vec![1.0], 3).with_weight(0.5);
        assert!(matches!(params.validate_hybrid(), Err(VectorError::InvalidArgument(_))));
        let params = params.with_coordinate(Coordinate::new(0.0, 0.0));
        assert!(params.validate_hybrid().is_ok());
        assert!(params.clone().with_weight(-1.0).validate_hybrid().is_err());
        assert!(params.with_weight(f32::NAN).validate_hybrid().is_err());
    }
}
