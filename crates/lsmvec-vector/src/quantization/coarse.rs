//! Coarse quantizer routing vectors to inverted lists.

use lsmvec_core::ListId;

use crate::distance::l2_squared;
use crate::error::{Result, VectorError};

/// Trained centroids, one per inverted list.
///
/// Routing always uses squared L2 distance, whatever metric a search ranks by.
#[derive(Debug, Clone)]
pub struct CoarseQuantizer {
    dimension: usize,
    /// Row-major `[nlist][dimension]`.
    centroids: Vec<f32>,
}

impl CoarseQuantizer {
    /// Build a quantizer from `nlist` concatenated centroids.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::InvalidConfig`] if `nlist` or `dimension` is
    /// zero, or `centroids.len() != nlist * dimension`.
    pub fn new(dimension: usize, nlist: usize, centroids: Vec<f32>) -> Result<Self> {
        if dimension == 0 {
            return Err(VectorError::InvalidConfig("dimension must be positive".to_string()));
        }
        if nlist == 0 {
            return Err(VectorError::InvalidConfig(format!("invalid nlist {nlist}")));
        }
        let expected = nlist.checked_mul(dimension).ok_or_else(|| {
            VectorError::InvalidConfig(format!("nlist {nlist} x dimension {dimension} overflows"))
        })?;
        if centroids.len() != expected {
            return Err(VectorError::InvalidConfig(format!(
                "quantizer codes hold {} floats, expected nlist {nlist} x dimension {dimension} \
                 = {expected}",
                centroids.len()
            )));
        }
        Ok(Self { dimension, centroids })
    }

    /// The single all-zero centroid of a flat index.
    #[must_use]
    pub fn flat(dimension: usize) -> Self {
        Self { dimension, centroids: vec![0.0; dimension] }
    }

    /// Number of lists.
    #[must_use]
    pub fn nlist(&self) -> usize {
        self.centroids.len() / self.dimension.max(1)
    }

    /// Vector dimension.
    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    /// The centroid of `list`, if it exists.
    #[must_use]
    pub fn centroid(&self, list: ListId) -> Option<&[f32]> {
        let start = list.as_usize().checked_mul(self.dimension)?;
        self.centroids.get(start..start + self.dimension)
    }

    fn iter_centroids(&self) -> impl Iterator<Item = (ListId, &[f32])> {
        self.centroids
            .chunks_exact(self.dimension.max(1))
            .enumerate()
            .map(|(i, c)| (ListId::new(i as u64), c))
    }

    /// Route a vector to its nearest list. Ties go to the lower list id.
    #[must_use]
    pub fn assign(&self, vector: &[f32]) -> ListId {
        if self.nlist() == 1 {
            return ListId::new(0);
        }
        let mut best = ListId::new(0);
        let mut best_dist = f32::INFINITY;
        for (id, centroid) in self.iter_centroids() {
            let d = l2_squared(vector, centroid);
            if d < best_dist {
                best_dist = d;
                best = id;
            }
        }
        best
    }

    /// The `nprobe` lists nearest to `query`, nearest first.
    ///
    /// `nprobe` is clamped to `[1, nlist]`.
    #[must_use]
    pub fn nearest_lists(&self, query: &[f32], nprobe: usize) -> Vec<ListId> {
        let nprobe = nprobe.clamp(1, self.nlist().max(1));
        let mut scored: Vec<(f32, ListId)> =
            self.iter_centroids().map(|(id, c)| (l2_squared(query, c), id)).collect();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        scored.into_iter().take(nprobe).map(|(_, id)| id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quantizer() -> CoarseQuantizer {
        // Centroids at x = 0, 10, 20 on a 2-d plane.
        CoarseQuantizer::new(2, 3, vec![0.0, 0.0, 10.0, 0.0, 20.0, 0.0]).unwrap()
    }

    #[test]
    fn assigns_nearest_centroid() {
        let q = quantizer();
        assert_eq!(q.assign(&[1.0, 1.0]), ListId::new(0));
        assert_eq!(q.assign(&[11.0, -1.0]), ListId::new(1));
        assert_eq!(q.assign(&[100.0, 0.0]), ListId::new(2));
    }

    #[test]
    fn nearest_lists_in_distance_order() {
        let q = quantizer();
        assert_eq!(q.nearest_lists(&[19.0, 0.0], 2), vec![ListId::new(2), ListId::new(1)]);
        assert_eq!(q.nearest_lists(&[0.0, 0.0], 0).len(), 1);
        assert_eq!(q.nearest_lists(&[0.0, 0.0], 99).len(), 3);
    }

    #[test]
    fn flat_routes_everything_to_list_zero() {
        let q = CoarseQuantizer::flat(4);
        assert_eq!(q.nlist(), 1);
        assert_eq!(q.assign(&[5.0, 5.0, 5.0, 5.0]), ListId::new(0));
        assert_eq!(q.centroid(ListId::new(0)), Some(&[0.0; 4][..]));
        assert_eq!(q.centroid(ListId::new(1)), None);
    }

    #[test]
    fn rejects_inconsistent_training() {
        assert!(matches!(CoarseQuantizer::new(2, 0, vec![]), Err(VectorError::InvalidConfig(_))));
        assert!(matches!(
            CoarseQuantizer::new(2, 3, vec![0.0; 5]),
            Err(VectorError::InvalidConfig(_))
        ));
        assert!(CoarseQuantizer::new(0, 1, vec![]).is_err());
    }
}
