//! Bounded top-k selection.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::distance::Metric;

/// A heap entry ordered so that the worst candidate is the maximum.
#[derive(Debug)]
struct Candidate<T> {
    /// Lower is better, whatever the metric.
    cost: f32,
    score: f32,
    /// Insertion order; later insertions lose ties.
    seq: u64,
    item: T,
}

impl<T> PartialEq for Candidate<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for Candidate<T> {}

impl<T> PartialOrd for Candidate<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Candidate<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cost.total_cmp(&other.cost).then(self.seq.cmp(&other.seq))
    }
}

/// Keeps the `k` best-ranked items seen so far.
///
/// Ranking follows the metric: smaller L2 distances and larger inner
/// products are better. Equal scores rank by insertion order.
#[derive(Debug)]
pub struct TopK<T> {
    k: usize,
    metric: Metric,
    seq: u64,
    heap: BinaryHeap<Candidate<T>>,
}

impl<T> TopK<T> {
    /// Create an empty selection of at most `k` items.
    #[must_use]
    pub fn new(k: usize, metric: Metric) -> Self {
        Self { k, metric, seq: 0, heap: BinaryHeap::with_capacity(k.min(4096) + 1) }
    }

    /// Number of items held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether nothing is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// The score an item must beat to enter a full selection.
    #[must_use]
    pub fn threshold(&self) -> Option<f32> {
        if self.heap.len() < self.k {
            return None;
        }
        self.heap.peek().map(|c| c.score)
    }

    /// Offer an item. Returns whether it was kept.
    ///
    /// NaN scores are never kept.
    pub fn push(&mut self, score: f32, item: T) -> bool {
        if self.k == 0 || score.is_nan() {
            return false;
        }
        let cost = self.metric.as_cost(score);
        let candidate = Candidate { cost, score, seq: self.seq, item };
        self.seq += 1;

        if self.heap.len() < self.k {
            self.heap.push(candidate);
            return true;
        }
        match self.heap.peek() {
            Some(worst) if cost.total_cmp(&worst.cost).is_lt() => {
                self.heap.pop();
                self.heap.push(candidate);
                true
            }
            _ => false,
        }
    }

    /// The kept items with their scores, best first.
    #[must_use]
    pub fn into_sorted(self) -> Vec<(f32, T)> {
        self.heap.into_sorted_vec().into_iter().map(|c| (c.score, c.item)).collect()
    }
}
