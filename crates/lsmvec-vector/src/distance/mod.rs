//! Distance functions for vector similarity.
//!
//! By default the kernels use the `wide` crate for portable SIMD, processing
//! 8 floats at a time with a scalar tail. The `scalar` feature swaps in plain
//! loops.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::VectorError;

#[cfg(not(feature = "scalar"))]
mod simd;

#[cfg(feature = "scalar")]
mod scalar;

#[cfg(not(feature = "scalar"))]
pub use simd::{dot_product, l2_squared};

#[cfg(feature = "scalar")]
pub use scalar::{dot_product, l2_squared};

/// Ranking metric of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Squared Euclidean distance; smaller is better.
    #[default]
    L2,
    /// Inner product; larger is better.
    InnerProduct,
}

impl Metric {
    /// Score `b` against query `a` under this metric.
    ///
    /// Returns the squared L2 distance or the raw inner product.
    #[inline]
    #[must_use]
    pub fn score(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::L2 => l2_squared(a, b),
            Self::InnerProduct => dot_product(a, b),
        }
    }

    /// Whether score `a` ranks strictly ahead of score `b`.
    #[inline]
    #[must_use]
    pub fn is_better(self, a: f32, b: f32) -> bool {
        match self {
            Self::L2 => a < b,
            Self::InnerProduct => a > b,
        }
    }

    /// Convert a score to a cost where smaller is always better.
    #[inline]
    #[must_use]
    pub fn as_cost(self, score: f32) -> f32 {
        match self {
            Self::L2 => score,
            Self::InnerProduct => -score,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::L2 => f.write_str("l2"),
            Self::InnerProduct => f.write_str("ip"),
        }
    }
}

impl FromStr for Metric {
    type Err = VectorError;

    /// Parse a metric or ORDER BY distance function name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "l2" | "fb_vector_l2" | "euclidean" => Ok(Self::L2),
            "ip" | "fb_vector_ip" | "inner_product" => Ok(Self::InnerProduct),
            other => Err(VectorError::InvalidArgument(format!("unsupported metric '{other}'"))),
        }
    }
}
