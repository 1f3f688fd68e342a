//! Product quantization over externally trained codebooks.
//!
//! A vector of dimension `D` is split into `m` segments of `D / m` floats.
//! Each segment is replaced by the index of its nearest centroid among the
//! `2^nbits` centroids of that segment's codebook. Indices are packed
//! LSB-first, `nbits` each, into `ceil(m * nbits / 8)` bytes.

use crate::distance::{dot_product, l2_squared};
use crate::error::{Result, VectorError};

/// Largest supported bits per segment code.
pub const MAX_NBITS: u8 = 8;

/// Product quantizer with fixed, pre-trained codebooks.
#[derive(Debug, Clone)]
pub struct ProductQuantizer {
    m: usize,
    nbits: u8,
    /// Floats per segment.
    dsub: usize,
    /// Centroids per segment, `2^nbits`.
    ksub: usize,
    /// Layout `[m][ksub][dsub]`.
    codebooks: Vec<f32>,
}

impl ProductQuantizer {
    /// Build a quantizer from trained codebooks.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::InvalidConfig`] if `m` or `nbits` is zero,
    /// `nbits` exceeds [`MAX_NBITS`], `m` does not divide `dimension`, or the
    /// codebook length is not `m * 2^nbits * dimension / m`.
    pub fn new(dimension: usize, m: usize, nbits: u8, codebooks: Vec<f32>) -> Result<Self> {
        if m == 0 || nbits == 0 {
            return Err(VectorError::InvalidConfig(format!("invalid pq m {m}, pq nbits {nbits}")));
        }
        if nbits > MAX_NBITS {
            return Err(VectorError::InvalidConfig(format!(
                "pq nbits {nbits} exceeds {MAX_NBITS}"
            )));
        }
        if dimension % m != 0 {
            return Err(VectorError::InvalidConfig(format!(
                "pq m {m} does not divide dimension {dimension}"
            )));
        }
        if codebooks.is_empty() {
            return Err(VectorError::InvalidConfig("pq codes are required for IVFPQ".to_string()));
        }
        let dsub = dimension / m;
        let ksub = 1usize << nbits;
        let expected = m * ksub * dsub;
        if codebooks.len() != expected {
            return Err(VectorError::InvalidConfig(format!(
                "pq codes hold {} floats, expected m {m} x 2^{nbits} x {dsub} = {expected}",
                codebooks.len()
            )));
        }
        Ok(Self { m, nbits, dsub, ksub, codebooks })
    }

    /// Number of segments.
    #[must_use]
    pub const fn m(&self) -> usize {
        self.m
    }

    /// Bits per segment code.
    #[must_use]
    pub const fn nbits(&self) -> u8 {
        self.nbits
    }

    /// Bytes per encoded vector.
    #[must_use]
    pub const fn code_size(&self) -> usize {
        (self.m * self.nbits as usize).div_ceil(8)
    }

    fn centroid(&self, segment: usize, idx: usize) -> &[f32] {
        let start = (segment * self.ksub + idx) * self.dsub;
        &self.codebooks[start..start + self.dsub]
    }

    fn segment<'v>(&self, vector: &'v [f32], segment: usize) -> &'v [f32] {
        &vector[segment * self.dsub..(segment + 1) * self.dsub]
    }

    /// Encode a residual vector.
    ///
    /// `residual` must have `m * dsub` floats.
    #[must_use]
    pub fn encode(&self, residual: &[f32]) -> Vec<u8> {
        let indices: Vec<u8> = (0..self.m)
            .map(|s| {
                let sub = self.segment(residual, s);
                let mut best = 0usize;
                let mut best_dist = f32::INFINITY;
                for idx in 0..self.ksub {
                    let d = l2_squared(sub, self.centroid(s, idx));
                    if d < best_dist {
                        best_dist = d;
                        best = idx;
                    }
                }
                // ksub <= 256, so the index fits.
                u8::try_from(best).unwrap_or(u8::MAX)
            })
            .collect();
        pack_codes(&indices, self.nbits)
    }

    /// Unpack the per-segment centroid indices of a code.
    #[must_use]
    pub fn decode_indices(&self, code: &[u8]) -> Vec<usize> {
        (0..self.m).map(|s| unpack_code(code, s, self.nbits)).collect()
    }

    /// Reconstruct the approximate residual a code stands for.
    #[must_use]
    pub fn reconstruct(&self, code: &[u8]) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.m * self.dsub);
        for (s, idx) in self.decode_indices(code).into_iter().enumerate() {
            out.extend_from_slice(self.centroid(s, idx));
        }
        out
    }

    /// Squared L2 distances from each segment of `residual_query` to each centroid.
    #[must_use]
    pub fn l2_table(&self, residual_query: &[f32]) -> DistanceTable {
        self.table(residual_query, l2_squared)
    }

    /// Inner products of each segment of `query` with each centroid.
    #[must_use]
    pub fn ip_table(&self, query: &[f32]) -> DistanceTable {
        self.table(query, dot_product)
    }

    fn table(&self, query: &[f32], f: fn(&[f32], &[f32]) -> f32) -> DistanceTable {
        let mut values = Vec::with_capacity(self.m * self.ksub);
        for s in 0..self.m {
            let sub = self.segment(query, s);
            values.extend((0..self.ksub).map(|idx| f(sub, self.centroid(s, idx))));
        }
        DistanceTable { values, m: self.m, ksub: self.ksub, nbits: self.nbits }
    }
}

/// Per-segment lookup table for asymmetric distance computation.
#[derive(Debug, Clone)]
pub struct DistanceTable {
    /// Layout `[m][ksub]`.
    values: Vec<f32>,
    m: usize,
    ksub: usize,
    nbits: u8,
}

impl DistanceTable {
    /// Sum the table entries selected by a packed code.
    #[must_use]
    #[inline]
    pub fn lookup(&self, code: &[u8]) -> f32 {
        (0..self.m).map(|s| self.values[s * self.ksub + unpack_code(code, s, self.nbits)]).sum()
    }
}

/// Pack `nbits`-wide indices LSB-first.
#[must_use]
pub fn pack_codes(indices: &[u8], nbits: u8) -> Vec<u8> {
    let nbits = usize::from(nbits);
    let mut bytes = vec![0u8; (indices.len() * nbits).div_ceil(8)];
    let mut bit_pos = 0usize;
    for &code in indices {
        let byte_idx = bit_pos / 8;
        let bit_offset = bit_pos % 8;
        let wide = u16::from(code) << bit_offset;
        let [low, high] = wide.to_le_bytes();
        bytes[byte_idx] |= low;
        if bit_offset + nbits > 8 {
            if let Some(next) = bytes.get_mut(byte_idx + 1) {
                *next |= high;
            }
        }
        bit_pos += nbits;
    }
    bytes
}

/// Read the `segment`-th `nbits`-wide index from a packed code.
///
/// Bits past the end of `code` read as zero.
#[must_use]
#[inline]
pub fn unpack_code(code: &[u8], segment: usize, nbits: u8) -> usize {
    let nbits = usize::from(nbits);
    let bit_pos = segment * nbits;
    let byte_idx = bit_pos / 8;
    let low = code.get(byte_idx).copied().unwrap_or(0);
    let high = code.get(byte_idx + 1).copied().unwrap_or(0);
    let window = u16::from_le_bytes([low, high]) >> (bit_pos % 8);
    usize::from(window & ((1u16 << nbits) - 1))
}
