//! Externally trained centroid and codebook data.
//!
//! Training happens outside this crate. An index only names where its
//! trained data lives ([`TrainedSource`]) and loads it through a
//! [`TrainedDataSource`] at setup.

use std::collections::HashMap;

use lsmvec_storage::{StorageEngine, Transaction};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VectorError};

/// Location of one trained data set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrainedSource {
    /// Table holding trained data sets.
    pub table: String,
    /// Identifier of the data set within the table.
    pub id: String,
}

impl TrainedSource {
    /// Create a new source reference.
    #[must_use]
    pub fn new(table: impl Into<String>, id: impl Into<String>) -> Self {
        Self { table: table.into(), id: id.into() }
    }
}

/// Trained centroids and optional PQ codebooks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainedIndexData {
    /// Number of inverted lists.
    pub nlist: usize,
    /// Concatenated centroids, `nlist * dimension` floats.
    pub quantizer_codes: Vec<f32>,
    /// PQ segment count; zero when PQ is not trained.
    #[serde(default)]
    pub pq_m: usize,
    /// PQ bits per segment code.
    #[serde(default)]
    pub pq_nbits: u8,
    /// PQ codebooks, layout `[pq_m][2^pq_nbits][dimension / pq_m]`.
    #[serde(default)]
    pub pq_codes: Vec<f32>,
}

impl TrainedIndexData {
    /// Encode for storage.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::InvalidArgument`] if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| VectorError::InvalidArgument(format!("encode trained data: {e}")))
    }

    /// Decode from storage.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::CorruptData`] if the bytes are malformed.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map(|(data, _)| data)
            .map_err(|e| VectorError::CorruptData(format!("decode trained data: {e}")))
    }
}

/// Loads trained data for index setup.
pub trait TrainedDataSource {
    /// Load the data set at `source`.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::InvalidConfig`] if the data set does not exist,
    /// or the underlying error if it cannot be read.
    fn load(&self, source: &TrainedSource) -> Result<TrainedIndexData>;
}

/// Trained data held in memory, keyed by source.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTrainedData {
    sets: HashMap<TrainedSource, TrainedIndexData>,
}

impl InMemoryTrainedData {
    /// Create an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a data set.
    pub fn insert(&mut self, source: TrainedSource, data: TrainedIndexData) {
        self.sets.insert(source, data);
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, source: TrainedSource, data: TrainedIndexData) -> Self {
        self.insert(source, data);
        self
    }
}

impl TrainedDataSource for InMemoryTrainedData {
    fn load(&self, source: &TrainedSource) -> Result<TrainedIndexData> {
        self.sets.get(source).cloned().ok_or_else(|| not_found(source))
    }
}

/// Trained data stored in the engine itself, one bincode value per id.
pub struct StoredTrainedData<'e, E: StorageEngine> {
    engine: &'e E,
}

impl<'e, E: StorageEngine> StoredTrainedData<'e, E> {
    /// Read trained data from `engine`.
    #[must_use]
    pub const fn new(engine: &'e E) -> Self {
        Self { engine }
    }
}

/// Write a data set under the caller's write transaction, for [`StoredTrainedData`] to load.
///
/// # Errors
///
/// Returns an error if encoding or the storage write fails.
pub fn store_trained_data<T: Transaction>(
    tx: &mut T,
    source: &TrainedSource,
    data: &TrainedIndexData,
) -> Result<()> {
    tx.put(&source.table, source.id.as_bytes(), &data.to_bytes()?)?;
    Ok(())
}

impl<E: StorageEngine> TrainedDataSource for StoredTrainedData<'_, E> {
    fn load(&self, source: &TrainedSource) -> Result<TrainedIndexData> {
        let tx = self.engine.begin_read()?;
        let bytes = tx.get(&source.table, source.id.as_bytes())?.ok_or_else(|| not_found(source))?;
        TrainedIndexData::from_bytes(&bytes)
    }
}

fn not_found(source: &TrainedSource) -> VectorError {
    VectorError::InvalidConfig(format!(
        "no trained index data '{}' in table '{}'",
        source.id, source.table
    ))
}
