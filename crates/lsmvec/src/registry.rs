//! Named vector indexes created from configuration.

use std::collections::BTreeMap;

use lsmvec_core::IndexId;
use lsmvec_vector::quantization::TrainedDataSource;
use lsmvec_vector::{create_vector_index, IndexConfig, IndexInfo, VectorIndex};
use tracing::info;

use crate::config::{Config, IndexDefinition};
use crate::error::{Error, Result};

/// The set of indexes a process serves, keyed by name.
#[derive(Debug, Default)]
pub struct IndexRegistry {
    indexes: BTreeMap<String, VectorIndex>,
}

impl IndexRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and set up every index in `config`.
    ///
    /// # Errors
    ///
    /// Fails on the first index whose configuration or trained data is
    /// invalid.
    pub fn from_config<S>(config: &Config, source: &S) -> Result<Self>
    where
        S: TrainedDataSource + ?Sized,
    {
        config.validate()?;
        let mut registry = Self::new();
        for IndexDefinition { name, index_id, config } in &config.indexes {
            registry.create(name.clone(), *index_id, config.clone(), source)?;
        }
        Ok(registry)
    }

    /// Create, set up and register one index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the name or id is already taken, or the
    /// setup error of the index.
    pub fn create<S>(
        &mut self,
        name: impl Into<String>,
        index_id: IndexId,
        config: IndexConfig,
        source: &S,
    ) -> Result<&VectorIndex>
    where
        S: TrainedDataSource + ?Sized,
    {
        let name = name.into();
        if self.indexes.contains_key(&name) {
            return Err(Error::Config(format!("duplicate index name '{name}'")));
        }
        if self.indexes.values().any(|index| index.index_id() == index_id) {
            return Err(Error::Config(format!("duplicate index id {index_id}")));
        }
        let index = create_vector_index(index_id, config, source)?;
        info!(name = %name, index_id = %index_id, "registered vector index");
        Ok(self.indexes.entry(name).or_insert(index))
    }

    /// Look up an index by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&VectorIndex> {
        self.indexes.get(name)
    }

    /// Look up an index by name, failing if it is not registered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexNotFound`].
    pub fn require(&self, name: &str) -> Result<&VectorIndex> {
        self.get(name).ok_or_else(|| Error::IndexNotFound(name.to_string()))
    }

    /// Registered indexes in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &VectorIndex)> {
        self.indexes.iter().map(|(name, index)| (name.as_str(), index))
    }

    /// Number of registered indexes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    /// Whether no index is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    /// Diagnostics of every index, keyed by name.
    #[must_use]
    pub fn dump_info(&self) -> BTreeMap<String, IndexInfo> {
        self.indexes.iter().map(|(name, index)| (name.clone(), index.dump_info())).collect()
    }
}
