//! Engine configuration.
//!
//! A [`Config`] is read from a JSON document naming the storage file, an
//! optional directory of trained data, and the indexes to set up:
//!
//! ```json
//! {
//!   "storage_path": "data.redb",
//!   "trained_data_dir": "trained",
//!   "indexes": [
//!     {
//!       "name": "docs",
//!       "index_id": 7,
//!       "config": { "dimension": 3, "strategy": "flat" }
//!     }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use lsmvec_core::IndexId;
use lsmvec_vector::IndexConfig;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Path of the redb storage file.
    pub storage_path: PathBuf,
    /// Directory of `<table>/<id>.json` trained data sets. When absent,
    /// trained data is read from the storage engine itself.
    #[serde(default)]
    pub trained_data_dir: Option<PathBuf>,
    /// Indexes to create at startup.
    #[serde(default)]
    pub indexes: Vec<IndexDefinition>,
}

/// One configured index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDefinition {
    /// Name used to look the index up.
    pub name: String,
    /// Key-space prefix owned by the index.
    pub index_id: IndexId,
    /// Index configuration.
    pub config: IndexConfig,
}

impl Config {
    /// Create a configuration with no indexes.
    pub fn new(storage_path: impl Into<PathBuf>) -> Self {
        Self { storage_path: storage_path.into(), trained_data_dir: None, indexes: Vec::new() }
    }

    /// Set the trained data directory.
    #[must_use]
    pub fn with_trained_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.trained_data_dir = Some(dir.into());
        self
    }

    /// Add an index definition.
    #[must_use]
    pub fn with_index(
        mut self,
        name: impl Into<String>,
        index_id: IndexId,
        config: IndexConfig,
    ) -> Self {
        self.indexes.push(IndexDefinition { name: name.into(), index_id, config });
        self
    }

    /// Parse and validate a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] for malformed JSON and [`Error::Config`] if
    /// validation fails.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    ///
    /// Relative `storage_path` and `trained_data_dir` entries are resolved
    /// against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, otherwise as
    /// [`from_json_str`](Self::from_json_str).
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = Self::from_json_str(&std::fs::read_to_string(path)?)?;
        if let Some(base) = path.parent() {
            config.storage_path = base.join(&config.storage_path);
            config.trained_data_dir = config.trained_data_dir.map(|dir| base.join(dir));
        }
        Ok(config)
    }

    /// Check index names and ids are unique and every index config is valid.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        let mut ids = HashSet::new();
        for def in &self.indexes {
            if def.name.is_empty() {
                return Err(Error::Config("index name must not be empty".to_string()));
            }
            if !names.insert(def.name.as_str()) {
                return Err(Error::Config(format!("duplicate index name '{}'", def.name)));
            }
            if !ids.insert(def.index_id) {
                return Err(Error::Config(format!("duplicate index id {}", def.index_id)));
            }
            def.config
                .validate()
                .map_err(|e| Error::Config(format!("index '{}': {e}", def.name)))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use lsmvec_vector::{Metric, Strategy};

    use super::*;

    const SAMPLE: &str = r#"{
        "storage_path": "data.redb",
        "trained_data_dir": "trained",
        "indexes": [
            { "name": "docs", "index_id": 7, "config": { "dimension": 3, "strategy": "flat" } },
            {
                "name": "pq",
                "index_id": 8,
                "config": {
                    "dimension": 4,
                    "metric": "inner_product",
                    "strategy": "ivf_pq",
                    "trained_source": { "table": "trained", "id": "pq4" }
                }
            }
        ]
    }"#;

    #[test]
    fn parses_sample() {
        let config = Config::from_json_str(SAMPLE).unwrap();
        assert_eq!(config.storage_path, PathBuf::from("data.redb"));
        assert_eq!(config.indexes.len(), 2);
        assert_eq!(config.indexes[0].index_id, IndexId::new(7));
        assert_eq!(config.indexes[0].config.strategy, Strategy::Flat);
        assert_eq!(config.indexes[1].config.metric, Metric::InnerProduct);
    }

    #[test]
    fn rejects_duplicates() {
        let dup_name = Config::new("x")
            .with_index("a", IndexId::new(1), IndexConfig::new(2, Strategy::Flat))
            .with_index("a", IndexId::new(2), IndexConfig::new(2, Strategy::Flat));
        assert!(matches!(dup_name.validate(), Err(Error::Config(_))));

        let dup_id = Config::new("x")
            .with_index("a", IndexId::new(1), IndexConfig::new(2, Strategy::Flat))
            .with_index("b", IndexId::new(1), IndexConfig::new(2, Strategy::Flat));
        assert!(matches!(dup_id.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn rejects_invalid_index_config() {
        let json = r#"{ "storage_path": "x", "indexes": [
            { "name": "a", "index_id": 1, "config": { "dimension": 0, "strategy": "flat" } }
        ] }"#;
        let err = Config::from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("index 'a'"));
    }

    #[test]
    fn malformed_json() {
        assert!(matches!(Config::from_json_str("{"), Err(Error::Json(_))));
    }
}
