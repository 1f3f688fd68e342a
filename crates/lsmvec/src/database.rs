//! Database handle: a storage engine plus the indexes configured over it.

use std::collections::BTreeMap;

use lsmvec_storage::backends::RedbEngine;
use lsmvec_storage::StorageEngine;
use lsmvec_vector::quantization::StoredTrainedData;
use lsmvec_vector::{CancellationFlag, IndexInfo, SearchHandler, SearchMode, SearchParams};
use serde::Serialize;
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::registry::IndexRegistry;
use crate::trained::JsonTrainedDataDir;

/// One row of a search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRow {
    /// Index key of the row.
    pub key: Vec<u8>,
    /// Score, when the search ranked rows.
    pub distance: Option<f32>,
    /// Stored row value, when the index keeps one.
    pub value: Option<Vec<u8>>,
}

/// An open database with its registered vector indexes.
///
/// # Example
///
/// ```ignore
/// use lsmvec::{Config, Database};
/// use lsmvec_vector::{SearchMode, SearchParams};
///
/// let db = Database::open(Config::from_json_file("lsmvec.json")?)?;
/// let rows = db.search("docs", SearchMode::KnnFirst, SearchParams::new(vec![0.1, 0.2, 0.3], 10))?;
/// ```
pub struct Database {
    engine: RedbEngine,
    registry: IndexRegistry,
    config: Config,
}

impl Database {
    /// Open the storage file named by `config` and set up its indexes.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be opened or any index fails
    /// setup.
    pub fn open(config: Config) -> Result<Self> {
        let engine = RedbEngine::open(&config.storage_path)?;
        Self::with_engine(engine, config)
    }

    /// Set up the configured indexes over an in-memory engine.
    ///
    /// # Errors
    ///
    /// As [`open`](Self::open).
    pub fn in_memory(config: Config) -> Result<Self> {
        Self::with_engine(RedbEngine::in_memory()?, config)
    }

    fn with_engine(engine: RedbEngine, config: Config) -> Result<Self> {
        let registry = match &config.trained_data_dir {
            Some(dir) => IndexRegistry::from_config(&config, &JsonTrainedDataDir::new(dir))?,
            None => IndexRegistry::from_config(&config, &StoredTrainedData::new(&engine))?,
        };
        info!(indexes = registry.len(), "database opened");
        Ok(Self { engine, registry, config })
    }

    /// The configuration used to open this database.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The storage engine, for callers that write rows and list entries.
    #[must_use]
    pub const fn engine(&self) -> &RedbEngine {
        &self.engine
    }

    /// The registered indexes.
    #[must_use]
    pub const fn registry(&self) -> &IndexRegistry {
        &self.registry
    }

    /// Run one search against the named index and collect every row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexNotFound`](crate::Error::IndexNotFound) for an
    /// unknown name, or the search error.
    pub fn search(
        &self,
        name: &str,
        mode: SearchMode,
        params: SearchParams,
    ) -> Result<Vec<SearchRow>> {
        let index = self.registry.require(name)?;
        let tx = self.engine.begin_read()?;
        let mut handler = SearchHandler::new(index, &tx);
        handler.prepare(mode, params)?;
        handler.execute()?;

        let mut rows = Vec::new();
        while handler.has_next()? {
            let value = match handler.current_value() {
                Ok(value) => Some(value.to_vec()),
                Err(e) if e.is_unsupported() => None,
                Err(e) => return Err(e.into()),
            };
            rows.push(SearchRow {
                key: handler.current_key()?.to_vec(),
                distance: handler.current_distance()?,
                value,
            });
            handler.advance()?;
        }
        Ok(rows)
    }

    /// Analyze every index, then report their diagnostics.
    ///
    /// # Errors
    ///
    /// Returns the first analyze error, including
    /// [`VectorError::Cancelled`](lsmvec_vector::VectorError::Cancelled).
    pub fn analyze_all(
        &self,
        max_rows: u64,
        cancel: Option<&CancellationFlag>,
    ) -> Result<BTreeMap<String, IndexInfo>> {
        let tx = self.engine.begin_read()?;
        for (_, index) in self.registry.iter() {
            index.analyze(&tx, max_rows, cancel)?;
        }
        Ok(self.registry.dump_info())
    }
}
