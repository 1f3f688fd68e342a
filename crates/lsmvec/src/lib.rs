//! `lsmvec` - Vector Similarity Indexes over an Ordered Key Space
//!
//! This crate is the host-facing entry point: it reads engine configuration,
//! loads trained centroids, creates the configured indexes and runs searches
//! against them.
//!
//! # Quick Start
//!
//! ```ignore
//! use lsmvec::{Config, Database};
//! use lsmvec_vector::{SearchMode, SearchParams};
//!
//! let config = Config::from_json_file("lsmvec.json")?;
//! let db = Database::open(config)?;
//!
//! let rows = db.search("docs", SearchMode::KnnFirst, SearchParams::new(vec![0.1, 0.2, 0.3], 10))?;
//! for row in rows {
//!     println!("{:?} {:?}", row.key, row.distance);
//! }
//! ```
//!
//! # Modules
//!
//! - [`config`] - JSON engine configuration
//! - [`database`] - Storage engine plus registered indexes
//! - [`registry`] - Named indexes
//! - [`trained`] - Trained data read from JSON files
//! - [`semantic`] - Host-provided model operators
//! - [`sync`] - Continuous query driver
//! - [`logging`] - Subscriber setup for binaries
//! - [`error`] - Error types

pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod registry;
pub mod semantic;
pub mod sync;
pub mod trained;

pub use config::{Config, IndexDefinition};
pub use database::{Database, SearchRow};
pub use error::{Error, Result};
pub use registry::IndexRegistry;
pub use semantic::{embed_query, SemanticContext, SemanticOperator};
pub use sync::{ContinuousQuery, RunStats};
pub use trained::JsonTrainedDataDir;
