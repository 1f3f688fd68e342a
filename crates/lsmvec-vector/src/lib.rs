//! `lsmvec` Vector
//!
//! This crate provides vector similarity indexes stored inside an ordered
//! key-value space.
//!
//! # Overview
//!
//! - **Inverted-file indexes**: vectors routed to trained centroids, each list
//!   a contiguous key range, with optional product quantization
//! - **Linear-scan indexes**: exact search over stored rows, with hybrid
//!   vector + spatial ranking
//! - **Search handler**: a per-query state machine exposing results one row at
//!   a time, whichever strategy produced them
//!
//! # Example
//!
//! ```ignore
//! use lsmvec_core::IndexId;
//! use lsmvec_storage::backends::RedbEngine;
//! use lsmvec_vector::handler::{SearchHandler, SearchMode};
//! use lsmvec_vector::index::{create_vector_index, IndexConfig, SearchParams, Strategy};
//! use lsmvec_vector::quantization::InMemoryTrainedData;
//!
//! let engine = RedbEngine::in_memory()?;
//! let index = create_vector_index(
//!     IndexId::new(1),
//!     IndexConfig::new(3, Strategy::Flat),
//!     &InMemoryTrainedData::new(),
//! )?;
//!
//! let tx = engine.begin_read()?;
//! let mut handler = SearchHandler::new(&index, &tx);
//! handler.prepare(SearchMode::KnnFirst, SearchParams::new(vec![0.1, 0.2, 0.3], 10))?;
//! handler.execute()?;
//! while handler.has_next()? {
//!     println!("{:?}", handler.current_key()?);
//!     handler.advance()?;
//! }
//! ```
//!
//! # Modules
//!
//! - [`distance`] - Distance kernels and the ranking [`Metric`]
//! - [`encoding`] - Inverted-list keys and values, vector blobs
//! - [`quantization`] - Coarse quantizer, product quantizer, trained data
//! - [`store`] - Inverted lists as key ranges
//! - [`ops`] - Top-k selection and hybrid ranking
//! - [`index`] - The IVF and linear-scan strategies
//! - [`handler`] - The per-query search cursor
//! - [`cancel`] - Cancellation flag polled by long scans
//! - [`error`] - Error types

pub mod cancel;
pub mod distance;
pub mod encoding;
pub mod error;
pub mod handler;
pub mod index;
pub mod ops;
pub mod quantization;
pub mod store;

// Re-export commonly used types
pub use cancel::CancellationFlag;
pub use distance::Metric;
pub use error::VectorError;
pub use handler::{HandlerPhase, OrderByBinding, SearchHandler, SearchMode};
pub use index::{
    create_vector_index, IndexConfig, IndexInfo, SearchParams, Strategy, VectorIndex,
};
pub use ops::{Coordinate, Haversine, SearchHit, SpatialDistance};
pub use quantization::{TrainedDataSource, TrainedIndexData, TrainedSource};
pub use store::{InvertedListStore, ListFilter, RowView};
