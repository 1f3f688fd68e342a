//! Coarse and product quantization.
//!
//! - [`CoarseQuantizer`] routes vectors to inverted lists
//! - [`ProductQuantizer`] compresses residuals into short codes
//! - [`TrainedDataSource`] loads the externally trained data both are built from

mod coarse;
pub mod pq;
mod trained;

pub use coarse::CoarseQuantizer;
pub use pq::{DistanceTable, ProductQuantizer};
pub use trained::{
    store_trained_data, InMemoryTrainedData, StoredTrainedData, TrainedDataSource,
    TrainedIndexData, TrainedSource,
};
