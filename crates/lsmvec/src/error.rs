//! Error types for the `lsmvec` facade.
//!
//! This module provides the [`enum@Error`] type returned by configuration
//! loading, index registration and the collaborator interfaces.

use lsmvec_storage::StorageError;
use lsmvec_vector::VectorError;
use thiserror::Error;

/// Errors that can occur when using the facade.
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// A configuration or trained-data file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON document could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A storage error occurred.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A vector index operation failed.
    #[error("vector error: {0}")]
    Vector(#[from] VectorError),

    /// No index is registered under this name.
    #[error("index not found: {0}")]
    IndexNotFound(String),

    /// A semantic row operator failed.
    #[error("semantic operator error: {0}")]
    Semantic(String),
}

/// A specialized Result type for facade operations.
pub type Result<T> = std::result::Result<T, Error>;
