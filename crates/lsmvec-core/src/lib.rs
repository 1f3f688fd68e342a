//! `lsmvec` Core
//!
//! This crate provides the identifiers and byte-level decoding shared by the
//! storage and vector crates of `lsmvec`.
//!
//! # Modules
//!
//! - [`types`] - Index and list identifiers
//! - [`encoding`] - Bounds-checked reading and packed row decoding
//! - [`error`] - Error types

pub mod encoding;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use encoding::{ByteReader, FieldInfo, FieldKind, TableLayout};
pub use error::CoreError;
pub use types::{IndexId, ListId};
