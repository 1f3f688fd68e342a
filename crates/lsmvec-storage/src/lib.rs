//! `lsmvec` Storage
//!
//! This crate provides the ordered key-value boundary the vector indexes are
//! built on, and a Redb-backed implementation of it.
//!
//! # Modules
//!
//! - [`engine`] - Storage engine traits and abstractions
//! - [`backends`] - Concrete storage backend implementations

pub mod backends;
pub mod engine;

pub use engine::{Cursor, KeyValue, StorageEngine, StorageError, Transaction};
