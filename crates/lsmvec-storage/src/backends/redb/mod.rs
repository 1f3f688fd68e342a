//! Redb storage backend.
//!
//! All logical tables live in one physical Redb table; see [`tables`] for the
//! key prefixing scheme.

mod engine;
pub mod tables;
mod transaction;

pub use engine::{RedbConfig, RedbEngine};
pub use transaction::{RedbCursor, RedbTransaction};
