//! Identifiers used across the index key space.

mod id;

pub use id::{IndexId, ListId};
