//! Error types for the core crate.

use thiserror::Error;

/// Errors that can occur in the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Encoded bytes are malformed or truncated.
    #[error("corrupt data: {0}")]
    CorruptData(String),

    /// A table layout description is inconsistent.
    #[error("invalid layout: {0}")]
    InvalidLayout(String),
}

impl CoreError {
    /// Build a [`CoreError::CorruptData`] for a read that would overrun its buffer.
    #[must_use]
    pub fn truncated(what: &str, offset: usize, needed: usize, remaining: usize) -> Self {
        Self::CorruptData(format!(
            "{what}: need {needed} bytes at offset {offset}, only {remaining} remain"
        ))
    }
}
