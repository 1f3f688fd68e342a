//! Externally owned cancellation flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Result, VectorError};

/// A shared "killed" flag polled by long scans.
///
/// Clones share the flag. Scans check it once per row and fail with
/// [`VectorError::Cancelled`] once it is set.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    /// Create an unset flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Fail with [`VectorError::Cancelled`] if the flag is set.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::Cancelled`] once [`cancel`](Self::cancel) was called.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(VectorError::Cancelled)
        } else {
            Ok(())
        }
    }
}
