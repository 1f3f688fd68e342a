//! Error types for the vector crate.

use lsmvec_core::CoreError;
use thiserror::Error;

/// Errors that can occur in vector index operations.
///
/// Any error returned from a search means "no reliable results"; partial
/// results are never surfaced alongside an error.
#[derive(Debug, Error)]
pub enum VectorError {
    /// A key, value, or vector blob is malformed.
    #[error("corrupt data: {0}")]
    CorruptData(String),

    /// Index metadata is inconsistent with its trained data.
    #[error("invalid index configuration: {0}")]
    InvalidConfig(String),

    /// The caller supplied unusable parameters.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The strategy does not implement this operation.
    ///
    /// Callers probe for this and fall back to an alternate method.
    #[error("operation not supported: {0}")]
    Unsupported(&'static str),

    /// The operation was aborted through its cancellation flag.
    #[error("operation cancelled")]
    Cancelled,

    /// A method was called in a state that does not allow it.
    ///
    /// This is a programming error in the caller, not a data error.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] lsmvec_storage::StorageError),
}

impl VectorError {
    /// Whether this is the capability signal that triggers a fallback.
    #[must_use]
    pub const fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }
}

impl From<CoreError> for VectorError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::CorruptData(msg) => Self::CorruptData(msg),
            CoreError::InvalidLayout(msg) => Self::InvalidConfig(msg),
        }
    }
}

/// Result alias for vector operations.
pub type Result<T> = std::result::Result<T, VectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_keep_their_category() {
        let e: VectorError = CoreError::CorruptData("x".into()).into();
        assert!(matches!(e, VectorError::CorruptData(_)));
        let e: VectorError = CoreError::InvalidLayout("y".into()).into();
        assert!(matches!(e, VectorError::InvalidConfig(_)));
    }

    #[test]
    fn unsupported_is_recognised() {
        assert!(VectorError::Unsupported("knn_search").is_unsupported());
        assert!(!VectorError::Cancelled.is_unsupported());
    }
}
