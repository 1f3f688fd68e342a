//! Storage boundary traits.
//!
//! - [`StorageEngine`] - Entry point, hands out transactions
//! - [`Transaction`] - Point reads and writes plus forward range scans
//! - [`Cursor`] - Forward iteration over an ordered key range
//!
//! Keys are compared bytewise. Every table is an independent ordered key space.

use std::ops::Bound;

use super::StorageError;

/// An owned `(key, value)` pair.
pub type KeyValue = (Vec<u8>, Vec<u8>);

/// The next pair of a cursor, `None` past the end of its range.
pub type CursorResult = Result<Option<KeyValue>, StorageError>;

/// An ordered, transactional key-value store.
///
/// # Example
///
/// ```ignore
/// use lsmvec_storage::{StorageEngine, StorageError, Transaction};
///
/// fn copy_row<E: StorageEngine>(engine: &E, from: &[u8], to: &[u8]) -> Result<(), StorageError> {
///     let mut tx = engine.begin_write()?;
///     if let Some(row) = tx.get("rows", from)? {
///         tx.put("rows", to, &row)?;
///     }
///     tx.commit()
/// }
/// ```
pub trait StorageEngine: Send + Sync {
    /// The transaction type for this engine.
    type Transaction<'a>: Transaction
    where
        Self: 'a;

    /// Begin a read-only transaction over a consistent snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Transaction`] if the transaction cannot be started.
    fn begin_read(&self) -> Result<Self::Transaction<'_>, StorageError>;

    /// Begin a read-write transaction.
    ///
    /// The write transaction is the write batch: nothing is visible to other
    /// transactions until [`Transaction::commit`].
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Transaction`] if the transaction cannot be started.
    fn begin_write(&self) -> Result<Self::Transaction<'_>, StorageError>;
}

/// A transaction that provides key-value operations.
///
/// Dropping a write transaction without committing rolls it back.
pub trait Transaction {
    /// The cursor type for iteration.
    type Cursor<'a>: Cursor
    where
        Self: 'a;

    /// Get a value by key from a table.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    fn get(&self, table: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    /// Put a key-value pair into a table, replacing any existing value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ReadOnly`] on a read transaction.
    fn put(&mut self, table: &str, key: &[u8], value: &[u8]) -> Result<(), StorageError>;

    /// Delete a key from a table. Returns whether the key existed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ReadOnly`] on a read transaction.
    fn delete(&mut self, table: &str, key: &[u8]) -> Result<bool, StorageError>;

    /// Create a cursor over every key of a table.
    ///
    /// # Errors
    ///
    /// Returns an error if the cursor cannot be created.
    fn cursor(&self, table: &str) -> Result<Self::Cursor<'_>, StorageError> {
        self.range(table, Bound::Unbounded, Bound::Unbounded)
    }

    /// Create a cursor over the keys of a table within the given bounds.
    ///
    /// # Errors
    ///
    /// Returns an error if the cursor cannot be created.
    fn range(
        &self,
        table: &str,
        start: Bound<&[u8]>,
        end: Bound<&[u8]>,
    ) -> Result<Self::Cursor<'_>, StorageError>;

    /// Commit the transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Transaction`] if the commit fails.
    fn commit(self) -> Result<(), StorageError>;

    /// Roll the transaction back.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to abort.
    fn rollback(self) -> Result<(), StorageError>;

    /// Whether this transaction rejects writes.
    fn is_read_only(&self) -> bool;
}

/// A forward cursor over key-value pairs in ascending key order.
pub trait Cursor {
    /// Position at the first key `>= key` inside the cursor's bounds and return it.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    fn seek(&mut self, key: &[u8]) -> CursorResult;

    /// Advance and return the next pair, or `None` once the range is exhausted.
    ///
    /// An unpositioned cursor starts from the lower bound.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    fn next(&mut self) -> CursorResult;

    /// The pair the cursor is positioned on, if any.
    fn current(&self) -> Option<(&[u8], &[u8])>;
}
