//! Redb transaction implementation.
//!
//! Cursors stream the key range in batches (default 1000 entries) instead of
//! materializing it, fetching the next batch when the current one runs out.

use std::ops::Bound;

use redb::{ReadTransaction, ReadableTable, WriteTransaction};

use crate::engine::{Cursor, CursorResult, KeyValue, StorageError, Transaction};

use super::tables::{decode_key, encode_key, table_end_key, table_start_key, DATA_TABLE};

/// Default batch size for cursor operations.
const DEFAULT_BATCH_SIZE: usize = 1000;

fn internal(e: impl std::fmt::Display) -> StorageError {
    StorageError::Internal(e.to_string())
}

/// A transaction for the Redb storage engine.
#[allow(clippy::large_enum_variant)]
pub enum RedbTransaction {
    /// A read-only transaction.
    Read(ReadTransaction),
    /// A read-write transaction.
    Write(WriteTransaction),
}

impl RedbTransaction {
    /// Wrap a read-only transaction.
    #[must_use]
    pub const fn new_read(tx: ReadTransaction) -> Self {
        Self::Read(tx)
    }

    /// Wrap a read-write transaction.
    #[must_use]
    pub const fn new_write(tx: WriteTransaction) -> Self {
        Self::Write(tx)
    }

    /// Fetch up to `batch_size` entries of `table` between the logical bounds.
    fn fetch_batch(
        &self,
        table: &str,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
        batch_size: usize,
    ) -> Result<Vec<KeyValue>, StorageError> {
        let lower_key = match lower {
            Bound::Included(k) | Bound::Excluded(k) => encode_key(table, k),
            Bound::Unbounded => table_start_key(table),
        };
        let upper_key = match upper {
            Bound::Included(k) | Bound::Excluded(k) => encode_key(table, k),
            Bound::Unbounded => table_end_key(table),
        };
        let lower = match lower {
            Bound::Excluded(_) => Bound::Excluded(lower_key.as_slice()),
            _ => Bound::Included(lower_key.as_slice()),
        };
        let upper = match upper {
            Bound::Included(_) => Bound::Included(upper_key.as_slice()),
            _ => Bound::Excluded(upper_key.as_slice()),
        };

        match self {
            Self::Read(tx) => match tx.open_table(DATA_TABLE) {
                Ok(t) => collect_range(&t, lower, upper, batch_size),
                // No data table yet means no data.
                Err(redb::TableError::TableDoesNotExist(_)) => Ok(Vec::new()),
                Err(e) => Err(internal(e)),
            },
            Self::Write(tx) => {
                let t = tx.open_table(DATA_TABLE).map_err(internal)?;
                collect_range(&t, lower, upper, batch_size)
            }
        }
    }
}

/// Collect one batch from a physical key range, stripping the table prefix.
fn collect_range<T>(
    table: &T,
    lower: Bound<&[u8]>,
    upper: Bound<&[u8]>,
    batch_size: usize,
) -> Result<Vec<KeyValue>, StorageError>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    // An empty or inverted range is valid and yields nothing.
    if let (
        Bound::Included(l) | Bound::Excluded(l),
        Bound::Included(u) | Bound::Excluded(u),
    ) = (lower, upper)
    {
        if l > u || (l == u && !matches!((lower, upper), (Bound::Included(_), Bound::Included(_))))
        {
            return Ok(Vec::new());
        }
    }

    let mut entries = Vec::with_capacity(batch_size.min(1024));
    for result in table.range::<&[u8]>((lower, upper)).map_err(internal)? {
        if entries.len() >= batch_size {
            break;
        }
        let (k, v) = result.map_err(internal)?;
        if let Some((_, key)) = decode_key(k.value()) {
            entries.push((key.to_vec(), v.value().to_vec()));
        }
    }
    Ok(entries)
}

fn get_value<T>(table: &T, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    Ok(table.get(key).map_err(internal)?.map(|v| v.value().to_vec()))
}

impl Transaction for RedbTransaction {
    type Cursor<'a>
        = RedbCursor<'a>
    where
        Self: 'a;

    fn get(&self, table: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let encoded_key = encode_key(table, key);
        match self {
            Self::Read(tx) => match tx.open_table(DATA_TABLE) {
                Ok(t) => get_value(&t, &encoded_key),
                Err(redb::TableError::TableDoesNotExist(_)) => Ok(None),
                Err(e) => Err(internal(e)),
            },
            Self::Write(tx) => {
                let t = tx.open_table(DATA_TABLE).map_err(internal)?;
                get_value(&t, &encoded_key)
            }
        }
    }

    fn put(&mut self, table: &str, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        match self {
            Self::Read(_) => Err(StorageError::ReadOnly),
            Self::Write(tx) => {
                let encoded_key = encode_key(table, key);
                let mut t = tx.open_table(DATA_TABLE).map_err(internal)?;
                t.insert(encoded_key.as_slice(), value).map_err(internal)?;
                Ok(())
            }
        }
    }

    fn delete(&mut self, table: &str, key: &[u8]) -> Result<bool, StorageError> {
        match self {
            Self::Read(_) => Err(StorageError::ReadOnly),
            Self::Write(tx) => {
                let encoded_key = encode_key(table, key);
                let mut t = tx.open_table(DATA_TABLE).map_err(internal)?;
                let removed = t.remove(encoded_key.as_slice()).map_err(internal)?;
                Ok(removed.is_some())
            }
        }
    }

    fn range(
        &self,
        table: &str,
        start: Bound<&[u8]>,
        end: Bound<&[u8]>,
    ) -> Result<Self::Cursor<'_>, StorageError> {
        Ok(RedbCursor::new(
            self,
            table.to_string(),
            start.map(<[u8]>::to_vec),
            end.map(<[u8]>::to_vec),
            DEFAULT_BATCH_SIZE,
        ))
    }

    fn commit(self) -> Result<(), StorageError> {
        match self {
            Self::Read(_) => Ok(()),
            Self::Write(tx) => tx.commit().map_err(|e| StorageError::Transaction(e.to_string())),
        }
    }

    fn rollback(self) -> Result<(), StorageError> {
        match self {
            Self::Read(_) => Ok(()),
            Self::Write(tx) => tx.abort().map_err(|e| StorageError::Transaction(e.to_string())),
        }
    }

    fn is_read_only(&self) -> bool {
        matches!(self, Self::Read(_))
    }
}

/// A streaming forward cursor over one logical table.
///
/// At most `batch_size` entries are held in memory at a time.
pub struct RedbCursor<'a> {
    tx: &'a RedbTransaction,
    table: String,
    start: Bound<Vec<u8>>,
    end: Bound<Vec<u8>>,
    batch: Vec<KeyValue>,
    position: Option<usize>,
    batch_size: usize,
    /// The last fetched batch was short, so nothing follows it.
    drained: bool,
}

impl<'a> RedbCursor<'a> {
    /// Create an unpositioned cursor. The first [`Cursor::next`] starts at `start`.
    #[must_use]
    pub fn new(
        tx: &'a RedbTransaction,
        table: String,
        start: Bound<Vec<u8>>,
        end: Bound<Vec<u8>>,
        batch_size: usize,
    ) -> Self {
        Self {
            tx,
            table,
            start,
            end,
            batch: Vec::new(),
            position: None,
            batch_size: batch_size.max(1),
            drained: false,
        }
    }

    fn load(&mut self, lower: Bound<&[u8]>) -> Result<(), StorageError> {
        let upper = self.end.as_ref().map(Vec::as_slice);
        let batch = self.tx.fetch_batch(&self.table, lower, upper, self.batch_size)?;
        self.drained = batch.len() < self.batch_size;
        self.batch = batch;
        self.position = if self.batch.is_empty() { None } else { Some(0) };
        Ok(())
    }

    fn current_owned(&self) -> Option<KeyValue> {
        self.position.and_then(|p| self.batch.get(p).cloned())
    }

    fn finish(&mut self) -> CursorResult {
        self.position = None;
        self.batch.clear();
        self.drained = true;
        Ok(None)
    }
}

impl Cursor for RedbCursor<'_> {
    fn seek(&mut self, key: &[u8]) -> CursorResult {
        let start = self.start.clone();
        let lower = match &start {
            Bound::Included(s) if s.as_slice() > key => Bound::Included(s.as_slice()),
            Bound::Excluded(s) if s.as_slice() >= key => Bound::Excluded(s.as_slice()),
            _ => Bound::Included(key),
        };
        self.load(lower)?;
        Ok(self.current_owned())
    }

    fn next(&mut self) -> CursorResult {
        match self.position {
            None if self.batch.is_empty() && !self.drained => {
                let start = self.start.clone();
                self.load(start.as_ref().map(Vec::as_slice))?;
                Ok(self.current_owned())
            }
            None => self.finish(),
            Some(pos) if pos + 1 < self.batch.len() => {
                self.position = Some(pos + 1);
                Ok(self.current_owned())
            }
            Some(_) if self.drained => self.finish(),
            Some(_) => {
                let Some((last, _)) = self.batch.last().cloned() else {
                    return self.finish();
                };
                self.load(Bound::Excluded(last.as_slice()))?;
                Ok(self.current_owned())
            }
        }
    }

    fn current(&self) -> Option<(&[u8], &[u8])> {
        self.position.and_then(|p| self.batch.get(p)).map(|(k, v)| (k.as_slice(), v.as_slice()))
    }
}
