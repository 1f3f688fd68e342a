//! Inverted lists materialized as key ranges.
//!
//! Every entry of list `l` of index `i` lives under
//! `[i][l][pk suffix]` in [`INDEX_TABLE`], so a list is one half-open range
//! scan. [`ListCursor`] adapts that range scan to a pull-one-entry contract,
//! verifying each key and applying an optional row predicate internally.

use lsmvec_core::{encoding::decode_fields, IndexId, ListId, TableLayout};
use lsmvec_storage::{Cursor, Transaction};
use tracing::error;

use crate::cancel::CancellationFlag;
use crate::encoding::{
    decode_list_key, encode_list_key, encode_list_value, list_range, pk_suffix, split_list_value,
};
use crate::error::{Result, VectorError};

/// Table holding every index-owned key.
pub const INDEX_TABLE: &str = "lsmvec_index";

/// A vector routed to a list together with its encoded codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// Target list.
    pub list_id: ListId,
    /// Encoded vector, exactly the index's code size.
    pub codes: Vec<u8>,
}

/// Decoded view of one entry, handed to a [`RowPredicate`].
#[derive(Debug, Clone)]
pub struct RowView<'a> {
    /// The full stored key.
    pub key: &'a [u8],
    /// Primary key suffix of the key.
    pub pk_suffix: &'a [u8],
    fields: Vec<&'a [u8]>,
}

impl<'a> RowView<'a> {
    /// The `i`-th field requested by the filter, in request order.
    ///
    /// Null fields are empty.
    #[must_use]
    pub fn field(&self, i: usize) -> Option<&'a [u8]> {
        self.fields.get(i).copied()
    }
}

/// Opaque row-level condition pushed down into list scans.
pub trait RowPredicate: Send + Sync {
    /// Whether the row should be yielded.
    fn evaluate(&self, row: &RowView<'_>) -> bool;
}

impl<F> RowPredicate for F
where
    F: Fn(&RowView<'_>) -> bool + Send + Sync,
{
    fn evaluate(&self, row: &RowView<'_>) -> bool {
        self(row)
    }
}

/// A predicate plus the auxiliary columns it needs decoded.
pub struct ListFilter {
    layout: TableLayout,
    fields: Vec<usize>,
    predicate: Box<dyn RowPredicate>,
}

impl ListFilter {
    /// A filter from any predicate implementation.
    #[must_use]
    pub fn new(layout: TableLayout, fields: Vec<usize>, predicate: Box<dyn RowPredicate>) -> Self {
        Self { layout, fields, predicate }
    }

    /// A filter over the primary key only.
    #[must_use]
    pub fn on_key<F>(predicate: F) -> Self
    where
        F: Fn(&RowView<'_>) -> bool + Send + Sync + 'static,
    {
        Self::new(TableLayout::default(), Vec::new(), Box::new(predicate))
    }

    /// A filter that also needs `fields` of the auxiliary columns, laid out per `layout`.
    #[must_use]
    pub fn on_fields<F>(layout: TableLayout, fields: Vec<usize>, predicate: F) -> Self
    where
        F: Fn(&RowView<'_>) -> bool + Send + Sync + 'static,
    {
        Self::new(layout, fields, Box::new(predicate))
    }

    fn matches(&self, key: &[u8], pk_suffix: &[u8], aux: Option<&[u8]>) -> Result<bool> {
        let fields = if self.fields.is_empty() {
            Vec::new()
        } else {
            let aux = aux.ok_or_else(|| {
                VectorError::CorruptData(
                    "predicate needs auxiliary columns but the value has none".to_string(),
                )
            })?;
            decode_fields(&self.layout, aux, &self.fields)?
        };
        Ok(self.predicate.evaluate(&RowView { key, pk_suffix, fields }))
    }
}

impl std::fmt::Debug for ListFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListFilter").field("fields", &self.fields).finish_non_exhaustive()
    }
}

/// One entry yielded by a [`ListCursor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    /// The full stored key.
    pub key: Vec<u8>,
    /// The vector codes.
    pub codes: Vec<u8>,
    /// The stored value with the codes removed; empty for legacy values.
    pub value: Vec<u8>,
}

/// Storage of one index's inverted lists.
#[derive(Debug, Clone, Copy)]
pub struct InvertedListStore {
    index_id: IndexId,
    nlist: usize,
    code_size: usize,
}

impl InvertedListStore {
    /// Create a store for `nlist` lists of `code_size`-byte codes.
    #[must_use]
    pub const fn new(index_id: IndexId, nlist: usize, code_size: usize) -> Self {
        Self { index_id, nlist, code_size }
    }

    /// Owning index.
    #[must_use]
    pub const fn index_id(&self) -> IndexId {
        self.index_id
    }

    /// Bytes per code.
    #[must_use]
    pub const fn code_size(&self) -> usize {
        self.code_size
    }

    fn check_list(&self, list_id: ListId) -> Result<()> {
        if list_id.as_usize() >= self.nlist {
            return Err(VectorError::InvalidArgument(format!(
                "list {list_id} out of range for {} lists",
                self.nlist
            )));
        }
        Ok(())
    }

    /// Validate codes for `list_id` and bundle them as an [`Assignment`].
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::InvalidArgument`] if the list does not exist or
    /// the codes are not exactly the code size.
    pub fn add_entry(&self, list_id: ListId, codes: &[u8]) -> Result<Assignment> {
        self.check_codes(list_id, codes)?;
        Ok(Assignment { list_id, codes: codes.to_vec() })
    }

    fn check_codes(&self, list_id: ListId, codes: &[u8]) -> Result<()> {
        self.check_list(list_id)?;
        if codes.len() != self.code_size {
            return Err(VectorError::InvalidArgument(format!(
                "codes of {} bytes, index {} expects {}",
                codes.len(),
                self.index_id,
                self.code_size
            )));
        }
        Ok(())
    }

    /// Write an assigned vector under the caller's write transaction.
    ///
    /// `pk` is the full primary key including its own index-id prefix;
    /// `aux` holds packed auxiliary columns for predicate pushdown.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::InvalidArgument`] for a foreign assignment or an
    /// empty primary key, or the storage error.
    pub fn put_entry<T: Transaction>(
        &self,
        tx: &mut T,
        assignment: &Assignment,
        pk: &[u8],
        aux: Option<&[u8]>,
    ) -> Result<()> {
        self.check_codes(assignment.list_id, &assignment.codes)?;
        let key = encode_list_key(self.index_id, assignment.list_id, pk_suffix(pk)?);
        let value = encode_list_value(&assignment.codes, aux)?;
        tx.put(INDEX_TABLE, &key, &value)?;
        Ok(())
    }

    /// Remove the entry of `pk` from `list_id`. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::InvalidArgument`] for an unknown list or empty
    /// primary key, or the storage error.
    pub fn delete_entry<T: Transaction>(
        &self,
        tx: &mut T,
        list_id: ListId,
        pk: &[u8],
    ) -> Result<bool> {
        self.check_list(list_id)?;
        let key = encode_list_key(self.index_id, list_id, pk_suffix(pk)?);
        Ok(tx.delete(INDEX_TABLE, &key)?)
    }

    /// Open a cursor over one list.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::InvalidArgument`] for an unknown list, or the
    /// storage error if the range scan cannot start.
    pub fn iterate<'t, T: Transaction + 't>(
        &self,
        tx: &'t T,
        list_id: ListId,
        filter: Option<&'t ListFilter>,
        cancel: Option<&CancellationFlag>,
    ) -> Result<ListCursor<'t, T>> {
        self.check_list(list_id)?;
        let range = list_range(self.index_id, list_id);
        let (start, end) = range.bounds();
        let cursor = tx.range(INDEX_TABLE, start, end)?;
        Ok(ListCursor {
            cursor,
            index_id: self.index_id,
            list_id,
            code_size: self.code_size,
            filter,
            cancel: cancel.cloned(),
            seen: 0,
            state: ScanState::Running,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Running,
    Completed,
    Failed,
}

/// Pull-based cursor over one inverted list.
///
/// Yields only entries that pass the filter. Any error ends the scan; a
/// failed scan never reports a completed entry count.
pub struct ListCursor<'t, T: Transaction + 't> {
    cursor: T::Cursor<'t>,
    index_id: IndexId,
    list_id: ListId,
    code_size: usize,
    filter: Option<&'t ListFilter>,
    cancel: Option<CancellationFlag>,
    seen: usize,
    state: ScanState,
}

impl<'t, T: Transaction + 't> ListCursor<'t, T> {
    /// The list being scanned.
    #[must_use]
    pub const fn list_id(&self) -> ListId {
        self.list_id
    }

    /// Entries scanned so far, matching or not.
    #[must_use]
    pub const fn entries_seen(&self) -> usize {
        self.seen
    }

    /// The list size, once the scan reached the end of the list without error.
    #[must_use]
    pub fn completed(&self) -> Option<usize> {
        (self.state == ScanState::Completed).then_some(self.seen)
    }

    /// Advance to the next matching entry.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::CorruptData`] for a malformed key or value,
    /// [`VectorError::Cancelled`] if the flag is set, or the storage error.
    pub fn next_entry(&mut self) -> Result<Option<ListEntry>> {
        if self.state != ScanState::Running {
            return Ok(None);
        }
        match self.advance() {
            Ok(None) => {
                self.state = ScanState::Completed;
                Ok(None)
            }
            Ok(entry) => Ok(entry),
            Err(e) => {
                self.state = ScanState::Failed;
                if matches!(e, VectorError::CorruptData(_)) {
                    error!(
                        index_id = %self.index_id,
                        list_id = %self.list_id,
                        error = %e,
                        "corrupt inverted list entry"
                    );
                }
                Err(e)
            }
        }
    }

    fn advance(&mut self) -> Result<Option<ListEntry>> {
        while let Some((key, value)) = self.cursor.next()? {
            if let Some(cancel) = &self.cancel {
                cancel.check()?;
            }
            self.seen += 1;

            let decoded = decode_list_key(&key, self.index_id, self.list_id)?;
            let parts = split_list_value(&value, self.code_size)?;
            if let Some(filter) = self.filter {
                if !filter.matches(&key, decoded.pk_suffix, parts.aux())? {
                    continue;
                }
            }
            let codes = parts.codes.to_vec();
            let value = parts.without_codes();
            return Ok(Some(ListEntry { key, codes, value }));
        }
        Ok(None)
    }
}

impl<'t, T: Transaction + 't> Iterator for ListCursor<'t, T> {
    type Item = Result<ListEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry().transpose()
    }
}

#[cfg(test)]
mod tests {
    use lsmvec_core::FieldInfo;
    use lsmvec_storage::backends::RedbEngine;
    use lsmvec_storage::StorageEngine;

    use super::*;

    fn pk(id: u8) -> Vec<u8> {
        vec![0, 0, 0, 1, id]
    }

    fn store() -> InvertedListStore {
        InvertedListStore::new(IndexId::new(5), 4, 2)
    }

    fn collect<T: Transaction>(cursor: ListCursor<'_, T>) -> Vec<ListEntry> {
        cursor.collect::<Result<Vec<_>>>().unwrap()
    }

    #[test]
    fn iterate_yields_only_its_list() {
        let engine = RedbEngine::in_memory().unwrap();
        let s = store();
        let neighbour = InvertedListStore::new(IndexId::new(6), 4, 2);

        let mut tx = engine.begin_write().unwrap();
        for (list, id) in [(1u64, 1u8), (1, 2), (2, 3), (0, 4)] {
            let a = s.add_entry(ListId::new(list), &[id, id]).unwrap();
            s.put_entry(&mut tx, &a, &pk(id), None).unwrap();
        }
        let a = neighbour.add_entry(ListId::new(1), &[9, 9]).unwrap();
        neighbour.put_entry(&mut tx, &a, &pk(9), None).unwrap();
        tx.commit().unwrap();

        let tx = engine.begin_read().unwrap();
        let mut cursor = s.iterate(&tx, ListId::new(1), None, None).unwrap();
        let mut codes = Vec::new();
        while let Some(entry) = cursor.next_entry().unwrap() {
            codes.push(entry.codes);
        }
        assert_eq!(codes, vec![vec![1, 1], vec![2, 2]]);
        assert_eq!(cursor.completed(), Some(2));

        let entries = collect(s.iterate(&tx, ListId::new(3), None, None).unwrap());
        assert!(entries.is_empty());
    }

    #[test]
    fn stored_key_is_full_list_key() {
        let engine = RedbEngine::in_memory().unwrap();
        let s = store();
        let mut tx = engine.begin_write().unwrap();
        let a = s.add_entry(ListId::new(0), &[1, 2]).unwrap();
        s.put_entry(&mut tx, &a, &pk(7), Some(b"x")).unwrap();
        tx.commit().unwrap();

        let tx = engine.begin_read().unwrap();
        let entries = collect(s.iterate(&tx, ListId::new(0), None, None).unwrap());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, encode_list_key(IndexId::new(5), ListId::new(0), &[7]));
        assert_eq!(entries[0].codes, vec![1, 2]);
        assert_eq!(entries[0].value.last(), Some(&b'x'));
    }

    #[test]
    fn delete_removes_entry() {
        let engine = RedbEngine::in_memory().unwrap();
        let s = store();
        let mut tx = engine.begin_write().unwrap();
        let a = s.add_entry(ListId::new(2), &[1, 1]).unwrap();
        s.put_entry(&mut tx, &a, &pk(1), None).unwrap();
        assert!(s.delete_entry(&mut tx, ListId::new(2), &pk(1)).unwrap());
        assert!(!s.delete_entry(&mut tx, ListId::new(2), &pk(1)).unwrap());
        tx.commit().unwrap();

        let tx = engine.begin_read().unwrap();
        assert!(collect(s.iterate(&tx, ListId::new(2), None, None).unwrap()).is_empty());
    }

    #[test]
    fn filter_skips_rows_but_counts_them() {
        let engine = RedbEngine::in_memory().unwrap();
        let s = store();
        let layout = TableLayout::new(vec![FieldInfo::fixed(1)]);
        let mut tx = engine.begin_write().unwrap();
        for id in 1..=4u8 {
            let a = s.add_entry(ListId::new(0), &[id, 0]).unwrap();
            s.put_entry(&mut tx, &a, &pk(id), Some(&[id * 10])).unwrap();
        }
        tx.commit().unwrap();

        let filter = ListFilter::on_fields(layout, vec![0], |row: &RowView<'_>| {
            row.field(0).is_some_and(|f| f[0] >= 30)
        });
        let tx = engine.begin_read().unwrap();
        let mut cursor = s.iterate(&tx, ListId::new(0), Some(&filter), None).unwrap();
        let mut ids = Vec::new();
        while let Some(entry) = cursor.next_entry().unwrap() {
            ids.push(entry.codes[0]);
        }
        assert_eq!(ids, vec![3, 4]);
        assert_eq!(cursor.completed(), Some(4));
    }

    #[test]
    fn key_filter_sees_pk_suffix() {
        let engine = RedbEngine::in_memory().unwrap();
        let s = store();
        let mut tx = engine.begin_write().unwrap();
        for id in 1..=3u8 {
            let a = s.add_entry(ListId::new(0), &[id, 0]).unwrap();
            s.put_entry(&mut tx, &a, &pk(id), None).unwrap();
        }
        tx.commit().unwrap();

        let filter = ListFilter::on_key(|row: &RowView<'_>| row.pk_suffix == [2u8].as_slice());
        let tx = engine.begin_read().unwrap();
        let entries = collect(s.iterate(&tx, ListId::new(0), Some(&filter), None).unwrap());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].codes, vec![2, 0]);
    }

    #[test]
    fn field_filter_on_legacy_value_is_corrupt() {
        let engine = RedbEngine::in_memory().unwrap();
        let s = store();
        let mut tx = engine.begin_write().unwrap();
        let a = s.add_entry(ListId::new(0), &[1, 1]).unwrap();
        s.put_entry(&mut tx, &a, &pk(1), None).unwrap();
        tx.commit().unwrap();

        let filter =
            ListFilter::on_fields(TableLayout::new(vec![FieldInfo::fixed(1)]), vec![0], |_: &RowView<'_>| true);
        let tx = engine.begin_read().unwrap();
        let mut cursor = s.iterate(&tx, ListId::new(0), Some(&filter), None).unwrap();
        assert!(matches!(cursor.next_entry(), Err(VectorError::CorruptData(_))));
        assert_eq!(cursor.completed(), None);
        assert!(cursor.next_entry().unwrap().is_none());
    }

    #[test]
    fn corrupt_value_aborts_scan() {
        let engine = RedbEngine::in_memory().unwrap();
        let s = store();
        let mut tx = engine.begin_write().unwrap();
        let key = encode_list_key(IndexId::new(5), ListId::new(0), &[1]);
        tx.put(INDEX_TABLE, &key, &[1]).unwrap();
        tx.commit().unwrap();

        let tx = engine.begin_read().unwrap();
        let mut cursor = s.iterate(&tx, ListId::new(0), None, None).unwrap();
        assert!(matches!(cursor.next_entry(), Err(VectorError::CorruptData(_))));
        assert_eq!(cursor.completed(), None);
    }

    #[test]
    fn cancellation_stops_scan() {
        let engine = RedbEngine::in_memory().unwrap();
        let s = store();
        let mut tx = engine.begin_write().unwrap();
        let a = s.add_entry(ListId::new(0), &[1, 1]).unwrap();
        s.put_entry(&mut tx, &a, &pk(1), None).unwrap();
        tx.commit().unwrap();

        let flag = CancellationFlag::new();
        flag.cancel();
        let tx = engine.begin_read().unwrap();
        let mut cursor = s.iterate(&tx, ListId::new(0), None, Some(&flag)).unwrap();
        assert!(matches!(cursor.next_entry(), Err(VectorError::Cancelled)));
    }

    #[test]
    fn rejects_bad_entries() {
        let s = store();
        assert!(s.add_entry(ListId::new(4), &[0, 0]).is_err());
        assert!(s.add_entry(ListId::new(0), &[0]).is_err());
        let engine = RedbEngine::in_memory().unwrap();
        let mut tx = engine.begin_write().unwrap();
        let a = s.add_entry(ListId::new(0), &[0, 0]).unwrap();
        assert!(s.put_entry(&mut tx, &a, &[0, 0, 0, 1], None).is_err());
    }
}
