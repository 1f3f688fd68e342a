//! Inverted list key encoding.

use std::ops::Bound;

use lsmvec_core::{ByteReader, IndexId, ListId};

use crate::error::{Result, VectorError};

/// Length of the `[index_id][list_id]` prefix shared by every key of a list.
pub const LIST_KEY_PREFIX_LEN: usize = IndexId::ENCODED_LEN + ListId::ENCODED_LEN;

/// A half-open key range `[start, end)`. A missing end means "to the end of the table".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange {
    /// Inclusive lower bound.
    pub start: Vec<u8>,
    /// Exclusive upper bound.
    pub end: Option<Vec<u8>>,
}

impl KeyRange {
    /// Borrow the range as storage scan bounds.
    #[must_use]
    pub fn bounds(&self) -> (Bound<&[u8]>, Bound<&[u8]>) {
        let end = match &self.end {
            Some(end) => Bound::Excluded(end.as_slice()),
            None => Bound::Unbounded,
        };
        (Bound::Included(self.start.as_slice()), end)
    }
}

/// Encode the prefix shared by every key of one list.
#[must_use]
pub fn encode_list_prefix(index_id: IndexId, list_id: ListId) -> Vec<u8> {
    let mut key = Vec::with_capacity(LIST_KEY_PREFIX_LEN);
    key.extend_from_slice(&index_id.to_be_bytes());
    key.extend_from_slice(&list_id.as_u64().to_be_bytes());
    key
}

/// Encode an inverted list key.
///
/// Key format: `[index_id][list_id][pk_suffix]`
#[must_use]
pub fn encode_list_key(index_id: IndexId, list_id: ListId, pk_suffix: &[u8]) -> Vec<u8> {
    let mut key = encode_list_prefix(index_id, list_id);
    key.extend_from_slice(pk_suffix);
    key
}

/// Encode the key of a raw row stored directly under an index.
///
/// Key format: `[index_id][pk_suffix]`
#[must_use]
pub fn encode_row_key(index_id: IndexId, pk_suffix: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(IndexId::ENCODED_LEN + pk_suffix.len());
    key.extend_from_slice(&index_id.to_be_bytes());
    key.extend_from_slice(pk_suffix);
    key
}

/// Strip the primary key's own index-id prefix.
///
/// # Errors
///
/// Returns [`VectorError::InvalidArgument`] if nothing follows the prefix.
pub fn pk_suffix(pk: &[u8]) -> Result<&[u8]> {
    match pk.get(IndexId::ENCODED_LEN..) {
        Some(suffix) if !suffix.is_empty() => Ok(suffix),
        _ => Err(VectorError::InvalidArgument(format!(
            "primary key of {} bytes has no key parts after its index id",
            pk.len()
        ))),
    }
}

/// A decoded inverted list key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListKey<'a> {
    /// Owning index.
    pub index_id: IndexId,
    /// Owning list.
    pub list_id: ListId,
    /// Primary key suffix; never empty.
    pub pk_suffix: &'a [u8],
}

/// Decode a list key and check it belongs to the expected list.
///
/// # Errors
///
/// Returns [`VectorError::CorruptData`] if the key is short, carries another
/// index or list id, or has an empty primary key.
pub fn decode_list_key(key: &[u8], index_id: IndexId, list_id: ListId) -> Result<ListKey<'_>> {
    let mut reader = ByteReader::new(key);
    let found_index = IndexId::new(reader.read_u32_be()?);
    if found_index != index_id {
        return Err(VectorError::CorruptData(format!(
            "key of index {found_index} found while scanning index {index_id}"
        )));
    }
    let found_list = ListId::new(reader.read_u64_be()?);
    if found_list != list_id {
        return Err(VectorError::CorruptData(format!(
            "key of list {found_list} found while scanning list {list_id} of index {index_id}"
        )));
    }
    let pk_suffix = reader.rest();
    if pk_suffix.is_empty() {
        return Err(VectorError::CorruptData(format!(
            "empty primary key in index {index_id}, list {list_id}"
        )));
    }
    Ok(ListKey { index_id, list_id, pk_suffix })
}

/// The key range of one list: `[prefix(list), prefix(list + 1))`.
#[must_use]
pub fn list_range(index_id: IndexId, list_id: ListId) -> KeyRange {
    let start = encode_list_prefix(index_id, list_id);
    if list_id.as_u64() == u64::MAX {
        return KeyRange { start, end: index_range(index_id).end };
    }
    KeyRange { start, end: Some(encode_list_prefix(index_id, list_id.successor())) }
}

/// The key range holding every key of an index.
#[must_use]
pub fn index_range(index_id: IndexId) -> KeyRange {
    let start = index_id.to_be_bytes().to_vec();
    let end = index_id.as_u32().checked_add(1).map(|next| next.to_be_bytes().to_vec());
    KeyRange { start, end }
}
