//! Byte encodings owned by the vector index.
//!
//! # Inverted list keys
//!
//! `[index_id: 4 bytes BE][list_id: 8 bytes BE][primary key suffix]`
//!
//! Big-endian ids keep every `(index_id, list_id)` pair contiguous in key
//! order, so one list is one half-open range scan.
//!
//! # Inverted list values
//!
//! `[unpack tag + header][vector codes][auxiliary column bytes]`, or exactly
//! the codes for values written without auxiliary columns.
//!
//! # Vector blobs
//!
//! Row columns holding vectors use the binary JSON array format decoded by
//! [`blob`].

pub mod blob;
mod list_keys;
mod list_value;

pub use blob::{decode_vector, encode_vector, BlobFormat, BlobValue};
pub use list_keys::{
    decode_list_key, encode_list_key, encode_list_prefix, encode_row_key, index_range,
    list_range, pk_suffix, KeyRange, ListKey, LIST_KEY_PREFIX_LEN,
};
pub use list_value::{
    encode_list_value, split_list_value, ListValue, UNPACK_COVERED_TAG, UNPACK_DATA_TAG,
};
