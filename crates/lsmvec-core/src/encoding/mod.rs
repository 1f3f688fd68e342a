//! Byte-level decoding.
//!
//! Every multi-byte read goes through [`ByteReader`], which checks the
//! remaining length first and reports [`CoreError::CorruptData`](crate::CoreError)
//! instead of reading past the buffer.

mod reader;
mod row;


pub use reader::ByteReader;
pub use row::{decode_fields, FieldInfo, FieldKind, TableLayout, TTL_PREFIX_LEN};
