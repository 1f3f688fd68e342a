//! Packed row value decoding.
//!
//! A stored row value is laid out as
//!
//! ```text
//! [ttl: 8 bytes, optional][null bitmap: null_bytes_length][field 0][field 1]...
//! ```
//!
//! Null fields occupy no bytes. Variable-width fields carry a little-endian
//! length prefix; fixed-width fields occupy exactly their pack length.
//! [`decode_fields`] walks the fields in storage order and stops once the
//! highest requested field has been read.

use serde::{Deserialize, Serialize};

use super::reader::ByteReader;
use crate::error::CoreError;

/// Width of the time-to-live prefix on tables that carry one.
pub const TTL_PREFIX_LEN: usize = 8;

/// Storage class of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    /// Fixed-width field occupying `pack_length` bytes.
    Fixed {
        /// Stored width in bytes.
        pack_length: usize,
    },
    /// Variable-width character field with a 1- or 2-byte length prefix.
    VarChar {
        /// Width of the length prefix.
        length_bytes: u8,
    },
    /// Blob, JSON or geometry field with a 1- to 4-byte length prefix.
    Blob {
        /// Width of the length prefix.
        length_bytes: u8,
    },
}

/// Description of one field in storage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    /// Storage class.
    pub kind: FieldKind,
    /// Whether the null bitmap is consulted for this field.
    #[serde(default)]
    pub nullable: bool,
}

impl FieldInfo {
    /// A non-nullable fixed-width field.
    #[must_use]
    pub const fn fixed(pack_length: usize) -> Self {
        Self { kind: FieldKind::Fixed { pack_length }, nullable: false }
    }

    /// A non-nullable varchar field.
    #[must_use]
    pub const fn varchar(length_bytes: u8) -> Self {
        Self { kind: FieldKind::VarChar { length_bytes }, nullable: false }
    }

    /// A non-nullable blob, JSON or geometry field.
    #[must_use]
    pub const fn blob(length_bytes: u8) -> Self {
        Self { kind: FieldKind::Blob { length_bytes }, nullable: false }
    }

    /// Mark the field as nullable.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// Field layout of a table's stored row values.
///
/// Supplied by the host; never mutated by the index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableLayout {
    /// Whether values start with an 8-byte time-to-live record.
    #[serde(default)]
    pub has_ttl: bool,
    /// Length of the null bitmap in bytes.
    #[serde(default)]
    pub null_bytes_length: usize,
    /// Fields in storage order.
    pub fields: Vec<FieldInfo>,
}

impl TableLayout {
    /// Create a layout with no TTL prefix and no null bitmap.
    #[must_use]
    pub fn new(fields: Vec<FieldInfo>) -> Self {
        Self { has_ttl: false, null_bytes_length: 0, fields }
    }

    /// Set whether values carry a TTL prefix.
    #[must_use]
    pub const fn with_ttl(mut self, has_ttl: bool) -> Self {
        self.has_ttl = has_ttl;
        self
    }

    /// Set the null bitmap length.
    #[must_use]
    pub const fn with_null_bytes(mut self, len: usize) -> Self {
        self.null_bytes_length = len;
        self
    }

    /// Number of fields.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Check prefix widths and that the null bitmap covers every nullable field.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidLayout`] describing the first problem found.
    pub fn validate(&self) -> Result<(), CoreError> {
        for (i, field) in self.fields.iter().enumerate() {
            match field.kind {
                FieldKind::VarChar { length_bytes } if !(1..=2).contains(&length_bytes) => {
                    return Err(CoreError::InvalidLayout(format!(
                        "field {i}: varchar length prefix must be 1 or 2 bytes, got {length_bytes}"
                    )));
                }
                FieldKind::Blob { length_bytes } if !(1..=4).contains(&length_bytes) => {
                    return Err(CoreError::InvalidLayout(format!(
                        "field {i}: blob length prefix must be 1 to 4 bytes, got {length_bytes}"
                    )));
                }
                _ => {}
            }
            if field.nullable && i / 8 >= self.null_bytes_length {
                return Err(CoreError::InvalidLayout(format!(
                    "field {i} is nullable but the null bitmap has {} bytes",
                    self.null_bytes_length
                )));
            }
        }
        Ok(())
    }
}

/// Decode the requested fields of a packed row value.
///
/// Returns one slice per entry of `field_indices`, in the same order. A null
/// field yields an empty slice. An empty `field_indices` returns an empty
/// vector without reading the value.
///
/// # Errors
///
/// Returns [`CoreError::CorruptData`] when a requested index is not in the
/// layout, or when a prefix, bitmap, or field body would read past the end of
/// `raw`.
pub fn decode_fields<'a>(
    layout: &TableLayout,
    raw: &'a [u8],
    field_indices: &[usize],
) -> Result<Vec<&'a [u8]>, CoreError> {
    let Some(&max_index) = field_indices.iter().max() else {
        return Ok(Vec::new());
    };
    if max_index >= layout.fields.len() {
        return Err(CoreError::CorruptData(format!(
            "field index {max_index} out of range for {} fields",
            layout.fields.len()
        )));
    }

    let mut reader = ByteReader::new(raw);
    if layout.has_ttl {
        reader.skip(TTL_PREFIX_LEN)?;
    }
    let null_bytes = if layout.null_bytes_length > 0 {
        Some(reader.take(layout.null_bytes_length)?)
    } else {
        None
    };

    let empty: &'a [u8] = &[];
    let mut out = vec![empty; field_indices.len()];

    for (i, field) in layout.fields[..=max_index].iter().enumerate() {
        if field.nullable {
            if let Some(bitmap) = null_bytes {
                let byte = bitmap.get(i / 8).ok_or_else(|| {
                    CoreError::CorruptData(format!("null bitmap too short for field {i}"))
                })?;
                if byte & (1 << (i % 8)) != 0 {
                    continue;
                }
            }
        }

        let body = match field.kind {
            FieldKind::VarChar { length_bytes } | FieldKind::Blob { length_bytes } => {
                let len = reader.read_uint(usize::from(length_bytes))?;
                let len = usize::try_from(len).map_err(|_| {
                    CoreError::CorruptData(format!("field {i}: length {len} does not fit"))
                })?;
                reader.take(len)?
            }
            FieldKind::Fixed { pack_length } => reader.take(pack_length)?,
        };

        for (slot, &wanted) in out.iter_mut().zip(field_indices) {
            if wanted == i {
                *slot = body;
            }
        }
    }

    Ok(out)
}
