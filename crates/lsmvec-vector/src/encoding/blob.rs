//! Binary JSON array codec for stored vectors.
//!
//! Vector columns hold a binary JSON array:
//!
//! ```text
//! [type: 0x02 small | 0x03 large][count][size][entry]*[out-of-line values]
//! entry = [element tag: 1 byte][inline value or offset]
//! ```
//!
//! `count`, `size` and each entry's payload are 2 bytes (small) or 4 bytes
//! (large), little-endian. Offsets are relative to the byte after the type
//! byte. Literals and 16-bit integers are always inlined; 32-bit integers are
//! inlined only in the large format.

use lsmvec_core::ByteReader;

use crate::error::{Result, VectorError};

/// Type byte of a small-format array.
pub const SMALL_ARRAY: u8 = 0x02;
/// Type byte of a large-format array.
pub const LARGE_ARRAY: u8 = 0x03;

/// Element type tags.
pub mod tag {
    /// `null`, `true` or `false`.
    pub const LITERAL: u8 = 0x04;
    /// Signed 16-bit integer.
    pub const INT16: u8 = 0x05;
    /// Unsigned 16-bit integer.
    pub const UINT16: u8 = 0x06;
    /// Signed 32-bit integer.
    pub const INT32: u8 = 0x07;
    /// Unsigned 32-bit integer.
    pub const UINT32: u8 = 0x08;
    /// Signed 64-bit integer.
    pub const INT64: u8 = 0x09;
    /// Unsigned 64-bit integer.
    pub const UINT64: u8 = 0x0A;
    /// IEEE-754 double.
    pub const DOUBLE: u8 = 0x0B;
    /// UTF-8 string with a varint length.
    pub const STRING: u8 = 0x0C;
}

const LITERAL_NULL: u8 = 0x00;
const LITERAL_TRUE: u8 = 0x01;
const LITERAL_FALSE: u8 = 0x02;

/// Offset width variant of an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobFormat {
    /// 2-byte counts and offsets.
    Small,
    /// 4-byte counts and offsets.
    Large,
}

impl BlobFormat {
    const fn offset_size(self) -> usize {
        match self {
            Self::Small => 2,
            Self::Large => 4,
        }
    }

    const fn type_byte(self) -> u8 {
        match self {
            Self::Small => SMALL_ARRAY,
            Self::Large => LARGE_ARRAY,
        }
    }

    const fn inlines(self, element_tag: u8) -> bool {
        match element_tag {
            tag::LITERAL | tag::INT16 | tag::UINT16 => true,
            tag::INT32 | tag::UINT32 => matches!(self, Self::Large),
            _ => false,
        }
    }
}

/// One decoded array element.
#[derive(Debug, Clone, PartialEq)]
pub enum BlobValue {
    /// JSON `null`.
    Null,
    /// JSON boolean.
    Bool(bool),
    /// 16-bit signed integer.
    Int16(i16),
    /// 16-bit unsigned integer.
    UInt16(u16),
    /// 32-bit signed integer.
    Int32(i32),
    /// 32-bit unsigned integer.
    UInt32(u32),
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit unsigned integer.
    UInt64(u64),
    /// Double-precision float.
    Double(f64),
    /// UTF-8 string.
    String(String),
}

impl BlobValue {
    const fn tag(&self) -> u8 {
        match self {
            Self::Null | Self::Bool(_) => tag::LITERAL,
            Self::Int16(_) => tag::INT16,
            Self::UInt16(_) => tag::UINT16,
            Self::Int32(_) => tag::INT32,
            Self::UInt32(_) => tag::UINT32,
            Self::Int64(_) => tag::INT64,
            Self::UInt64(_) => tag::UINT64,
            Self::Double(_) => tag::DOUBLE,
            Self::String(_) => tag::STRING,
        }
    }

    /// Numeric view for vector contexts. Literals map to 1 (true) or 0.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn as_f32(&self) -> Result<f32> {
        Ok(match self {
            Self::Null | Self::Bool(false) => 0.0,
            Self::Bool(true) => 1.0,
            Self::Int16(v) => f32::from(*v),
            Self::UInt16(v) => f32::from(*v),
            Self::Int32(v) => *v as f32,
            Self::UInt32(v) => *v as f32,
            Self::Int64(v) => *v as f32,
            Self::UInt64(v) => *v as f32,
            Self::Double(v) => *v as f32,
            Self::String(_) => {
                return Err(VectorError::CorruptData(
                    "string element in a numeric vector".to_string(),
                ))
            }
        })
    }
}

/// Decode a binary JSON array into its elements.
///
/// # Errors
///
/// Returns [`VectorError::CorruptData`] for a non-array type byte, an unknown
/// element tag, an invalid literal, or any offset or length that points past
/// the buffer.
pub fn decode_elements(blob: &[u8]) -> Result<Vec<BlobValue>> {
    let mut header = ByteReader::new(blob);
    let format = match header.read_u8()? {
        SMALL_ARRAY => BlobFormat::Small,
        LARGE_ARRAY => BlobFormat::Large,
        other => {
            return Err(VectorError::CorruptData(format!("type byte {other:#04x} is not an array")))
        }
    };
    let width = format.offset_size();
    let count = header.read_uint(width)?;
    // The declared total size is not needed to locate elements.
    header.skip(width)?;

    let count = usize::try_from(count)
        .map_err(|_| VectorError::CorruptData(format!("element count {count} does not fit")))?;
    let entry_size = 1 + width;
    if count.saturating_mul(entry_size) > header.remaining() {
        return Err(VectorError::CorruptData(format!(
            "{count} entries do not fit in {} bytes",
            header.remaining()
        )));
    }

    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let element_tag = header.read_u8()?;
        let payload = header.read_uint(width)?;
        out.push(decode_element(blob, format, element_tag, payload)?);
    }
    Ok(out)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn decode_element(
    blob: &[u8],
    format: BlobFormat,
    element_tag: u8,
    payload: u64,
) -> Result<BlobValue> {
    if format.inlines(element_tag) {
        return Ok(match element_tag {
            tag::LITERAL => match payload as u8 {
                LITERAL_NULL => BlobValue::Null,
                LITERAL_TRUE => BlobValue::Bool(true),
                LITERAL_FALSE => BlobValue::Bool(false),
                other => {
                    return Err(VectorError::CorruptData(format!("invalid literal {other:#04x}")))
                }
            },
            tag::INT16 => BlobValue::Int16(payload as u16 as i16),
            tag::UINT16 => BlobValue::UInt16(payload as u16),
            tag::INT32 => BlobValue::Int32(payload as u32 as i32),
            _ => BlobValue::UInt32(payload as u32),
        });
    }

    // Offsets count from the byte after the type byte.
    let offset = usize::try_from(payload)
        .ok()
        .and_then(|o| o.checked_add(1))
        .filter(|&o| o < blob.len())
        .ok_or_else(|| VectorError::CorruptData(format!("value offset {payload} out of bounds")))?;
    let mut value = ByteReader::new(blob);
    value.seek(offset)?;

    Ok(match element_tag {
        tag::INT32 => BlobValue::Int32(value.read_i32()?),
        tag::UINT32 => BlobValue::UInt32(value.read_u32()?),
        tag::INT64 => BlobValue::Int64(value.read_i64()?),
        tag::UINT64 => BlobValue::UInt64(value.read_u64()?),
        tag::DOUBLE => BlobValue::Double(value.read_f64()?),
        tag::STRING => {
            let len = read_varint(&mut value)?;
            let bytes = value.take(len)?;
            let s = std::str::from_utf8(bytes)
                .map_err(|e| VectorError::CorruptData(format!("string element: {e}")))?;
            BlobValue::String(s.to_string())
        }
        other => return Err(VectorError::CorruptData(format!("unknown element tag {other:#04x}"))),
    })
}

/// Read a string length: 7 bits per byte, high bit set on all but the last, at most 5 bytes.
fn read_varint(reader: &mut ByteReader<'_>) -> Result<usize> {
    let mut len: u64 = 0;
    for i in 0..5 {
        let byte = reader.read_u8()?;
        len |= u64::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return usize::try_from(len)
                .map_err(|_| VectorError::CorruptData(format!("string length {len} does not fit")));
        }
    }
    Err(VectorError::CorruptData("string length varint longer than 5 bytes".to_string()))
}

/// Decode a binary JSON array into a dense float vector.
///
/// # Errors
///
/// Returns [`VectorError::CorruptData`] if the blob is malformed or contains
/// a string element.
pub fn decode_vector(blob: &[u8]) -> Result<Vec<f32>> {
    decode_elements(blob)?.iter().map(BlobValue::as_f32).collect()
}

/// Encode elements as a binary JSON array.
///
/// # Errors
///
/// Returns [`VectorError::InvalidArgument`] if the array is too large for
/// the requested format.
pub fn encode_elements(values: &[BlobValue], format: BlobFormat) -> Result<Vec<u8>> {
    let width = format.offset_size();
    let limit = if width == 2 { u64::from(u16::MAX) } else { u64::from(u32::MAX) };
    let too_large = || VectorError::InvalidArgument("array too large for blob format".to_string());

    let header_len = 2 * width;
    let entries_len = values.len() * (1 + width);
    let mut entries = Vec::with_capacity(entries_len);
    let mut tail = Vec::new();

    for value in values {
        let element_tag = value.tag();
        entries.push(element_tag);
        let payload: u64 = if format.inlines(element_tag) {
            match value {
                BlobValue::Null => u64::from(LITERAL_NULL),
                BlobValue::Bool(true) => u64::from(LITERAL_TRUE),
                BlobValue::Bool(false) => u64::from(LITERAL_FALSE),
                BlobValue::Int16(v) => u64::from(u16::from_le_bytes(v.to_le_bytes())),
                BlobValue::UInt16(v) => u64::from(*v),
                BlobValue::Int32(v) => u64::from(u32::from_le_bytes(v.to_le_bytes())),
                BlobValue::UInt32(v) => u64::from(*v),
                _ => return Err(too_large()),
            }
        } else {
            let offset = (header_len + entries_len + tail.len()) as u64;
            match value {
                BlobValue::Int32(v) => tail.extend_from_slice(&v.to_le_bytes()),
                BlobValue::UInt32(v) => tail.extend_from_slice(&v.to_le_bytes()),
                BlobValue::Int64(v) => tail.extend_from_slice(&v.to_le_bytes()),
                BlobValue::UInt64(v) => tail.extend_from_slice(&v.to_le_bytes()),
                BlobValue::Double(v) => tail.extend_from_slice(&v.to_le_bytes()),
                BlobValue::String(s) => {
                    let mut len = s.len();
                    loop {
                        #[allow(clippy::cast_possible_truncation)]
                        let byte = (len & 0x7F) as u8;
                        len >>= 7;
                        if len == 0 {
                            tail.push(byte);
                            break;
                        }
                        tail.push(byte | 0x80);
                    }
                    tail.extend_from_slice(s.as_bytes());
                }
                _ => return Err(too_large()),
            }
            offset
        };
        if payload > limit {
            return Err(too_large());
        }
        entries.extend_from_slice(&payload.to_le_bytes()[..width]);
    }

    let count = values.len() as u64;
    let size = (header_len + entries_len + tail.len()) as u64;
    if count > limit || size > limit {
        return Err(too_large());
    }

    let mut out = Vec::with_capacity(1 + size as usize);
    out.push(format.type_byte());
    out.extend_from_slice(&count.to_le_bytes()[..width]);
    out.extend_from_slice(&size.to_le_bytes()[..width]);
    out.extend_from_slice(&entries);
    out.extend_from_slice(&tail);
    Ok(out)
}

/// Encode a float vector as an array of doubles, small format when it fits.
///
/// # Errors
///
/// Returns [`VectorError::InvalidArgument`] if the vector does not fit the
/// large format either.
pub fn encode_vector(vector: &[f32]) -> Result<Vec<u8>> {
    let values: Vec<BlobValue> = vector.iter().map(|&v| BlobValue::Double(f64::from(v))).collect();
    match encode_elements(&values, BlobFormat::Small) {
        Err(VectorError::InvalidArgument(_)) => encode_elements(&values, BlobFormat::Large),
        other => other,
    }
}
