//! Inverted list value encoding.
//!
//! Values written with auxiliary columns start with an unpack tag whose
//! header precedes the codes; the auxiliary bytes follow the codes. Values
//! written without them hold exactly `code_size` bytes of codes.

use crate::error::{Result, VectorError};

/// Unpack tag of a value carrying auxiliary column data. Header: tag + 2-byte length.
pub const UNPACK_DATA_TAG: u8 = 0x02;
/// Unpack tag of a value carrying auxiliary data and a covered bitmap. Header: 5 bytes.
pub const UNPACK_COVERED_TAG: u8 = 0x03;

const DATA_HEADER_LEN: usize = 3;
const COVERED_HEADER_LEN: usize = 5;

const fn header_len(tag: u8) -> Option<usize> {
    match tag {
        UNPACK_DATA_TAG => Some(DATA_HEADER_LEN),
        UNPACK_COVERED_TAG => Some(COVERED_HEADER_LEN),
        _ => None,
    }
}

/// A list value split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListValue<'a> {
    /// Exactly `code_size` bytes.
    pub codes: &'a [u8],
    /// Unpack header followed by the auxiliary bytes, or `None` for legacy values.
    aux: Option<(&'a [u8], &'a [u8])>,
}

impl<'a> ListValue<'a> {
    /// Whether the value was written without auxiliary columns.
    #[must_use]
    pub const fn is_legacy(&self) -> bool {
        self.aux.is_none()
    }

    /// The packed auxiliary columns, without the unpack header.
    #[must_use]
    pub fn aux(&self) -> Option<&'a [u8]> {
        self.aux.map(|(_, aux)| aux)
    }

    /// The value with the codes cut out: unpack header then auxiliary bytes.
    #[must_use]
    pub fn without_codes(&self) -> Vec<u8> {
        match self.aux {
            Some((header, aux)) => {
                let mut out = Vec::with_capacity(header.len() + aux.len());
                out.extend_from_slice(header);
                out.extend_from_slice(aux);
                out
            }
            None => Vec::new(),
        }
    }
}

/// Split a stored value into codes and auxiliary bytes.
///
/// # Errors
///
/// Returns [`VectorError::CorruptData`] if the value is shorter than
/// `code_size`, or longer without a known unpack tag and a complete header.
pub fn split_list_value(value: &[u8], code_size: usize) -> Result<ListValue<'_>> {
    let Some(extra) = value.len().checked_sub(code_size) else {
        return Err(VectorError::CorruptData(format!(
            "value of {} bytes is shorter than the {code_size}-byte code",
            value.len()
        )));
    };
    if extra == 0 {
        return Ok(ListValue { codes: value, aux: None });
    }

    let tag = value[0];
    let header = header_len(tag)
        .ok_or_else(|| VectorError::CorruptData(format!("invalid unpack tag {tag:#04x}")))?;
    if extra < header {
        return Err(VectorError::CorruptData(format!(
            "value has {extra} bytes beyond its code, unpack header needs {header}"
        )));
    }
    let codes = &value[header..header + code_size];
    Ok(ListValue { codes, aux: Some((&value[..header], &value[header + code_size..])) })
}

/// Build a stored value from codes and optional auxiliary column bytes.
///
/// # Errors
///
/// Returns [`VectorError::InvalidArgument`] if the auxiliary data does not
/// fit the 2-byte header length.
pub fn encode_list_value(codes: &[u8], aux: Option<&[u8]>) -> Result<Vec<u8>> {
    let Some(aux) = aux else {
        return Ok(codes.to_vec());
    };
    let unpack_len = u16::try_from(DATA_HEADER_LEN + aux.len()).map_err(|_| {
        VectorError::InvalidArgument(format!("{} auxiliary bytes do not fit a value", aux.len()))
    })?;
    let mut value = Vec::with_capacity(DATA_HEADER_LEN + codes.len() + aux.len());
    value.push(UNPACK_DATA_TAG);
    value.extend_from_slice(&unpack_len.to_le_bytes());
    value.extend_from_slice(codes);
    value.extend_from_slice(aux);
    Ok(value)
}
