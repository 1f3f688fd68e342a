//! Identifiers for indexes and inverted lists.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of one secondary index.
///
/// Every key the index owns starts with the big-endian encoding of this id,
/// so all entries of an index form one contiguous key range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndexId(u32);

impl IndexId {
    /// Width of the encoded id in bytes.
    pub const ENCODED_LEN: usize = 4;

    /// Create a new `IndexId` from a raw u32 value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw u32 value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Encode as big-endian bytes.
    #[must_use]
    pub const fn to_be_bytes(self) -> [u8; Self::ENCODED_LEN] {
        self.0.to_be_bytes()
    }
}

impl From<u32> for IndexId {
    fn from(id: u32) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for IndexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one inverted list inside an index, in `[0, nlist)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListId(u64);

impl ListId {
    /// Width of the encoded id in bytes.
    pub const ENCODED_LEN: usize = 8;

    /// Create a new `ListId` from a raw u64 value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw u64 value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// The list id as an array index.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// The next list id, used as the exclusive upper bound of a list scan.
    #[must_use]
    pub const fn successor(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl From<u64> for ListId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
