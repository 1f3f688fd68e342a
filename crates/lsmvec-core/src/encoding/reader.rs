//! A bounds-checked cursor over an immutable byte slice.

use crate::error::CoreError;

/// Forward reader over a borrowed buffer.
///
/// All reads check the remaining length before touching the buffer. Integers
/// are little-endian unless the method name says otherwise.
#[derive(Debug, Clone, Copy)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Create a reader positioned at the start of `buf`.
    #[must_use]
    pub const fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current offset from the start of the buffer.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Number of unread bytes.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Whether every byte has been consumed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// The unread tail of the buffer.
    #[must_use]
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    /// Move to an absolute offset. Seeking to `len()` is allowed.
    pub fn seek(&mut self, offset: usize) -> Result<(), CoreError> {
        if offset > self.buf.len() {
            return Err(CoreError::CorruptData(format!(
                "offset {offset} is past the end of a {}-byte buffer",
                self.buf.len()
            )));
        }
        self.pos = offset;
        Ok(())
    }

    /// Borrow the next `n` bytes and advance past them.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], CoreError> {
        if self.remaining() < n {
            return Err(CoreError::truncated("read", self.pos, n, self.remaining()));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Advance past `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<(), CoreError> {
        self.take(n).map(|_| ())
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], CoreError> {
        let bytes = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Read one byte.
    pub fn read_u8(&mut self) -> Result<u8, CoreError> {
        Ok(self.take_array::<1>()?[0])
    }

    /// Read a little-endian `u16`.
    pub fn read_u16(&mut self) -> Result<u16, CoreError> {
        self.take_array().map(u16::from_le_bytes)
    }

    /// Read a little-endian `i16`.
    pub fn read_i16(&mut self) -> Result<i16, CoreError> {
        self.take_array().map(i16::from_le_bytes)
    }

    /// Read a little-endian `u32`.
    pub fn read_u32(&mut self) -> Result<u32, CoreError> {
        self.take_array().map(u32::from_le_bytes)
    }

    /// Read a little-endian `i32`.
    pub fn read_i32(&mut self) -> Result<i32, CoreError> {
        self.take_array().map(i32::from_le_bytes)
    }

    /// Read a little-endian `u64`.
    pub fn read_u64(&mut self) -> Result<u64, CoreError> {
        self.take_array().map(u64::from_le_bytes)
    }

    /// Read a little-endian `i64`.
    pub fn read_i64(&mut self) -> Result<i64, CoreError> {
        self.take_array().map(i64::from_le_bytes)
    }

    /// Read a little-endian `f32`.
    pub fn read_f32(&mut self) -> Result<f32, CoreError> {
        self.take_array().map(f32::from_le_bytes)
    }

    /// Read a little-endian `f64`.
    pub fn read_f64(&mut self) -> Result<f64, CoreError> {
        self.take_array().map(f64::from_le_bytes)
    }

    /// Read a big-endian `u32`.
    pub fn read_u32_be(&mut self) -> Result<u32, CoreError> {
        self.take_array().map(u32::from_be_bytes)
    }

    /// Read a big-endian `u64`.
    pub fn read_u64_be(&mut self) -> Result<u64, CoreError> {
        self.take_array().map(u64::from_be_bytes)
    }

    /// Read an unsigned little-endian integer of `width` bytes (1 to 8).
    pub fn read_uint(&mut self, width: usize) -> Result<u64, CoreError> {
        if width == 0 || width > 8 {
            return Err(CoreError::CorruptData(format!("unsupported integer width {width}")));
        }
        let bytes = self.take(width)?;
        let mut out = [0u8; 8];
        out[..width].copy_from_slice(bytes);
        Ok(u64::from_le_bytes(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_values() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&0x1234u16.to_le_bytes());
        buf.extend_from_slice(&(-5i32).to_le_bytes());
        buf.extend_from_slice(&2.5f64.to_le_bytes());

        let mut r = ByteReader::new(&buf);
        assert_eq!(r.read_u16().unwrap(), 0x1234);
        assert_eq!(r.read_i32().unwrap(), -5);
        assert!((r.read_f64().unwrap() - 2.5).abs() < f64::EPSILON);
        assert!(r.is_empty());
    }

    #[test]
    fn short_read_is_corrupt_and_does_not_advance() {
        let buf = [1u8, 2, 3];
        let mut r = ByteReader::new(&buf);
        r.skip(1).unwrap();
        assert!(matches!(r.read_u32(), Err(CoreError::CorruptData(_))));
        assert_eq!(r.position(), 1);
        assert_eq!(r.read_u16().unwrap(), u16::from_le_bytes([2, 3]));
    }

    #[test]
    fn variable_width_integers() {
        let buf = [0x01, 0x02, 0x03];
        assert_eq!(ByteReader::new(&buf).read_uint(1).unwrap(), 1);
        assert_eq!(ByteReader::new(&buf).read_uint(3).unwrap(), 0x03_0201);
        assert!(ByteReader::new(&buf).read_uint(4).is_err());
        assert!(ByteReader::new(&buf).read_uint(0).is_err());
    }

    #[test]
    fn seek_bounds() {
        let buf = [0u8; 4];
        let mut r = ByteReader::new(&buf);
        r.seek(4).unwrap();
        assert!(r.is_empty());
        assert!(r.seek(5).is_err());
    }

    #[test]
    fn big_endian_reads() {
        let buf = [0, 0, 0, 9, 0, 0, 0, 0, 0, 0, 0, 3];
        let mut r = ByteReader::new(&buf);
        assert_eq!(r.read_u32_be().unwrap(), 9);
        assert_eq!(r.read_u64_be().unwrap(), 3);
    }
}
