//! Bounds-checked little-endian reads over a byte slice.
//!
//! All DWARF and container parsing goes through `Cursor` so that every read
//! past the end of a section turns into a descriptive `Error::Truncated`
//! carrying the section name and offset, never a panic.

use crate::error::{Error, Result};

pub(crate) struct Cursor<'input> {
    data: &'input [u8],
    pos: usize,
    section: &'static str,
}

impl<'input> Cursor<'input> {
    pub(crate) fn new(data: &'input [u8], section: &'static str) -> Self {
        Cursor { data, pos: 0, section }
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn take(&mut self, len: usize, what: &'static str) -> Result<&'input [u8]> {
        let bytes = self
            .data
            .get(self.pos..)
            .and_then(|rest| rest.get(..len))
            .ok_or(Error::Truncated { section: self.section, offset: self.pos, what })?;
        self.pos += len;
        Ok(bytes)
    }

    pub(crate) fn skip(&mut self, len: usize, what: &'static str) -> Result<()> {
        self.take(len, what).map(|_| ())
    }

    pub(crate) fn u8(&mut self, what: &'static str) -> Result<u8> {
        Ok(self.take(1, what)?[0])
    }

    pub(crate) fn u16(&mut self, what: &'static str) -> Result<u16> {
        let bytes = self.take(2, what)?;
        Ok(u16::from_le_bytes(bytes.try_into().expect("take returned 2 bytes")))
    }

    pub(crate) fn u32(&mut self, what: &'static str) -> Result<u32> {
        let bytes = self.take(4, what)?;
        Ok(u32::from_le_bytes(bytes.try_into().expect("take returned 4 bytes")))
    }

    pub(crate) fn u64(&mut self, what: &'static str) -> Result<u64> {
        let bytes = self.take(8, what)?;
        Ok(u64::from_le_bytes(bytes.try_into().expect("take returned 8 bytes")))
    }

    /// Read a fixed-width little-endian unsigned value of 1 to 8 bytes.
    pub(crate) fn uint(&mut self, len: usize, what: &'static str) -> Result<u64> {
        debug_assert!(len >= 1 && len <= 8);
        let bytes = self.take(len, what)?;
        let mut value = 0u64;
        for (i, byte) in bytes.iter().enumerate() {
            value |= u64::from(*byte) << (8 * i);
        }
        Ok(value)
    }

    /// Advance past a null-terminated string, returning its bytes without the
    /// terminator.
    pub(crate) fn cstr(&mut self, what: &'static str) -> Result<&'input [u8]> {
        let rest = &self.data[self.pos.min(self.data.len())..];
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(Error::Truncated { section: self.section, offset: self.pos, what })?;
        let bytes = &rest[..len];
        self.pos += len + 1;
        Ok(bytes)
    }

    /// Unsigned LEB128. Decoding mirrors `leb128::unsigned` bit-for-bit.
    pub(crate) fn uleb128(&mut self, what: &'static str) -> Result<u64> {
        let start = self.pos;
        let mut value = 0u64;
        let mut shift = 0u32;
        loop {
            let byte = self.u8(what)?;
            if shift == 63 && byte > 1 {
                return Err(Error::Leb128Overflow(self.section, start));
            }
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
            if shift >= 64 {
                return Err(Error::Leb128Overflow(self.section, start));
            }
        }
    }

    /// Signed LEB128. Decoding mirrors `leb128::signed` bit-for-bit.
    pub(crate) fn sleb128(&mut self, what: &'static str) -> Result<i64> {
        let start = self.pos;
        let mut value = 0i64;
        let mut shift = 0u32;
        loop {
            let byte = self.u8(what)?;
            value |= i64::from(byte & 0x7f) << shift;
            shift += 7;
            if byte & 0x80 == 0 {
                if shift < 64 && byte & 0x40 != 0 {
                    value |= -1i64 << shift;
                }
                return Ok(value);
            }
            if shift >= 64 {
                return Err(Error::Leb128Overflow(self.section, start));
            }
        }
    }
}
