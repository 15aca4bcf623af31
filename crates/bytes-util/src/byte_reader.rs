use byteorder::{BigEndian, ByteOrder};

use crate::error::{ReadError, Result};
use crate::vlc::MULTI_BYTE_MAX_BYTES;

/// A forward-only cursor over a big-endian byte stream.
///
/// All reads are bounds-checked before the offset moves; a failed read
/// leaves the cursor where it was. The offset arithmetic is checked so a
/// pathological seek amount cannot wrap past the end of the slice.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a reader over `data`. An empty slice is rejected, matching
    /// the bitstream rule that every parsable unit is at least one byte.
    pub const fn new(data: &'a [u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(ReadError::EmptyStream);
        }

        Ok(Self { data, offset: 0 })
    }

    /// Validates that advancing by `amount` bytes stays inside the stream.
    fn check(&self, amount: usize) -> Result<()> {
        let in_bounds = match self.offset.checked_add(amount) {
            Some(proposed) => proposed <= self.data.len(),
            None => false,
        };

        if !in_bounds {
            return Err(ReadError::OutOfBounds {
                offset: self.offset,
                requested: amount,
                size: self.data.len(),
            });
        }

        Ok(())
    }

    /// Reads a single byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        self.check(1)?;
        let value = self.data[self.offset];
        self.offset += 1;
        Ok(value)
    }

    /// Reads a big-endian `u16`.
    pub fn read_u16(&mut self) -> Result<u16> {
        self.check(2)?;
        let value = BigEndian::read_u16(&self.data[self.offset..]);
        self.offset += 2;
        Ok(value)
    }

    /// Reads a big-endian `u32`.
    pub fn read_u32(&mut self) -> Result<u32> {
        self.check(4)?;
        let value = BigEndian::read_u32(&self.data[self.offset..]);
        self.offset += 4;
        Ok(value)
    }

    /// Reads a big-endian `u64`.
    pub fn read_u64(&mut self) -> Result<u64> {
        self.check(8)?;
        let value = BigEndian::read_u64(&self.data[self.offset..]);
        self.offset += 8;
        Ok(value)
    }

    /// Reads `count` raw bytes.
    pub fn read_n(&mut self, count: usize) -> Result<&'a [u8]> {
        self.check(count)?;
        let bytes = &self.data[self.offset..self.offset + count];
        self.offset += count;
        Ok(bytes)
    }

    /// Reads a multi-byte variable-length integer: 7 payload bits per
    /// byte, MSB-first, top bit set while more bytes follow. At most
    /// [`MULTI_BYTE_MAX_BYTES`] bytes encode a 64-bit value; a final byte
    /// that still signals continuation is an error.
    pub fn read_multi_byte(&mut self) -> Result<u64> {
        let mut value = 0u64;

        for count in 0..MULTI_BYTE_MAX_BYTES {
            let Some(&byte) = self.data.get(self.offset + count) else {
                return Err(ReadError::OutOfBounds {
                    offset: self.offset,
                    requested: count + 1,
                    size: self.data.len(),
                });
            };

            value = (value << 7) | u64::from(byte & 0x7F);

            if byte & 0x80 == 0 {
                self.offset += count + 1;
                return Ok(value);
            }
        }

        Err(ReadError::MultiByteTooLong(MULTI_BYTE_MAX_BYTES))
    }

    /// Seeks forward by `amount` bytes. Seeking exactly to the end is
    /// permitted; past it is not.
    pub fn seek(&mut self, amount: usize) -> Result<()> {
        self.check(amount)?;
        self.offset += amount;
        Ok(())
    }

    /// The remaining unread bytes.
    pub fn current(&self) -> &'a [u8] {
        &self.data[self.offset..]
    }

    /// Number of bytes left to read.
    pub const fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// Current byte offset from the start of the stream.
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Total stream size in bytes.
    pub const fn size(&self) -> usize {
        self.data.len()
    }
}
