use crate::byte_reader::ByteReader;
use crate::error::{ReadError, Result};

/// Maximum number of bits a single [`BitReader::read_bits`] call may take.
const MAX_BITS_AT_ONCE: u8 = 31;

/// An MSB-first bit cursor over a big-endian byte stream.
///
/// Bits are served out of a 32-bit word refilled from the byte stream up
/// to four bytes at a time. When fewer than four bytes remain, the tail
/// bytes are shifted to the high end of the word so reads still see
/// MSB-first data; `next_bit` tracks how many bits of the word have been
/// consumed.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    bytes: ByteReader<'a>,
    word: u32,
    next_bit: u8,
}

impl<'a> BitReader<'a> {
    /// Creates a bit reader over `data` and loads the first word.
    pub fn new(data: &'a [u8]) -> Result<Self> {
        let mut reader = Self {
            bytes: ByteReader::new(data)?,
            word: 0,
            next_bit: 0,
        };
        reader.load_word()?;
        Ok(reader)
    }

    /// Loads up to four bytes into the word; shorter tails are shifted to
    /// the high end.
    fn load_word(&mut self) -> Result<()> {
        let remaining = self.bytes.remaining();

        match remaining {
            0 => Err(ReadError::OutOfBounds {
                offset: self.bytes.offset(),
                requested: 1,
                size: self.bytes.size(),
            }),
            1..=3 => {
                self.word = 0;
                for _ in 0..remaining {
                    self.word = (self.word << 8) | u32::from(self.bytes.read_u8()?);
                }
                self.next_bit = 8 * (4 - remaining as u8);
                self.word <<= self.next_bit;
                Ok(())
            }
            _ => {
                self.word = self.bytes.read_u32()?;
                self.next_bit = 0;
                Ok(())
            }
        }
    }

    /// True once every bit of the stream has been consumed.
    pub const fn is_complete(&self) -> bool {
        self.bytes.remaining() == 0 && self.next_bit == 32
    }

    fn check_load_next_word(&mut self) -> Result<()> {
        if self.next_bit == 32 {
            self.load_word()?;
        }
        Ok(())
    }

    fn end_of_stream(&self) -> ReadError {
        ReadError::OutOfBounds {
            offset: self.bytes.offset(),
            requested: 1,
            size: self.bytes.size(),
        }
    }

    /// Reads a single bit.
    pub fn read_bit(&mut self) -> Result<bool> {
        if self.is_complete() {
            return Err(self.end_of_stream());
        }
        self.check_load_next_word()?;

        let bit = self.word >> 31;
        self.word <<= 1;
        self.next_bit += 1;
        Ok(bit != 0)
    }

    /// Reads `count` bits (at most 31), MSB first.
    pub fn read_bits(&mut self, count: u8) -> Result<u32> {
        debug_assert!(count <= MAX_BITS_AT_ONCE);

        if count == 0 {
            return Ok(0);
        }
        if self.is_complete() {
            return Err(self.end_of_stream());
        }
        self.check_load_next_word()?;

        let word_remaining = 32 - self.next_bit;
        let mut value = self.word >> (32 - count);

        if word_remaining >= count {
            self.next_bit += count;
            self.word <<= count;
        } else {
            // Not enough bits in the current word; the shifted-out tail of
            // `value` is zero, so the freshly loaded bits OR straight in.
            let read_remaining = count - word_remaining;

            self.load_word()?;

            self.next_bit += read_remaining;
            let trail = self.word >> (32 - read_remaining);
            self.word <<= read_remaining;
            value |= trail;
        }

        Ok(value)
    }

    /// Reads an unsigned Exp-Golomb value (ISO/IEC 23094-2 - E.2):
    /// `count` leading zero bits, a one bit, then `count` payload bits;
    /// the decoded value is the assembled number minus one.
    pub fn read_exp_golomb(&mut self) -> Result<u32> {
        let mut zero_count = 0u32;
        while !self.read_bit()? {
            zero_count += 1;
        }

        let mut value = 1u32;
        for _ in 0..zero_count {
            value = (value << 1) | u32::from(self.read_bit()?);
        }

        Ok(value - 1)
    }

    /// Number of bits left to read.
    pub const fn remaining_bits(&self) -> usize {
        (32 - self.next_bit as usize) + self.bytes.remaining() * 8
    }

    /// Number of bits consumed so far.
    pub const fn consumed_bits(&self) -> usize {
        self.bytes.size() * 8 - self.remaining_bits()
    }

    /// Number of bytes consumed so far; a partially read byte counts.
    pub const fn consumed_bytes(&self) -> usize {
        (self.consumed_bits() + 7) >> 3
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn single_bits_msb_first() {
        let mut reader = BitReader::new(&[0b1010_0011]).unwrap();
        let bits: Vec<bool> = (0..8).map(|_| reader.read_bit().unwrap()).collect();
        assert_eq!(bits, [true, false, true, false, false, false, true, true]);
        assert!(reader.read_bit().is_err());
        assert!(reader.is_complete());
    }

    #[test]
    fn multi_bit_reads_across_words() {
        let data = [0x12, 0x34, 0x56, 0x78, 0x9A];
        let mut reader = BitReader::new(&data).unwrap();

        assert_eq!(reader.read_bits(12).unwrap(), 0x123);
        assert_eq!(reader.read_bits(12).unwrap(), 0x456);
        // This read straddles the word boundary.
        assert_eq!(reader.read_bits(16).unwrap(), 0x789A);
        assert!(reader.is_complete());
    }

    #[test]
    fn short_tail_is_left_aligned() {
        let mut reader = BitReader::new(&[0xAB, 0xCD]).unwrap();
        assert_eq!(reader.read_bits(4).unwrap(), 0xA);
        assert_eq!(reader.read_bits(8).unwrap(), 0xBC);
        assert_eq!(reader.read_bits(4).unwrap(), 0xD);
        assert!(reader.read_bits(1).is_err());
    }

    #[test]
    fn consumed_accounting_rounds_up() {
        let mut reader = BitReader::new(&[0xFF, 0x00, 0xFF]).unwrap();
        assert_eq!(reader.consumed_bytes(), 0);

        reader.read_bits(3).unwrap();
        assert_eq!(reader.consumed_bits(), 3);
        assert_eq!(reader.consumed_bytes(), 1);

        reader.read_bits(5).unwrap();
        assert_eq!(reader.consumed_bytes(), 1);

        reader.read_bit().unwrap();
        assert_eq!(reader.consumed_bytes(), 2);
        assert_eq!(reader.remaining_bits(), 15);
    }

    #[test]
    fn exp_golomb_values() {
        // Codes: 1 -> 0, 010 -> 1, 011 -> 2, 00100 -> 3, 00111 -> 6.
        let mut reader = BitReader::new(&[0b1_010_011_0, 0b0100_0011, 0b1000_0000]).unwrap();
        assert_eq!(reader.read_exp_golomb().unwrap(), 0);
        assert_eq!(reader.read_exp_golomb().unwrap(), 1);
        assert_eq!(reader.read_exp_golomb().unwrap(), 2);
        assert_eq!(reader.read_exp_golomb().unwrap(), 3);
        assert_eq!(reader.read_exp_golomb().unwrap(), 6);
    }

    #[test]
    fn exp_golomb_runs_out_of_bits() {
        let mut reader = BitReader::new(&[0x00]).unwrap();
        assert!(reader.read_exp_golomb().is_err());
    }
}
