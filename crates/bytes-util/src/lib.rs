//! Byte- and bit-level readers for the LCEVC (MPEG-5 Part 2) enhancement
//! bitstream.
//!
//! The enhancement bitstream stores all multi-byte values in big-endian
//! order and mixes byte-aligned payloads with bit-packed headers, so this
//! crate provides two cooperating readers:
//!
//! - [`ByteReader`]: a forward-only cursor over a byte slice with
//!   wrap-safe bounds checking and the multi-byte variable-length integer
//!   encoding used throughout the stream (7 payload bits per byte, top bit
//!   set on continuation).
//! - [`BitReader`]: an MSB-first bit cursor layered on the byte stream,
//!   refilling a 32-bit word at a time, with unsigned Exp-Golomb support
//!   as used by the VUI parameters (ISO/IEC 23094-2 - E.2).
#![deny(unsafe_code)]

mod bit_reader;
mod byte_reader;
mod error;
mod vlc;

pub use self::bit_reader::BitReader;
pub use self::byte_reader::ByteReader;
pub use self::error::{ReadError, Result};
pub use self::vlc::{MULTI_BYTE_MAX_BYTES, encode_multi_byte};
