//! Typed entropy decoders over the Huffman layer.
//!
//! Every chunk is decoded by an [`EntropyDecoder`] of one of four types:
//! coefficients (the fused triple decoder), the temporal signal (a
//! two-state automaton over two Huffman tables), or compressed size
//! arrays (unsigned or signed). A chunk may also be RLE-only, in which
//! case symbols are raw bytes in the same layout, or disabled, in which
//! case decoding reports "no data" and the caller skips the tile.

use crate::chunk::Chunk;
use crate::config::types::TemporalSignal;
use crate::error::{DecodeError, Result};
use crate::huffman::{
    HuffmanManualState, HuffmanReader, HuffmanTable, HuffmanTripleDecoder, lut_decode,
    manual_decode_maybe_single_symbol, manual_initialize_with_lut, next_symbol_is_msb,
    next_symbol_is_rl,
};

/// What a chunk's symbols mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntropyDecoderType {
    /// Coefficient stream: LSB, optional MSB, optional run-lengths.
    Default,
    /// Temporal signal stream.
    Temporal,
    /// Compressed size array, unsigned.
    SizeUnsigned,
    /// Compressed size array, signed.
    SizeSigned,
}

/// A single-stream Huffman decoder: LUT first, sorted list as fallback.
#[derive(Debug, Clone, Default)]
struct SingleDecoder {
    manual: HuffmanManualState,
    table: HuffmanTable,
}

impl SingleDecoder {
    /// Order optimized for streams that are frequently single-symbol,
    /// like the MSB and temporal streams.
    fn decode(&self, reader: &mut HuffmanReader<'_>) -> Result<u8> {
        if let Some(symbol) = self.manual.single_symbol() {
            return Ok(symbol);
        }
        if let Some(symbol) = lut_decode(&self.table, reader) {
            return Ok(symbol);
        }
        manual_decode_maybe_single_symbol(&self.manual, reader)
    }
}

/// The entropy decoder for one chunk. Owns the Huffman state built from
/// the chunk's table prefix; the remaining bytes are the symbol stream.
pub(crate) struct EntropyDecoder<'a> {
    decoder_type: EntropyDecoderType,
    entropy_enabled: bool,
    rle_only: bool,
    rle_data: &'a [u8],
    raw_offset: usize,
    current_huff: usize,
    reader: HuffmanReader<'a>,
    singles: [SingleDecoder; 2],
    triple: Option<HuffmanTripleDecoder>,
}

/// Temporal state transition: a symbol with the continuation bit clear
/// flips the active Huffman context.
const NEXT_TEMPORAL_CONTEXT: [[usize; 2]; 2] = [[1, 0], [0, 1]];

impl<'a> EntropyDecoder<'a> {
    /// Prepares a decoder for `chunk`. Disabled chunks yield a no-op
    /// decoder, RLE-only chunks read raw bytes, everything else parses
    /// the serialized Huffman tables from the head of the chunk.
    pub(crate) fn new(
        chunk: &'a Chunk,
        decoder_type: EntropyDecoderType,
        bitstream_version: u8,
    ) -> Result<Self> {
        let mut decoder = Self {
            decoder_type,
            entropy_enabled: chunk.entropy_enabled,
            rle_only: false,
            rle_data: &[],
            raw_offset: 0,
            current_huff: 0,
            reader: HuffmanReader::new(&[]),
            singles: [SingleDecoder::default(), SingleDecoder::default()],
            triple: None,
        };

        if !chunk.entropy_enabled {
            return Ok(decoder);
        }

        if chunk.rle_only {
            decoder.rle_only = true;
            decoder.rle_data = &chunk.data;
            return Ok(decoder);
        }

        if chunk.data.is_empty() {
            return Ok(decoder);
        }

        decoder.reader = HuffmanReader::new(&chunk.data);

        if decoder_type == EntropyDecoderType::Default {
            decoder.triple = Some(HuffmanTripleDecoder::initialize(
                &mut decoder.reader,
                bitstream_version,
            )?);
        } else {
            // Two streams: the temporal contexts, or size LSB/MSB.
            for single in &mut decoder.singles {
                manual_initialize_with_lut(
                    &mut single.manual,
                    &mut single.table,
                    &mut decoder.reader,
                    bitstream_version,
                )?;
            }
        }

        Ok(decoder)
    }

    fn next_raw_symbol(&mut self) -> Result<u8> {
        let Some(&symbol) = self.rle_data.get(self.raw_offset) else {
            return Err(DecodeError::EntropyOverflow("RLE data exhausted"));
        };
        self.raw_offset += 1;
        Ok(symbol)
    }

    /// Decodes one coefficient and the length of the zero run after it.
    /// `None` when this chunk carries no data at all.
    pub(crate) fn decode_coefficient(&mut self) -> Result<Option<(i16, u32)>> {
        debug_assert!(self.decoder_type == EntropyDecoderType::Default);

        if !self.entropy_enabled {
            return Ok(None);
        }

        if !self.rle_only {
            let triple = self
                .triple
                .as_ref()
                .ok_or(DecodeError::HuffmanInvalid("empty coefficient chunk"))?;
            return triple.decode(&mut self.reader).map(Some);
        }

        // RLE-only: the same symbol layout, byte-aligned. The run-length
        // continuation flag always rides the most recent symbol.
        let mut symbol = self.next_raw_symbol()?;

        let value = if next_symbol_is_msb(symbol) {
            let lsb = symbol;
            symbol = self.next_raw_symbol()?;
            let exp = (i32::from(symbol & 0x7F) << 8) | i32::from(lsb & 0xFE);
            ((exp - 0x4000) >> 1) as i16
        } else {
            (i16::from(symbol & 0x7E) - 0x40) >> 1
        };

        let mut zeros = 0u64;
        while next_symbol_is_rl(symbol) {
            symbol = self.next_raw_symbol()?;
            zeros = (zeros << 7) | u64::from(symbol & 0x7F);
            if zeros > u64::from(u32::MAX) {
                return Err(DecodeError::EntropyOverflow("zero run exceeds 32 bits"));
            }
        }

        Ok(Some((value, zeros as u32)))
    }

    /// Decodes the next temporal signal and its run length (inclusive of
    /// the current transform unit). `None` when the chunk carries no
    /// data.
    pub(crate) fn decode_temporal(&mut self) -> Result<Option<(TemporalSignal, u32)>> {
        debug_assert!(self.decoder_type == EntropyDecoderType::Temporal);

        if !self.entropy_enabled {
            return Ok(None);
        }

        // The state on *leaving* this call classifies the run.
        let mut state = self.current_huff;
        let mut count = 0u64;

        // The first symbol is sent raw so the initial state is known.
        if self.raw_offset == 0 {
            let symbol = self.next_temporal_symbol()?;
            state = usize::from(symbol & 0x01);
        }

        loop {
            let symbol = self.next_temporal_symbol()?;
            count = (count << 7) | u64::from(symbol & 0x7F);
            if count > u64::from(u32::MAX) {
                return Err(DecodeError::EntropyOverflow("temporal run exceeds 32 bits"));
            }
            if !next_symbol_is_rl(symbol) {
                break;
            }
        }

        let signal = if state == 0 { TemporalSignal::Inter } else { TemporalSignal::Intra };
        Ok(Some((signal, count as u32)))
    }

    /// Reads one temporal symbol (raw or Huffman) and advances the
    /// two-state automaton.
    fn next_temporal_symbol(&mut self) -> Result<u8> {
        let symbol = if self.rle_only {
            self.next_raw_symbol()?
        } else if self.raw_offset == 0 {
            self.reader.read_bits(8)? as u8
        } else {
            self.singles[self.current_huff].decode(&mut self.reader)?
        };

        if self.raw_offset == 0 {
            // The seed byte sets the initial state directly.
            self.current_huff = usize::from(symbol & 0x01);
        } else {
            // Later symbols flip the state when their run ends.
            self.current_huff =
                NEXT_TEMPORAL_CONTEXT[self.current_huff][usize::from((symbol & 0x80) >> 7)];
        }
        self.raw_offset += 1;

        Ok(symbol)
    }

    /// Decodes one entry of a compressed size array.
    pub(crate) fn decode_size(&mut self) -> Result<i16> {
        debug_assert!(matches!(
            self.decoder_type,
            EntropyDecoderType::SizeUnsigned | EntropyDecoderType::SizeSigned
        ));
        debug_assert!(!self.rle_only);

        let lsb = self.singles[0].decode(&mut self.reader)?;

        let size = if lsb & 0x01 != 0 {
            let msb = self.singles[1].decode(&mut self.reader)?;
            let value = (u16::from(msb) << 7) | u16::from(lsb >> 1);

            if self.decoder_type == EntropyDecoderType::SizeSigned {
                // Replicate bit 14 into the sign bit.
                (((value & 0x4000) << 1) | value) as i16
            } else {
                value as i16
            }
        } else {
            let value = lsb >> 1;
            if self.decoder_type == EntropyDecoderType::SizeSigned {
                // Broadcast bit 6 to bit 7, reinterpret, then widen.
                i16::from((((value & 0x40) << 1) | value) as i8)
            } else {
                i16::from(value)
            }
        };

        Ok(size)
    }

    /// Bytes of the chunk consumed so far, not counting bits staged in
    /// the peek window.
    pub(crate) fn consumed_bytes(&self) -> usize {
        self.reader.consumed_bytes()
    }
}
