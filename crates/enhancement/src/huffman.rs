//! Huffman decoding for the coefficient, temporal and size streams.
//!
//! Each stream serializes up to three cooperating Huffman tables
//! (ISO/IEC 23094-2 - 9.2.1): the 7-bit LSB symbols, the optional MSB
//! symbols, and the zero run-lengths. Three acceleration structures keep
//! the hot path out of the generic code:
//!
//! - a small 2^10-entry LUT per table for codes of at most 10 bits,
//! - a sorted overflow list with per-bit-size indices for binary search,
//! - a fused 2^12-entry "triple" LUT for the coefficient stream, indexed
//!   by `(leading_zeros << 8) | next_8_bits`, that resolves an LSB code
//!   and up to two run-length codes in a single probe.
//!
//! The fused table works because canonical code assignment walks the
//! symbol list from longest to shortest code, handing the all-zeros code
//! to the longest entry; the count of leading zero bits therefore
//! compresses the long tail of every code into four index bits.

use crate::error::{DecodeError, Result};

/// Bits of the triple-LUT index spent on the leading-zero count.
const BIG_TABLE_LEADING_ZEROES_BITS: u8 = 4;
/// Bits of the triple-LUT index spent on the code body.
pub(crate) const BIG_TABLE_MAX_CODE_SIZE: u8 = 8;
/// Saturation limit of the leading-zero count.
const BIG_TABLE_MAX_NUM_LEADING_ZEROES: u8 = (1 << BIG_TABLE_LEADING_ZEROES_BITS) - 1;
/// Bits peeked ahead of a triple-LUT probe.
const BIG_TABLE_CODE_SIZE_TO_READ: u8 = BIG_TABLE_MAX_NUM_LEADING_ZEROES + BIG_TABLE_MAX_CODE_SIZE;
/// Triple-LUT index width.
const BIG_TABLE_MAX_SIZE: u8 = BIG_TABLE_LEADING_ZEROES_BITS + BIG_TABLE_MAX_CODE_SIZE;
/// Small-LUT index width.
pub(crate) const SMALL_TABLE_MAX_SIZE: u8 = 10;

/// The alphabet limit: sparse tables signal at most 31 symbols through a
/// 5-bit count, dense tables a 256-bit presence bitmap.
const MAX_NUM_SYMBOLS: usize = 256;
/// Code lengths are 5-bit values.
pub(crate) const MAX_CODE_LENGTH: u8 = 31;

/// Bit 0 of an LSB symbol: an MSB symbol follows.
#[inline]
pub(crate) const fn next_symbol_is_msb(symbol: u8) -> bool {
    symbol & 0x01 != 0
}

/// Bit 7 of a symbol: a run-length symbol follows.
#[inline]
pub(crate) const fn next_symbol_is_rl(symbol: u8) -> bool {
    symbol & 0x80 != 0
}

/// Leading zero bits of `value` in a `num_bits`-wide representation;
/// `value == 0` counts as `num_bits` zeros.
#[inline]
const fn clz(value: u32, num_bits: u8) -> u8 {
    (value.leading_zeros() as i32 + num_bits as i32 - 32) as u8
}

/// Width of the serialized code-length deltas: `ceil(log2(x + 1))` per
/// 9.2.1. One row per bitstream version, because the first three
/// versions each changed the table; versions before `NewCodeLengths`
/// index with `max - min + 1` instead of `max - min`.
fn bit_width(x: u8, bitstream_version: u8) -> Result<u8> {
    const TABLE: [[u8; 32]; 3] = [
        [
            1, 1, 2, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 5, 5, 5, //
            5, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6,
        ],
        [
            1, 1, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 4, 4, 4, 4, //
            5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5,
        ],
        [
            0, 1, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 4, 4, 4, 4, //
            5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5,
        ],
    ];

    use crate::config::types::bitstream_version as version;

    let x = if bitstream_version < version::NEW_CODE_LENGTHS { x + 1 } else { x };

    if x > 31 {
        // Lengths are 5 bits, so this is unreachable on conformant data.
        return Err(DecodeError::HuffmanInvalid("code length delta out of range"));
    }

    let table = usize::from(bitstream_version.min(version::ALIGN_WITH_SPEC));
    Ok(TABLE[table][usize::from(x)])
}

/// A bit window over a chunk's bytes, tuned for peek-heavy Huffman
/// decoding: up to 25 bits stay staged in `word` between `start_bit` and
/// `end_bit`, and the stream pads with zero bits once the bytes run out
/// so decoders may peek past the final code.
#[derive(Debug, Clone)]
pub(crate) struct HuffmanReader<'a> {
    data: &'a [u8],
    offset: usize,
    word: u32,
    start_bit: u8,
    end_bit: u8,
    bits_read: u64,
}

/// Extracts bits `[start_bit, end_bit)` of `data`, right-aligned.
#[inline]
const fn extract_bits(data: u32, start_bit: u8, end_bit: u8) -> u32 {
    let mask = (1u32 << (end_bit - start_bit)) - 1;
    (data >> (32 - end_bit)) & mask
}

impl<'a> HuffmanReader<'a> {
    pub(crate) const fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            offset: 0,
            word: 0,
            start_bit: 32,
            end_bit: 32,
            bits_read: 0,
        }
    }

    /// Bits left in the staged word plus the unread bytes.
    pub(crate) const fn remaining_bits(&self) -> usize {
        (32 - self.end_bit as usize) + (self.data.len() - self.offset) * 8
    }

    /// Stages `bits` more bits into the `[start_bit, end_bit)` window,
    /// pulling bytes (or zero padding) from the stream as needed.
    pub(crate) fn advance_by_n_bits(&mut self, bits: u8) {
        debug_assert!(bits <= 25);

        self.end_bit += bits;
        self.bits_read += u64::from(bits);

        if self.end_bit > 32 {
            // Shuffle bytes in from the right until the window is as
            // far left as possible, touching the byte stream rarely.
            while self.start_bit > 7 {
                self.word <<= 8;
                if self.offset < self.data.len() {
                    self.word |= u32::from(self.data[self.offset]);
                    self.offset += 1;
                }
                self.start_bit -= 8;
                self.end_bit -= 8;
            }
        }
    }

    /// Ensures at least `desired` bits are staged and returns them,
    /// without consuming.
    pub(crate) fn advance_to_nth_bit(&mut self, desired: u8) -> u32 {
        let usable = self.end_bit - self.start_bit;
        let mut end_bit = self.start_bit + desired;
        if usable < desired {
            self.advance_by_n_bits(desired - usable);
            end_bit = self.end_bit;
        }
        extract_bits(self.word, self.start_bit, end_bit)
    }

    /// Consumes `bits` staged bits.
    #[inline]
    pub(crate) fn consume(&mut self, bits: u8) {
        self.start_bit += bits;
        debug_assert!(self.start_bit <= 32);
    }

    /// Reads and immediately consumes `count` bits, bounds-checked.
    /// Used for table deserialization, not for symbol decoding.
    pub(crate) fn read_bits(&mut self, count: u8) -> Result<u32> {
        debug_assert!(self.start_bit == self.end_bit);

        if self.remaining_bits() < usize::from(count) {
            return Err(DecodeError::HuffmanInvalid("table data ran out of bits"));
        }

        let value = self.advance_to_nth_bit(count);
        self.consume(count);
        Ok(value)
    }

    /// Bytes consumed, not counting staged-but-unconsumed bits.
    pub(crate) const fn consumed_bytes(&self) -> usize {
        let usable = (self.end_bit - self.start_bit) as u64;
        ((self.bits_read + 7 - usable) >> 3) as usize
    }
}

/// A list entry for codes decoded by search rather than lookup. Codes
/// fit in a `u8` because canonical assignment counts upward and the
/// alphabet holds at most 256 symbols.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct HuffmanListEntry {
    pub(crate) code: u8,
    pub(crate) symbol: u8,
    pub(crate) bits: u8,
}

/// Sorted by code length ascending, then code descending; `idx_of_each
/// _bit_size[b]` is the exclusive end of the length-`b` group.
#[derive(Debug, Clone, Default)]
pub(crate) struct HuffmanList {
    pub(crate) list: Vec<HuffmanListEntry>,
    pub(crate) idx_of_each_bit_size: [u16; MAX_CODE_LENGTH as usize + 1],
}

/// One small-LUT slot; `bits == 0` marks a miss.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct HuffmanEntry {
    pub(crate) symbol: u8,
    pub(crate) bits: u8,
}

/// The 2^10-entry single-symbol LUT.
#[derive(Debug, Clone)]
pub(crate) struct HuffmanTable {
    pub(crate) code: Box<[HuffmanEntry; 1 << SMALL_TABLE_MAX_SIZE]>,
}

impl Default for HuffmanTable {
    fn default() -> Self {
        Self {
            code: Box::new([HuffmanEntry::default(); 1 << SMALL_TABLE_MAX_SIZE]),
        }
    }
}

/// Fallback decoder state: the overflow list plus the two sentinel table
/// shapes (empty, and single-symbol with no coded bits).
#[derive(Debug, Clone, Default)]
pub(crate) struct HuffmanManualState {
    pub(crate) list: HuffmanList,
    pub(crate) single_symbol: u8,
    pub(crate) min_code_length: u8,
    pub(crate) max_code_length: u8,
}

impl HuffmanManualState {
    /// The single symbol, if this is a single-symbol table.
    #[inline]
    pub(crate) fn single_symbol(&self) -> Option<u8> {
        (self.min_code_length + self.max_code_length == 0).then_some(self.single_symbol)
    }
}

/// One fused-LUT slot. `contents` packs
/// `(bits_total << 3) | (msb_overflow << 1) | lsb_or_rl_overflow`;
/// `bits_total == 0` doubles as the LSB-overflow marker, since every
/// complete entry consumed at least one bit.
#[derive(Debug, Clone, Copy, Default)]
struct HuffmanTriple {
    contents: u8,
    lsb: u8,
    rl: u16,
}

impl HuffmanTriple {
    #[inline]
    const fn bits(self) -> u8 {
        self.contents >> 3
    }

    #[inline]
    const fn lsb_overflowed(self) -> bool {
        self.bits() == 0
    }

    #[inline]
    const fn is_incomplete(self) -> bool {
        self.lsb_overflowed() || (self.contents & 0b0000_0011) != 0
    }

    #[inline]
    const fn msb_overflowed(self) -> bool {
        self.contents & 0b0000_0010 != 0
    }
}

/// The fused coefficient decoder: triple LUT, run-length LUT, and the
/// three per-stream fallback decoders.
#[derive(Debug, Clone)]
pub(crate) struct HuffmanTripleDecoder {
    triple_table: Box<[HuffmanTriple; 1 << BIG_TABLE_MAX_SIZE]>,
    rl_table: HuffmanTable,
    lsb: HuffmanManualState,
    msb: HuffmanManualState,
    rl: HuffmanManualState,
}

/// Reads one serialized table: 5-bit min/max code lengths (with the two
/// sentinel encodings), then either a 256-bit presence bitmap or a
/// 5-bit-counted sparse symbol list, each with a length delta.
///
/// Returns the collected entries, unsorted-code, sorted by
/// (length ascending, symbol descending).
fn manual_initialize_common(
    state: &mut HuffmanManualState,
    reader: &mut HuffmanReader<'_>,
    bitstream_version: u8,
) -> Result<Vec<HuffmanListEntry>> {
    state.list = HuffmanList::default();

    state.min_code_length = reader.read_bits(5)? as u8;
    state.max_code_length = reader.read_bits(5)? as u8;

    if state.max_code_length < state.min_code_length {
        tracing::error!(
            min = state.min_code_length,
            max = state.max_code_length,
            "huffman max code length below min"
        );
        return Err(DecodeError::HuffmanInvalid("max code length below min"));
    }

    if state.min_code_length == MAX_CODE_LENGTH && state.max_code_length == MAX_CODE_LENGTH {
        // Sentinel: empty table.
        return Ok(Vec::new());
    }

    if state.min_code_length == 0 && state.max_code_length == 0 {
        // Sentinel: a single symbol, sent raw.
        state.single_symbol = reader.read_bits(8)? as u8;
        return Ok(Vec::new());
    }

    let length_bits = bit_width(state.max_code_length - state.min_code_length, bitstream_version)?;

    let mut entries = Vec::new();

    // Presence-bitmap mode is efficient when many symbols are in use.
    if reader.read_bits(1)? != 0 {
        for symbol in 0..MAX_NUM_SYMBOLS {
            if reader.read_bits(1)? != 0 {
                let delta = reader.read_bits(length_bits)? as u8;
                entries.push(HuffmanListEntry {
                    code: 0,
                    symbol: symbol as u8,
                    bits: delta + state.min_code_length,
                });
            }
        }
    } else {
        let symbol_count = reader.read_bits(5)?;
        if symbol_count == 0 {
            return Err(DecodeError::HuffmanInvalid("sparse table with zero symbols"));
        }

        for _ in 0..symbol_count {
            let symbol = reader.read_bits(8)? as u8;
            let delta = reader.read_bits(length_bits)? as u8;
            entries.push(HuffmanListEntry {
                code: 0,
                symbol,
                bits: delta + state.min_code_length,
            });
        }
    }

    entries.sort_by(|a, b| a.bits.cmp(&b.bits).then(b.symbol.cmp(&a.symbol)));

    Ok(entries)
}

/// Canonical code assignment: walk the sorted list from the end (the
/// longest codes), counting upward and right-shifting whenever the
/// length decreases. The longest code is therefore all zero bits.
fn generate_codes(entries: &mut [HuffmanListEntry], max_code_length: u8) {
    let mut curr_length = max_code_length;
    let mut curr_code = 0u8;

    for entry in entries.iter_mut().rev() {
        if entry.bits < curr_length {
            curr_code >>= curr_length - entry.bits;
            curr_length = entry.bits;
        }
        entry.code = curr_code;
        curr_code = curr_code.wrapping_add(1);
    }
}

/// [`generate_codes`], also recording the exclusive end index of every
/// bit-size group for the binary-search fallback.
fn generate_codes_and_indices(list: &mut HuffmanList, max_code_length: u8) {
    let mut curr_length = max_code_length;
    let mut curr_code = 0u8;

    list.idx_of_each_bit_size[usize::from(curr_length)] = list.list.len() as u16;

    for idx in (0..list.list.len()).rev() {
        let entry = &mut list.list[idx];
        if entry.bits < curr_length {
            curr_code >>= curr_length - entry.bits;
            curr_length = entry.bits;
            list.idx_of_each_bit_size[usize::from(curr_length)] = idx as u16 + 1;
        }
        entry.code = curr_code;
        curr_code = curr_code.wrapping_add(1);
    }
}

/// Generates codes and a small LUT in one pass; entries too long for the
/// LUT keep their code for the list. Returns the first (smallest) index
/// whose code is oversized; oversized codes sit at the list's tail.
fn generate_codes_and_lut(
    entries: &mut [HuffmanListEntry],
    table: &mut HuffmanTable,
    max_code_length: u8,
) -> usize {
    table.code.fill(HuffmanEntry::default());

    let mut curr_length = max_code_length;
    let mut curr_code = 0u8;
    let mut min_oversized_idx = entries.len();

    for idx in (0..entries.len()).rev() {
        let entry = &mut entries[idx];

        if entry.bits < curr_length {
            curr_code >>= curr_length - entry.bits;
            curr_length = entry.bits;
        }

        if entry.bits > SMALL_TABLE_MAX_SIZE {
            entry.code = curr_code;
            min_oversized_idx = idx;
        } else {
            let span = 1usize << (SMALL_TABLE_MAX_SIZE - entry.bits);
            let start = usize::from(curr_code) << (SMALL_TABLE_MAX_SIZE - entry.bits);
            for slot in &mut table.code[start..start + span] {
                slot.symbol = entry.symbol;
                slot.bits = entry.bits;
            }
        }

        curr_code = curr_code.wrapping_add(1);
    }

    min_oversized_idx
}

/// Records the exclusive end index of each bit size present in `list`.
fn determine_idx_of_each_bit_size(list: &mut HuffmanList) {
    let mut bit_size = list.list[0].bits;
    for (idx, entry) in list.list.iter().enumerate() {
        if entry.bits > bit_size {
            list.idx_of_each_bit_size[usize::from(bit_size)] = idx as u16;
            bit_size = entry.bits;
        }
    }
    list.idx_of_each_bit_size[usize::from(bit_size)] = list.list.len() as u16;
}

/// Initializes a single-stream decoder (temporal and size streams): a
/// small LUT plus the overflow list.
pub(crate) fn manual_initialize_with_lut(
    state: &mut HuffmanManualState,
    table: &mut HuffmanTable,
    reader: &mut HuffmanReader<'_>,
    bitstream_version: u8,
) -> Result<()> {
    let mut entries = manual_initialize_common(state, reader, bitstream_version)?;
    if entries.is_empty() {
        // Empty or single-symbol table; nothing further to build.
        return Ok(());
    }

    let min_oversized_idx =
        generate_codes_and_lut(&mut entries, table, state.max_code_length);

    state.list.list = entries.split_off(min_oversized_idx);
    if !state.list.list.is_empty() {
        determine_idx_of_each_bit_size(&mut state.list);
    }

    Ok(())
}

/// Decodes one symbol through a small LUT; `None` when the staged bits
/// are not a LUT-resident code.
#[inline]
pub(crate) fn lut_decode(table: &HuffmanTable, reader: &mut HuffmanReader<'_>) -> Option<u8> {
    let lut_idx = reader.advance_to_nth_bit(SMALL_TABLE_MAX_SIZE) as usize;
    let entry = table.code[lut_idx];
    if entry.bits != 0 {
        reader.consume(entry.bits);
        Some(entry.symbol)
    } else {
        None
    }
}

/// Decodes one symbol by searching the sorted overflow list, bit size by
/// bit size, binary-searching inside each group.
pub(crate) fn manual_decode(
    state: &HuffmanManualState,
    reader: &mut HuffmanReader<'_>,
) -> Result<u8> {
    let list = &state.list;
    if list.list.is_empty() {
        return Err(DecodeError::HuffmanInvalid("code not present in any table"));
    }

    let mut bits_under_consideration = list.list[0].bits;
    let mut code = reader.advance_to_nth_bit(bits_under_consideration);

    // The staged word caps peeks at 25 bits; longer codes cannot occur
    // in streams this decoder accepts.
    const MAX_PEEK_BITS: u8 = 25;
    if bits_under_consideration > MAX_PEEK_BITS {
        return Err(DecodeError::HuffmanInvalid("code length exceeds the peek window"));
    }

    let mut idx = 0u16;
    while usize::from(idx) < list.list.len() {
        let mut entry = &list.list[usize::from(idx)];
        while bits_under_consideration < entry.bits {
            bits_under_consideration += 1;
            if bits_under_consideration > MAX_PEEK_BITS {
                return Err(DecodeError::HuffmanInvalid("code length exceeds the peek window"));
            }
            code = reader.advance_to_nth_bit(bits_under_consideration);
        }

        // Inclusive bounds; the group is sorted by code descending.
        let lower_limit = idx;
        let upper_limit = list.idx_of_each_bit_size[usize::from(bits_under_consideration)] - 1;
        let mut test_idx = lower_limit + (upper_limit - lower_limit + 1) / 2;
        let mut lower = lower_limit;
        let mut upper = upper_limit;

        loop {
            entry = &list.list[usize::from(test_idx)];

            if code > u32::from(entry.code) {
                if test_idx == lower {
                    break;
                }
                upper = test_idx;
                test_idx -= (test_idx - lower + 1) / 2;
                continue;
            }

            if code < u32::from(entry.code) {
                if test_idx == upper {
                    break;
                }
                lower = test_idx;
                test_idx += (upper - test_idx + 1) / 2;
                continue;
            }

            reader.consume(entry.bits);
            return Ok(entry.symbol);
        }

        idx = list.idx_of_each_bit_size[usize::from(bits_under_consideration)];
    }

    Err(DecodeError::HuffmanInvalid("code not present in any table"))
}

/// [`manual_decode`] with the single-symbol check first, for streams
/// that are frequently single-symbol (MSB, temporal).
pub(crate) fn manual_decode_maybe_single_symbol(
    state: &HuffmanManualState,
    reader: &mut HuffmanReader<'_>,
) -> Result<u8> {
    if let Some(symbol) = state.single_symbol() {
        return Ok(symbol);
    }
    manual_decode(state, reader)
}

impl HuffmanTripleDecoder {
    /// Deserializes the LSB, MSB and RL tables (in stream order) and
    /// builds the fused LUT.
    pub(crate) fn initialize(
        reader: &mut HuffmanReader<'_>,
        bitstream_version: u8,
    ) -> Result<Self> {
        let mut decoder = Self {
            triple_table: Box::new([HuffmanTriple::default(); 1 << BIG_TABLE_MAX_SIZE]),
            rl_table: HuffmanTable::default(),
            lsb: HuffmanManualState::default(),
            msb: HuffmanManualState::default(),
            rl: HuffmanManualState::default(),
        };

        // LSB: the full code list feeds the fused table; only overflow
        // entries stay in the manual state.
        let mut lsb_entries =
            manual_initialize_common(&mut decoder.lsb, reader, bitstream_version)?;
        generate_codes(&mut lsb_entries, decoder.lsb.max_code_length);

        // MSB: pure manual decoder.
        let mut msb_entries =
            manual_initialize_common(&mut decoder.msb, reader, bitstream_version)?;
        generate_codes(&mut msb_entries, decoder.msb.max_code_length);
        decoder.msb.list.list = msb_entries;
        if !decoder.msb.list.list.is_empty() {
            let max = decoder.msb.max_code_length;
            generate_codes_and_indices(&mut decoder.msb.list, max);
        }

        // RL: LUT plus overflow list.
        let mut rl_table = HuffmanTable::default();
        manual_initialize_with_lut(&mut decoder.rl, &mut rl_table, reader, bitstream_version)?;
        decoder.rl_table = rl_table;

        decoder.triple_table_assign(&lsb_entries);

        Ok(decoder)
    }

    /// Populates the fused LUT from the full LSB list and, for entries
    /// whose LSB signals a run-length, the RL table and list.
    fn triple_table_assign(&mut self, full_lsb_list: &[HuffmanListEntry]) {
        let mut lsb_idx = 0;
        while lsb_idx < full_lsb_list.len() {
            let lsb_entry = &full_lsb_list[lsb_idx];
            let leading_zeroes = clz(u32::from(lsb_entry.code), lsb_entry.bits)
                .min(BIG_TABLE_MAX_NUM_LEADING_ZEROES);
            let bits_left_by_lsb = i16::from(BIG_TABLE_MAX_CODE_SIZE)
                - (i16::from(lsb_entry.bits) - i16::from(leading_zeroes));
            if bits_left_by_lsb < 0 {
                break;
            }

            let mut start_idx =
                (u16::from(lsb_entry.code)) << bits_left_by_lsb;
            start_idx |= u16::from(leading_zeroes) << BIG_TABLE_MAX_CODE_SIZE;
            let end_idx = start_idx + (1 << bits_left_by_lsb);

            if next_symbol_is_msb(lsb_entry.symbol) {
                for slot in &mut self.triple_table[usize::from(start_idx)..usize::from(end_idx)] {
                    slot.lsb = lsb_entry.symbol;
                    slot.contents = (lsb_entry.bits << 3) | 0x02;
                }
            } else if !next_symbol_is_rl(lsb_entry.symbol) {
                for slot in &mut self.triple_table[usize::from(start_idx)..usize::from(end_idx)] {
                    slot.lsb = lsb_entry.symbol;
                    slot.contents = lsb_entry.bits << 3;
                }
            } else {
                iterate_rls(
                    &mut self.triple_table,
                    &self.rl_table,
                    &self.rl.list,
                    start_idx,
                    end_idx,
                    lsb_entry.symbol,
                    0,
                    lsb_entry.bits,
                    0,
                );
            }

            lsb_idx += 1;
        }

        // Codes too long for any LUT slot fall back to the manual list;
        // the per-bit-size indices are derived here because the overflow
        // subset is shorter than the full list.
        if full_lsb_list.len() > lsb_idx {
            self.lsb.list.list.extend_from_slice(&full_lsb_list[lsb_idx..]);
            if !self.lsb.list.list.is_empty() {
                determine_idx_of_each_bit_size(&mut self.lsb.list);
            }
        }
    }

    /// Decodes one coefficient LSB/MSB pair and its zero run.
    ///
    /// Returns `(value, zero_run)`; the value is the signed coefficient
    /// before dequantization.
    pub(crate) fn decode(&self, reader: &mut HuffmanReader<'_>) -> Result<(i16, u32)> {
        // Stage a full probe's worth of bits, then find out how many of
        // them were useful.
        let code = reader.advance_to_nth_bit(BIG_TABLE_CODE_SIZE_TO_READ);

        let mut lsb_leading_zeros = clz(code, BIG_TABLE_CODE_SIZE_TO_READ);
        lsb_leading_zeros = lsb_leading_zeros.min(self.lsb.max_code_length);
        lsb_leading_zeros = lsb_leading_zeros.min(BIG_TABLE_MAX_NUM_LEADING_ZEROES);

        // Replace the leading zeros with their count to form the index.
        let plausibly_useful_bits = BIG_TABLE_MAX_CODE_SIZE + lsb_leading_zeros;
        let mut lut_idx =
            (code >> (BIG_TABLE_CODE_SIZE_TO_READ - plausibly_useful_bits)) as u16;
        lut_idx |= u16::from(lsb_leading_zeros) << BIG_TABLE_MAX_CODE_SIZE;

        let triplet = self.triple_table[usize::from(lut_idx)];
        reader.consume(triplet.bits());

        if !triplet.is_incomplete() {
            let value = (i16::from(triplet.lsb & 0x7E) - 0x40) >> 1;
            return Ok((value, u32::from(triplet.rl)));
        }

        // Some part overflowed the LUT; decode the parts manually.
        let mut seek_run_lengths = true;

        let lsb_symbol = if triplet.lsb_overflowed() {
            let symbol = manual_decode_maybe_single_symbol(&self.lsb, reader)?;
            seek_run_lengths = next_symbol_is_rl(symbol);
            symbol
        } else {
            triplet.lsb
        };

        let value = if next_symbol_is_msb(lsb_symbol) {
            let msb = manual_decode_maybe_single_symbol(&self.msb, reader)?;
            seek_run_lengths = next_symbol_is_rl(msb);

            let exp = (i32::from(msb & 0x7F) << 8) | i32::from(lsb_symbol & 0xFE);
            ((exp - 0x4000) >> 1) as i16
        } else {
            (i16::from(lsb_symbol & 0x7E) - 0x40) >> 1
        };

        let mut zeros = u64::from(triplet.rl);
        while seek_run_lengths {
            let symbol = match lut_decode(&self.rl_table, reader) {
                Some(symbol) => symbol,
                None => manual_decode_maybe_single_symbol(&self.rl, reader)?,
            };
            zeros = (zeros << 7) | u64::from(symbol & 0x7F);
            if zeros > u64::from(u32::MAX) {
                return Err(DecodeError::EntropyOverflow("zero run exceeds 32 bits"));
            }
            seek_run_lengths = next_symbol_is_rl(symbol);
        }

        Ok((value, zeros as u32))
    }
}

/// Recursive RL population of the fused LUT. A run-length may chain into
/// further run-lengths; two levels cover every sequence that can fit in
/// 12 index bits.
#[allow(clippy::too_many_arguments)]
fn iterate_rls(
    table: &mut [HuffmanTriple; 1 << BIG_TABLE_MAX_SIZE],
    rl_table: &HuffmanTable,
    rl_list: &HuffmanList,
    parent_start_idx: u16,
    parent_end_idx: u16,
    lsb_symbol: u8,
    rl_symbol: u16,
    code_size_in_stream: u8,
    recursion_level: u8,
) -> u16 {
    let mut lowest_validly_set_idx = parent_end_idx;
    // A code's size in the table is its stream size minus its leading
    // zeros, which live in the index's top bits.
    let code_size_in_table =
        code_size_in_stream - (parent_start_idx >> BIG_TABLE_MAX_CODE_SIZE) as u8;
    let bits_left = BIG_TABLE_MAX_CODE_SIZE - code_size_in_table;

    if recursion_level < 2 {
        // Walk the RL LUT from the top so a too-long entry ends the
        // scan instead of being skipped one index at a time.
        let mut rl_bits;
        let mut rl_idx = (1i32 << SMALL_TABLE_MAX_SIZE) - 1;
        while rl_idx >= 0 {
            let next_rl_entry = rl_table.code[rl_idx as usize];
            rl_bits = next_rl_entry.bits;
            if rl_bits == 0 || rl_bits > bits_left {
                // Zero-bit slots are misses; longer entries cannot fit
                // after this LSB.
                break;
            }
            let rl_code = (rl_idx as u16) >> (SMALL_TABLE_MAX_SIZE - rl_bits);

            lowest_validly_set_idx = lowest_validly_set_idx.min(iterate_rls_entry(
                table,
                rl_table,
                rl_list,
                parent_start_idx,
                lsb_symbol,
                rl_symbol,
                code_size_in_stream,
                rl_code,
                next_rl_entry.symbol,
                rl_bits,
                recursion_level,
            ));

            rl_idx -= 1 << (SMALL_TABLE_MAX_SIZE - rl_bits);
        }

        // Oversized RLs can still fit behind a short LSB; short codes
        // are the common case, so this matters for 1-bit LSBs.
        if bits_left > SMALL_TABLE_MAX_SIZE {
            for entry in &rl_list.list {
                rl_bits = entry.bits;
                if rl_bits > bits_left {
                    break;
                }
                lowest_validly_set_idx = lowest_validly_set_idx.min(iterate_rls_entry(
                    table,
                    rl_table,
                    rl_list,
                    parent_start_idx,
                    lsb_symbol,
                    rl_symbol,
                    code_size_in_stream,
                    u16::from(entry.code),
                    entry.symbol,
                    rl_bits,
                    recursion_level,
                ));
            }
        }
    }

    // Fill the gap below the lowest entry set here: these indices are
    // reachable (the LSB definitely chains into an RL) but no RL code
    // fits, so they carry the RL-overflow flag.
    for slot in &mut table[usize::from(parent_start_idx)..usize::from(lowest_validly_set_idx)] {
        slot.lsb = lsb_symbol;
        slot.rl = rl_symbol;
        slot.contents = (code_size_in_stream << 3) | 0x01;
    }

    parent_start_idx.min(lowest_validly_set_idx)
}

/// One RL candidate inside [`iterate_rls`]: either recurse into chained
/// run-lengths or fill the covered index span.
#[allow(clippy::too_many_arguments)]
fn iterate_rls_entry(
    table: &mut [HuffmanTriple; 1 << BIG_TABLE_MAX_SIZE],
    rl_table: &HuffmanTable,
    rl_list: &HuffmanList,
    parent_start_idx: u16,
    lsb_symbol: u8,
    rl_symbol: u16,
    mut code_size_in_stream: u8,
    new_rl_code: u16,
    new_rl_symbol: u8,
    new_rl_bits: u8,
    recursion_level: u8,
) -> u16 {
    let code_size_in_table =
        code_size_in_stream - (parent_start_idx >> BIG_TABLE_MAX_CODE_SIZE) as u8;
    let bits_left = BIG_TABLE_MAX_CODE_SIZE - code_size_in_table;
    let bits_left_by_rl = bits_left - new_rl_bits;
    let start_idx = parent_start_idx | (new_rl_code << bits_left_by_rl);
    let end_idx = start_idx + (1 << bits_left_by_rl);
    code_size_in_stream += new_rl_bits;

    let chained_rl = (rl_symbol << 7) | u16::from(new_rl_symbol & 0x7F);

    if next_symbol_is_rl(new_rl_symbol) {
        return iterate_rls(
            table,
            rl_table,
            rl_list,
            start_idx,
            end_idx,
            lsb_symbol,
            chained_rl,
            code_size_in_stream,
            recursion_level + 1,
        );
    }

    for slot in &mut table[usize::from(start_idx)..usize::from(end_idx)] {
        slot.lsb = lsb_symbol;
        slot.rl = chained_rl;
        slot.contents = code_size_in_stream << 3;
    }
    start_idx
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
pub(crate) mod tests {
    use super::*;
    use crate::tests::BitWriter;

    /// Serializes a sparse table with the given (symbol, length) pairs.
    pub(crate) fn write_sparse_table(
        writer: &mut BitWriter,
        entries: &[(u8, u8)],
        version: u8,
    ) {
        let min = entries.iter().map(|e| e.1).min().unwrap();
        let max = entries.iter().map(|e| e.1).max().unwrap();
        writer.push_bits(u32::from(min), 5);
        writer.push_bits(u32::from(max), 5);

        let length_bits = bit_width(max - min, version).unwrap();
        writer.push_bit(false); // sparse mode
        writer.push_bits(entries.len() as u32, 5);
        for &(symbol, bits) in entries {
            writer.push_bits(u32::from(symbol), 8);
            writer.push_bits(u32::from(bits - min), length_bits);
        }
    }

    /// Serializes the single-symbol sentinel.
    pub(crate) fn write_single_symbol_table(writer: &mut BitWriter, symbol: u8) {
        writer.push_bits(0, 5);
        writer.push_bits(0, 5);
        writer.push_bits(u32::from(symbol), 8);
    }

    /// Serializes the empty-table sentinel.
    pub(crate) fn write_empty_table(writer: &mut BitWriter) {
        writer.push_bits(u32::from(MAX_CODE_LENGTH), 5);
        writer.push_bits(u32::from(MAX_CODE_LENGTH), 5);
    }

    fn build_single_decoder(entries: &[(u8, u8)]) -> (HuffmanManualState, HuffmanTable, Vec<u8>) {
        let mut writer = BitWriter::default();
        write_sparse_table(&mut writer, entries, 2);
        let data = writer.finish();

        let mut reader = HuffmanReader::new(&data);
        let mut state = HuffmanManualState::default();
        let mut table = HuffmanTable::default();
        manual_initialize_with_lut(&mut state, &mut table, &mut reader, 2).unwrap();
        (state, table, data)
    }

    #[test]
    fn huffman_reader_stages_and_consumes() {
        let data = [0b1100_1010, 0b0101_0101, 0xFF];
        let mut reader = HuffmanReader::new(&data);

        assert_eq!(reader.advance_to_nth_bit(4), 0b1100);
        // Peeking again without consuming returns the same bits.
        assert_eq!(reader.advance_to_nth_bit(4), 0b1100);
        reader.consume(4);
        assert_eq!(reader.advance_to_nth_bit(8), 0b1010_0101);
        reader.consume(8);
        assert_eq!(reader.consumed_bytes(), 2);

        // Peeking past the end pads with zeros.
        reader.consume(12);
        assert_eq!(reader.advance_to_nth_bit(8), 0);
    }

    #[test]
    fn single_symbol_table_decodes_without_bits() {
        let mut writer = BitWriter::default();
        write_single_symbol_table(&mut writer, 0x42);
        let data = writer.finish();

        let mut reader = HuffmanReader::new(&data);
        let mut state = HuffmanManualState::default();
        let mut table = HuffmanTable::default();
        manual_initialize_with_lut(&mut state, &mut table, &mut reader, 2).unwrap();

        assert_eq!(state.single_symbol(), Some(0x42));
    }

    #[test]
    fn empty_table_never_matches() {
        let mut writer = BitWriter::default();
        write_empty_table(&mut writer);
        let data = writer.finish();

        let mut reader = HuffmanReader::new(&data);
        let mut state = HuffmanManualState::default();
        let mut table = HuffmanTable::default();
        manual_initialize_with_lut(&mut state, &mut table, &mut reader, 2).unwrap();

        assert_eq!(state.single_symbol(), None);
        assert!(state.list.list.is_empty());
        let mut decode_reader = HuffmanReader::new(&[0xAB]);
        assert!(manual_decode(&state, &mut decode_reader).is_err());
    }

    #[test]
    fn two_symbol_lut_decode() {
        // Symbols 3 and 7, one bit each: canonical assignment gives the
        // smaller symbol code 0 and the larger code 1.
        let (state, table, _) = build_single_decoder(&[(3, 1), (7, 1)]);
        assert!(state.list.list.is_empty());

        let mut reader = HuffmanReader::new(&[0b0100_0000]);
        assert_eq!(lut_decode(&table, &mut reader), Some(3));
        assert_eq!(lut_decode(&table, &mut reader), Some(7));
        assert_eq!(lut_decode(&table, &mut reader), Some(3));
    }

    #[test]
    fn uneven_lengths_decode() {
        // 1-bit, 2-bit and 3-bit codes. Canonical assignment walks the
        // (length asc, symbol desc) order backwards, so: 40 -> 000,
        // 50 -> 001, 30 -> 01, 20 -> 1.
        let (state, table, _) = build_single_decoder(&[(20, 1), (30, 2), (40, 3), (50, 3)]);
        assert!(state.list.list.is_empty());

        // Stream: 1 | 01 | 001 | 000 | 1.
        let mut reader = HuffmanReader::new(&[0b1_01_001_00, 0b0_1000000]);
        assert_eq!(lut_decode(&table, &mut reader), Some(20));
        assert_eq!(lut_decode(&table, &mut reader), Some(30));
        assert_eq!(lut_decode(&table, &mut reader), Some(50));
        assert_eq!(lut_decode(&table, &mut reader), Some(40));
        assert_eq!(lut_decode(&table, &mut reader), Some(20));
    }

    #[test]
    fn oversized_codes_fall_back_to_list_search() {
        // Force a 14-bit code: symbols at depths 1..14 via lengths that
        // exceed the 10-bit LUT for the tail.
        let entries: Vec<(u8, u8)> = (0..14).map(|i| (i, (i + 1).min(14))).collect();
        // Lengths 1,2,3,...,13,14 with the last two sharing depth 14 is
        // not a valid Kraft tree; use 1..13 plus two 14s.
        let mut entries = entries;
        entries.truncate(13);
        entries.push((13, 13));
        // entries: lengths 1..=13 and a second 13.

        let (state, table, _) = build_single_decoder(&entries);
        assert!(!state.list.list.is_empty());

        // The all-zeros 13-bit code belongs to the deepest entry with
        // the smaller symbol among the two 13-bit codes: symbols 12 and
        // 13 share length 13; descending-symbol sort puts 13 first, so
        // the backward walk hands code 0 to symbol 12.
        let mut reader = HuffmanReader::new(&[0x00, 0x00]);
        assert_eq!(lut_decode(&table, &mut reader), None);
        assert_eq!(manual_decode(&state, &mut reader).unwrap(), 12);

        // And a short code still hits the LUT: symbol 0 has code 1.
        let mut reader = HuffmanReader::new(&[0b1000_0000]);
        assert_eq!(lut_decode(&table, &mut reader), Some(0));
    }

    #[test]
    fn triple_decoder_single_symbol_lsb() {
        // LSB: single symbol 0x44 (value 2, no MSB, no RL).
        // MSB and RL tables: empty.
        let mut writer = BitWriter::default();
        write_single_symbol_table(&mut writer, 0x44);
        write_empty_table(&mut writer);
        write_empty_table(&mut writer);
        let data = writer.finish();

        let mut reader = HuffmanReader::new(&data);
        let decoder = HuffmanTripleDecoder::initialize(&mut reader, 2).unwrap();

        // 0x44 = 0b0100_0100: bit0 clear (no msb), bit7 clear (no rl);
        // value = ((0x44 & 0x7e) - 0x40) >> 1 = 2.
        let (value, zeros) = decoder.decode(&mut reader).unwrap();
        assert_eq!((value, zeros), (2, 0));
        // Single-symbol tables consume no bits, so this repeats forever.
        let (value, zeros) = decoder.decode(&mut reader).unwrap();
        assert_eq!((value, zeros), (2, 0));
    }

    #[test]
    fn triple_decoder_lsb_with_run_length() {
        // LSB: two symbols, 1 bit each. 0xC0 signals "RL follows"
        // (bit 7) with value 0; 0x44 is a plain value 2.
        // RL: single table with two 1-bit symbols: run 5 and run 2.
        let mut writer = BitWriter::default();
        write_sparse_table(&mut writer, &[(0xC0, 1), (0x44, 1)], 2);
        write_empty_table(&mut writer); // MSB
        write_sparse_table(&mut writer, &[(0x05, 1), (0x02, 1)], 2);
        let table_bits = writer.finish();

        let mut reader = HuffmanReader::new(&table_bits);
        let decoder = HuffmanTripleDecoder::initialize(&mut reader, 2).unwrap();

        // LSB codes: 0x44 -> 0, 0xC0 -> 1. RL codes: 0x02 -> 0,
        // 0x05 -> 1.
        // Stream: 1 1 (lsb=0xC0, rl=5) then 0 (lsb=0x44).
        let mut reader = HuffmanReader::new(&[0b1_1_0_00000]);
        let (value, zeros) = decoder.decode(&mut reader).unwrap();
        assert_eq!((value, zeros), (0, 5));
        let (value, zeros) = decoder.decode(&mut reader).unwrap();
        assert_eq!((value, zeros), (2, 0));
    }

    #[test]
    fn triple_decoder_msb_extension() {
        // LSB 0x01: bit 0 set, MSB follows. MSB single symbol 0x41:
        // chained value = ((0x41 & 0x7f) << 8 | (0x01 & 0xfe)) - 0x4000
        // = 0x4100 - 0x4000 = 0x100, >> 1 = 128.
        let mut writer = BitWriter::default();
        write_single_symbol_table(&mut writer, 0x01);
        write_single_symbol_table(&mut writer, 0x41);
        write_empty_table(&mut writer);
        let data = writer.finish();

        let mut reader = HuffmanReader::new(&data);
        let decoder = HuffmanTripleDecoder::initialize(&mut reader, 2).unwrap();

        let (value, zeros) = decoder.decode(&mut reader).unwrap();
        assert_eq!((value, zeros), (128, 0));
    }

    #[test]
    fn negative_coefficients_decode() {
        // Symbol 0x02 -> value ((0x02 & 0x7e) - 0x40) >> 1 = -31.
        let mut writer = BitWriter::default();
        write_single_symbol_table(&mut writer, 0x02);
        write_empty_table(&mut writer);
        write_empty_table(&mut writer);
        let data = writer.finish();

        let mut reader = HuffmanReader::new(&data);
        let decoder = HuffmanTripleDecoder::initialize(&mut reader, 2).unwrap();
        let (value, _) = decoder.decode(&mut reader).unwrap();
        assert_eq!(value, -31);
    }

    #[test]
    fn bit_width_version_tables() {
        // Version 0 indexes with max - min + 1.
        assert_eq!(bit_width(0, 0).unwrap(), 1);
        assert_eq!(bit_width(1, 0).unwrap(), 2);
        // Version 1 drops the offset.
        assert_eq!(bit_width(0, 1).unwrap(), 1);
        assert_eq!(bit_width(1, 1).unwrap(), 1);
        // Version 2 allows a 0-width delta for uniform lengths.
        assert_eq!(bit_width(0, 2).unwrap(), 0);
        assert_eq!(bit_width(31, 2).unwrap(), 5);
    }

    #[test]
    fn max_below_min_is_rejected() {
        let mut writer = BitWriter::default();
        writer.push_bits(10, 5);
        writer.push_bits(4, 5);
        let data = writer.finish();

        let mut reader = HuffmanReader::new(&data);
        let mut state = HuffmanManualState::default();
        let mut table = HuffmanTable::default();
        assert!(matches!(
            manual_initialize_with_lut(&mut state, &mut table, &mut reader, 2),
            Err(DecodeError::HuffmanInvalid(_))
        ));
    }
}
