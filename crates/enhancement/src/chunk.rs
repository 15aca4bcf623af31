//! Chunk descriptors and the encoded-data block parsers.
//!
//! A picture's compressed payload is a flat array of chunks, one per
//! `(plane, LOQ, tile, layer)` plus one temporal chunk per
//! `(plane, tile)` when temporal signalling is present:
//!
//! ```text
//! N = sum over planes [ entropy ? (tiles[L0] + tiles[L1]) * layers : 0 ]
//!   + sum over planes [ temporal ? tiles[L0] : 0 ]
//! ```
//!
//! Residual chunks for `(plane, LOQ)` are contiguous starting at
//! `tile_chunk_residual_index[plane][loq]`, indexed by
//! `tile * num_layers + layer`; temporal chunks start at
//! `tile_chunk_temporal_index[plane]`.

use bytes::Bytes;
use lcevc_bytes_util::{BitReader, ByteReader};

use crate::config::types::{LOQ_ENHANCED_COUNT, LoqIndex, MAX_PLANES, TileSizeCompression};
use crate::config::{FrameConfig, GlobalConfig};
use crate::entropy::{EntropyDecoder, EntropyDecoderType};
use crate::error::{DecodeError, Result};

/// One chunk of compressed data: the coefficients of a single layer of
/// one tile, or one tile's temporal signal.
///
/// `data` is a reference-counted slice of the picture's unencapsulated
/// buffer, owned by the [`FrameConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chunk {
    /// Compressed payload (Huffman tables + symbols, or raw RLE bytes).
    pub data: Bytes,
    /// Whether this chunk carries any data at all.
    pub entropy_enabled: bool,
    /// Whether symbols are raw bytes instead of Huffman codes.
    pub rle_only: bool,
}

impl Chunk {
    /// Payload size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Whether the current picture carries temporal chunks (8.3.5.2).
pub(crate) fn temporal_chunk_enabled(frame: &FrameConfig, global: &GlobalConfig) -> bool {
    if frame.entropy_enabled {
        global.temporal_enabled && !frame.temporal_refresh
    } else {
        global.temporal_enabled && !frame.temporal_refresh && frame.temporal_signalling_present
    }
}

/// Index of one residual chunk in the flat array.
pub(crate) fn layer_chunk_index(
    frame: &FrameConfig,
    global: &GlobalConfig,
    loq: LoqIndex,
    plane: u32,
    tile: u32,
    layer: u32,
) -> usize {
    let base = frame.tile_chunk_residual_index[plane as usize][loq as usize];
    (base + tile * u32::from(global.num_layers) + layer) as usize
}

/// The `num_layers` residual chunks of one `(plane, LOQ, tile)`, or
/// `None` when enhancement is disabled this picture.
pub(crate) fn layer_chunks<'f>(
    global: &GlobalConfig,
    frame: &'f FrameConfig,
    plane: u32,
    loq: LoqIndex,
    tile: u32,
) -> Result<Option<&'f [Chunk]>> {
    if plane >= u32::from(global.num_planes) {
        return Err(DecodeError::InvalidArgument("plane index out of range"));
    }
    if tile >= global.num_tiles[plane as usize][loq as usize] {
        return Err(DecodeError::InvalidArgument("tile index out of range"));
    }

    if !frame.entropy_enabled || frame.chunks.is_empty() {
        return Ok(None);
    }

    let start = layer_chunk_index(frame, global, loq, plane, tile, 0);
    let end = start + usize::from(global.num_layers);
    frame
        .chunks
        .get(start..end)
        .map(Some)
        .ok_or(DecodeError::InvalidArgument("chunk index out of range"))
}

/// The temporal chunk of one `(plane, tile)`, or `None` when temporal
/// signalling is absent this picture.
pub(crate) fn temporal_chunk<'f>(
    global: &GlobalConfig,
    frame: &'f FrameConfig,
    plane: u32,
    tile: u32,
) -> Result<Option<&'f Chunk>> {
    if plane >= u32::from(global.num_planes) {
        return Err(DecodeError::InvalidArgument("plane index out of range"));
    }
    if tile >= global.num_tiles[plane as usize][LoqIndex::Loq0 as usize] {
        return Err(DecodeError::InvalidArgument("tile index out of range"));
    }

    if !temporal_chunk_enabled(frame, global) || frame.chunks.is_empty() {
        return Ok(None);
    }

    let index = (frame.tile_chunk_temporal_index[plane as usize] + tile) as usize;
    frame
        .chunks
        .get(index)
        .map(Some)
        .ok_or(DecodeError::InvalidArgument("chunk index out of range"))
}

/// Precomputes the chunk index tables for the current picture.
fn calculate_tile_chunk_indices(frame: &mut FrameConfig, global: &GlobalConfig) {
    let mut offset = 0u32;

    frame.tile_chunk_residual_index = [[0; LOQ_ENHANCED_COUNT]; MAX_PLANES];
    frame.tile_chunk_temporal_index = [0; MAX_PLANES];

    for plane in 0..usize::from(global.num_planes) {
        if frame.entropy_enabled {
            for loq in LoqIndex::ENHANCED {
                let tile_count = global.num_tiles[plane][loq as usize];
                frame.tile_chunk_residual_index[plane][loq as usize] = offset;
                offset += tile_count * u32::from(global.num_layers);
            }
        }

        // Sized on the same predicate as the allocation so the table
        // stays consistent even when temporal decode ends up disabled.
        if frame.temporal_signalling_present {
            frame.tile_chunk_temporal_index[plane] = offset;
            offset += global.num_tiles[plane][LoqIndex::Loq0 as usize];
        }
    }
}

/// Sizes the chunk array for the current picture; growth is fallible so
/// exhaustion surfaces as an error with no partial state.
fn chunk_check_alloc(frame: &mut FrameConfig, global: &GlobalConfig) -> Result<()> {
    let mut chunk_count = 0usize;

    if frame.entropy_enabled {
        for plane in 0..usize::from(global.num_planes) {
            let tiles = global.num_tiles[plane][LoqIndex::Loq0 as usize]
                + global.num_tiles[plane][LoqIndex::Loq1 as usize];
            chunk_count += tiles as usize * usize::from(global.num_layers);
        }
    }

    if frame.temporal_signalling_present {
        for plane in 0..usize::from(global.num_planes) {
            chunk_count += global.num_tiles[plane][LoqIndex::Loq0 as usize] as usize;
        }
    }

    frame.chunks.clear();
    frame.chunks.try_reserve(chunk_count)?;
    frame.chunks.resize(chunk_count, Chunk::default());

    tracing::trace!(chunk_count, "chunk array sized");

    Ok(())
}

/// Reads one chunk's size and takes its data slice off the stream.
fn parse_chunk(
    reader: &mut ByteReader<'_>,
    body: &Bytes,
    chunk: &mut Chunk,
    loq_entropy_enabled: Option<&mut bool>,
    size_decoder: Option<&mut TiledSizeDecoder>,
) -> Result<()> {
    chunk.data = Bytes::new();

    if !chunk.entropy_enabled {
        return Ok(());
    }

    let size = match size_decoder {
        Some(decoder) => {
            let size = decoder.read()?;
            if size < 0 {
                return Err(DecodeError::EntropyOverflow("negative compressed chunk size"));
            }
            size as usize
        }
        None => {
            let size = reader.read_multi_byte()?;
            usize::try_from(size)
                .map_err(|_| DecodeError::EntropyOverflow("chunk size exceeds usize"))?
        }
    };

    if let Some(flag) = loq_entropy_enabled {
        *flag = true;
    }

    let offset = reader.offset();
    reader.seek(size)?;
    chunk.data = body.slice(offset..offset + size);

    Ok(())
}

/// Per-chunk `(entropy_enabled, rle_only)` flag pairs, non-tiled form.
fn parse_chunk_flags(bits: &mut BitReader<'_>, chunks: &mut [Chunk]) -> Result<()> {
    for chunk in chunks {
        chunk.entropy_enabled = bits.read_bit()?;
        chunk.rle_only = bits.read_bit()?;
    }
    Ok(())
}

/// Parses an encoded-data block (non-tiled), ISO/IEC 23094-2 - 7.3.7.
///
/// Layout: a bit-packed flag pair per chunk, byte alignment, then each
/// chunk as a multi-byte size followed by its data. LOQ-1 precedes
/// LOQ-0 within each plane; the temporal chunk trails the plane.
pub(crate) fn parse_encoded_data(
    reader: &mut ByteReader<'_>,
    body: &Bytes,
    global: &GlobalConfig,
    frame: &mut FrameConfig,
) -> Result<()> {
    check_preconditions(global, frame)?;

    calculate_tile_chunk_indices(frame, global);
    chunk_check_alloc(frame, global)?;

    // Flag pass.
    let mut bits = BitReader::new(reader.current())?;

    for plane in 0..u32::from(global.num_planes) {
        if frame.entropy_enabled {
            for loq in [LoqIndex::Loq1, LoqIndex::Loq0] {
                let start = layer_chunk_index(frame, global, loq, plane, 0, 0);
                let end = start + usize::from(global.num_layers);
                parse_chunk_flags(&mut bits, &mut frame.chunks[start..end])?;
            }
        }

        if frame.temporal_signalling_present {
            let index = frame.tile_chunk_temporal_index[plane as usize] as usize;
            parse_chunk_flags(&mut bits, &mut frame.chunks[index..=index])?;
        }
    }

    // Byte-align the outer stream past the flags.
    reader.seek(bits.consumed_bytes())?;

    // Data pass.
    for plane in 0..u32::from(global.num_planes) {
        if frame.entropy_enabled {
            for loq in [LoqIndex::Loq1, LoqIndex::Loq0] {
                let start = layer_chunk_index(frame, global, loq, plane, 0, 0);

                for layer in 0..usize::from(global.num_layers) {
                    parse_chunk(
                        reader,
                        body,
                        &mut frame.chunks[start + layer],
                        Some(&mut frame.loq_enabled[loq as usize]),
                        None,
                    )?;
                }
            }
        }

        if frame.temporal_signalling_present {
            let index = frame.tile_chunk_temporal_index[plane as usize] as usize;
            parse_chunk(
                reader,
                body,
                &mut frame.chunks[index],
                Some(&mut frame.loq_enabled[LoqIndex::Loq0 as usize]),
                None,
            )?;
        }
    }

    Ok(())
}

/// Parses a tiled encoded-data block, ISO/IEC 23094-2 - 7.3.8.
///
/// Layout: per-layer RLE-only bits (broadcast to every tile), byte
/// alignment, per-tile entropy-enabled flags (flat bits or a run-length
/// stream when per-tile compression is on), byte alignment, then chunk
/// data with sizes either inline multi-byte or from a compressed size
/// array per layer.
pub(crate) fn parse_encoded_data_tiled(
    reader: &mut ByteReader<'_>,
    body: &Bytes,
    global: &GlobalConfig,
    frame: &mut FrameConfig,
) -> Result<()> {
    check_preconditions(global, frame)?;

    if global.tile_width[0] == 0 || global.tile_height[0] == 0 {
        return Err(DecodeError::InvalidArgument("tile dimensions must not be 0"));
    }

    calculate_tile_chunk_indices(frame, global);
    chunk_check_alloc(frame, global)?;

    if !frame.entropy_enabled && !frame.temporal_signalling_present {
        return Ok(());
    }

    parse_tiled_rle_only_flags(reader, global, frame)?;
    parse_tiled_entropy_enabled_flags(reader, global, frame)?;
    parse_tiled_chunk_data(reader, body, global, frame)
}

/// RLE-only bits: one per `(plane, LOQ, layer)`, broadcast to all tiles
/// of that layer; one per plane for the temporal layer.
fn parse_tiled_rle_only_flags(
    reader: &mut ByteReader<'_>,
    global: &GlobalConfig,
    frame: &mut FrameConfig,
) -> Result<()> {
    let mut bits = BitReader::new(reader.current())?;

    for plane in 0..u32::from(global.num_planes) {
        if frame.entropy_enabled {
            for loq in [LoqIndex::Loq1, LoqIndex::Loq0] {
                let tile_count = global.num_tiles[plane as usize][loq as usize];

                for layer in 0..u32::from(global.num_layers) {
                    let rle_only = bits.read_bit()?;

                    for tile in 0..tile_count {
                        let index = layer_chunk_index(frame, global, loq, plane, tile, layer);
                        frame.chunks[index].rle_only = rle_only;
                    }
                }
            }
        }

        if frame.temporal_signalling_present {
            let rle_only = bits.read_bit()?;
            let tile_count = global.num_tiles[plane as usize][LoqIndex::Loq0 as usize];
            let base = frame.tile_chunk_temporal_index[plane as usize] as usize;

            for tile in 0..tile_count as usize {
                frame.chunks[base + tile].rle_only = rle_only;
            }
        }
    }

    reader.seek(bits.consumed_bytes())?;
    Ok(())
}

/// Entropy-enabled flags: flat bits, or alternating-run RLE when
/// per-tile compression is enabled.
fn parse_tiled_entropy_enabled_flags(
    reader: &mut ByteReader<'_>,
    global: &GlobalConfig,
    frame: &mut FrameConfig,
) -> Result<()> {
    let mut chunk_indices: Vec<usize> = Vec::new();

    for plane in 0..u32::from(global.num_planes) {
        if frame.entropy_enabled {
            for loq in [LoqIndex::Loq1, LoqIndex::Loq0] {
                let tile_count = global.num_tiles[plane as usize][loq as usize];

                for layer in 0..u32::from(global.num_layers) {
                    for tile in 0..tile_count {
                        chunk_indices
                            .push(layer_chunk_index(frame, global, loq, plane, tile, layer));
                    }
                }
            }
        }

        if frame.temporal_signalling_present {
            let tile_count = global.num_tiles[plane as usize][LoqIndex::Loq0 as usize];
            let base = frame.tile_chunk_temporal_index[plane as usize] as usize;
            chunk_indices.extend((0..tile_count as usize).map(|tile| base + tile));
        }
    }

    if global.per_tile_compression_enabled {
        // The run-length form consumes the byte stream directly.
        let mut decoder = TiledRleDecoder::new(reader)?;
        for index in chunk_indices {
            frame.chunks[index].entropy_enabled = decoder.read()?;
        }
    } else {
        // The flat form is bit-packed and realigns afterwards.
        let mut bits = BitReader::new(reader.current())?;
        for index in chunk_indices {
            frame.chunks[index].entropy_enabled = bits.read_bit()?;
        }
        reader.seek(bits.consumed_bytes())?;
    }

    Ok(())
}

/// Chunk data pass: per layer, optionally a compressed size array for
/// the enabled tiles, then every tile's chunk slice.
fn parse_tiled_chunk_data(
    reader: &mut ByteReader<'_>,
    body: &Bytes,
    global: &GlobalConfig,
    frame: &mut FrameConfig,
) -> Result<()> {
    let compressed_sizes = global.tile_size_compression != TileSizeCompression::None;

    for plane in 0..u32::from(global.num_planes) {
        if frame.entropy_enabled {
            for loq in [LoqIndex::Loq1, LoqIndex::Loq0] {
                let tile_count = global.num_tiles[plane as usize][loq as usize];

                for layer in 0..u32::from(global.num_layers) {
                    let mut size_decoder = if compressed_sizes {
                        let enabled = (0..tile_count)
                            .filter(|&tile| {
                                let index =
                                    layer_chunk_index(frame, global, loq, plane, tile, layer);
                                frame.chunks[index].entropy_enabled
                            })
                            .count();
                        TiledSizeDecoder::new(
                            reader,
                            enabled,
                            global.tile_size_compression,
                            global.bitstream_version,
                        )?
                    } else {
                        None
                    };

                    for tile in 0..tile_count {
                        let index = layer_chunk_index(frame, global, loq, plane, tile, layer);
                        parse_chunk(
                            reader,
                            body,
                            &mut frame.chunks[index],
                            Some(&mut frame.loq_enabled[loq as usize]),
                            size_decoder.as_mut(),
                        )?;
                    }
                }
            }
        }

        if frame.temporal_signalling_present {
            let tile_count = global.num_tiles[plane as usize][LoqIndex::Loq0 as usize];
            let base = frame.tile_chunk_temporal_index[plane as usize] as usize;

            let mut size_decoder = if compressed_sizes {
                let enabled = (0..tile_count as usize)
                    .filter(|&tile| frame.chunks[base + tile].entropy_enabled)
                    .count();
                TiledSizeDecoder::new(
                    reader,
                    enabled,
                    global.tile_size_compression,
                    global.bitstream_version,
                )?
            } else {
                None
            };

            for tile in 0..tile_count as usize {
                parse_chunk(
                    reader,
                    body,
                    &mut frame.chunks[base + tile],
                    Some(&mut frame.loq_enabled[LoqIndex::Loq0 as usize]),
                    size_decoder.as_mut(),
                )?;
            }
        }
    }

    Ok(())
}

fn check_preconditions(global: &GlobalConfig, frame: &FrameConfig) -> Result<()> {
    if !global.initialized {
        return Err(DecodeError::InvalidArgument("no global config block received yet"));
    }
    if !frame.frame_config_set {
        return Err(DecodeError::InvalidArgument("no picture config block received yet"));
    }
    Ok(())
}

/// Alternating-run decoder for the per-tile entropy-enabled flags: an
/// initial raw symbol (0 or 1) and multi-byte run lengths, flipping on
/// every exhausted run.
struct TiledRleDecoder<'a, 'r> {
    reader: &'a mut ByteReader<'r>,
    current_symbol: bool,
    run_length: u64,
}

impl<'a, 'r> TiledRleDecoder<'a, 'r> {
    fn new(reader: &'a mut ByteReader<'r>) -> Result<Self> {
        let symbol = reader.read_u8()?;
        if symbol > 0x01 {
            return Err(DecodeError::EntropyOverflow("RLE initial symbol is not a bit"));
        }
        let run_length = reader.read_multi_byte()?;

        Ok(Self {
            reader,
            current_symbol: symbol != 0,
            run_length,
        })
    }

    fn read(&mut self) -> Result<bool> {
        if self.run_length == 0 {
            self.run_length = self.reader.read_multi_byte()?;
            self.current_symbol = !self.current_symbol;

            if self.run_length == 0 {
                // A zero-length run stands for "no more flags".
                return Ok(self.current_symbol);
            }
        }

        self.run_length -= 1;
        Ok(self.current_symbol)
    }
}

/// Decodes a layer's compressed chunk-size array up front, then hands
/// the sizes out one at a time. `PrefixOnDiff` streams carry deltas and
/// need an inclusive prefix sum.
struct TiledSizeDecoder {
    sizes: Vec<i16>,
    current: usize,
}

impl TiledSizeDecoder {
    /// Returns `None` when no sizes are signalled (no enabled chunks).
    fn new(
        reader: &mut ByteReader<'_>,
        num_sizes: usize,
        compression: TileSizeCompression,
        bitstream_version: u8,
    ) -> Result<Option<Self>> {
        if num_sizes == 0 {
            return Ok(None);
        }

        let decoder_type = if compression == TileSizeCompression::Prefix {
            EntropyDecoderType::SizeUnsigned
        } else {
            EntropyDecoderType::SizeSigned
        };

        // The size stream's length is unknown until decoded; hand the
        // whole remainder to the entropy decoder and advance by what it
        // consumed.
        let chunk = Chunk {
            data: Bytes::copy_from_slice(reader.current()),
            entropy_enabled: true,
            rle_only: false,
        };

        let mut entropy = EntropyDecoder::new(&chunk, decoder_type, bitstream_version)?;

        let mut sizes = Vec::new();
        sizes.try_reserve(num_sizes)?;
        for _ in 0..num_sizes {
            sizes.push(entropy.decode_size()?);
        }

        let consumed = entropy.consumed_bytes();
        reader.seek(consumed)?;

        if compression == TileSizeCompression::PrefixOnDiff {
            for i in 1..sizes.len() {
                sizes[i] = sizes[i].wrapping_add(sizes[i - 1]);
            }
        }

        Ok(Some(Self { sizes, current: 0 }))
    }

    fn read(&mut self) -> Result<i16> {
        let Some(&size) = self.sizes.get(self.current) else {
            return Err(DecodeError::EntropyOverflow("compressed size array exhausted"));
        };
        self.current += 1;
        Ok(size)
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    fn byte_reader(data: &[u8]) -> ByteReader<'_> {
        ByteReader::new(data).unwrap()
    }

    #[test]
    fn tiled_rle_decoder_alternates() {
        // Initial symbol 1, runs: 3, then 2, then 1.
        let data = [0x01, 0x03, 0x02, 0x01];
        let mut reader = byte_reader(&data);
        let mut decoder = TiledRleDecoder::new(&mut reader).unwrap();

        let flags: Vec<bool> = (0..6).map(|_| decoder.read().unwrap()).collect();
        assert_eq!(flags, [true, true, true, false, false, true]);
    }

    #[test]
    fn tiled_rle_decoder_rejects_bad_symbol() {
        let data = [0x02, 0x03];
        let mut reader = byte_reader(&data);
        assert!(TiledRleDecoder::new(&mut reader).is_err());
    }

    #[test]
    fn size_decoder_prefix_on_diff_accumulates() {
        // Build a signed size stream of deltas 10, -3, 4 via
        // single-symbol tables: that requires actual huffman data, so
        // instead use distinct 1-bit codes for the two deltas in play.
        // Simpler: single symbol LSB = (10 << 1) -> every size is 10.
        let mut writer = crate::tests::BitWriter::default();
        crate::huffman::tests::write_single_symbol_table(&mut writer, 10 << 1);
        crate::huffman::tests::write_empty_table(&mut writer);
        let stream = writer.finish();

        let mut reader = byte_reader(&stream);
        let mut decoder = TiledSizeDecoder::new(
            &mut reader,
            3,
            TileSizeCompression::PrefixOnDiff,
            2,
        )
        .unwrap()
        .unwrap();

        // Deltas 10, 10, 10 prefix-sum to 10, 20, 30.
        assert_eq!(decoder.read().unwrap(), 10);
        assert_eq!(decoder.read().unwrap(), 20);
        assert_eq!(decoder.read().unwrap(), 30);
        assert!(decoder.read().is_err());
    }

    #[test]
    fn size_decoder_none_when_no_chunks() {
        let data = [0xFF];
        let mut reader = byte_reader(&data);
        let decoder =
            TiledSizeDecoder::new(&mut reader, 0, TileSizeCompression::Prefix, 2).unwrap();
        assert!(decoder.is_none());
        assert_eq!(reader.remaining(), 1);
    }
}
