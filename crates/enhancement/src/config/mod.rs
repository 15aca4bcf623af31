//! Configuration block parsing.
//!
//! An enhancement picture is a sequence of size-prefixed blocks
//! (ISO/IEC 23094-2 - 7.3.3): sequence config, global config, picture
//! config, encoded data (plain or tiled), additional info and filler.
//! Parsing mutates two values owned by the caller: a [`GlobalConfig`]
//! that persists from IDR to IDR, and a [`FrameConfig`] that is reset for
//! every picture and ends up owning the picture's chunk descriptors.

use bytes::Bytes;
use lcevc_bytes_util::ByteReader;

mod additional_info;
mod global;
mod picture;
mod sequence;
pub(crate) mod types;

use crate::chunk::{self, Chunk};
use crate::enums::BlockType;
use crate::error::{DecodeError, Result};
use crate::nal::Nal;
pub use types::{Kernel, QuantMatrix};
use types::{
    BitDepth, Chroma, Crop, Deblock, DeinterlacingInfo, DequantOffsetMode, DitherType, FieldType,
    HdrInfo, LOQ_ENHANCED_COUNT, MAX_PLANES, MAX_STEP_WIDTH, PictureType, ScalingMode,
    SharpenType, TileDimensions, TileSizeCompression, TransformType, UpscaleType, UserDataConfig,
    VuiInfo, bitstream_version,
};

/// User-settable decoder options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Overrides the in-band bitstream version. When unset, the version
    /// byte is read from the first V-Nova SEI payload, or assumed current
    /// if a global config arrives first.
    pub force_bitstream_version: Option<u8>,
    /// Pins the scalar dequant/transform paths.
    pub force_scalar: bool,
}

/// Stream-scoped configuration, valid from one IDR to the next.
///
/// Mutated only by the block parsers in this module; read-only while any
/// tile decode is in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalConfig {
    /// Picture width in luma pixels.
    pub width: u16,
    /// Picture height in luma pixels.
    pub height: u16,
    /// Number of coded planes (1 or 3).
    pub num_planes: u8,
    /// Chroma subsampling.
    pub chroma: Chroma,
    /// Base-picture bit depth.
    pub base_depth: BitDepth,
    /// Enhancement bit depth.
    pub enhanced_depth: BitDepth,
    /// Whether LOQ-1 operates at the enhancement depth.
    pub loq1_use_enhanced_depth: bool,
    /// Transform shape.
    pub transform: TransformType,
    /// Coefficient layers per chunk (4 for DD, 16 for DDS).
    pub num_layers: u8,
    /// Scaling mode into each LOQ.
    pub scaling_modes: [ScalingMode; LOQ_ENHANCED_COUNT],
    /// Upscale kernel selector.
    pub upscale: UpscaleType,
    /// Upscale kernel coefficients.
    pub kernel: Kernel,
    /// Whether predicted-average upscaling is enabled.
    pub predicted_average_enabled: bool,
    /// Whether temporal prediction is enabled.
    pub temporal_enabled: bool,
    /// Whether runs of Intra block signals clear whole blocks.
    pub temporal_reduced_signalling_enabled: bool,
    /// Temporal step-width modifier (7.4.3.3, default 48).
    pub temporal_step_width_modifier: u8,
    /// Tile dimensioning class.
    pub tile_dimensions: TileDimensions,
    /// Per-plane tile width in pixels (chroma planes are shifted).
    pub tile_width: [u16; MAX_PLANES],
    /// Per-plane tile height in pixels.
    pub tile_height: [u16; MAX_PLANES],
    /// Tile count per plane and LOQ.
    pub num_tiles: [[u32; LOQ_ENHANCED_COUNT]; MAX_PLANES],
    /// Whether per-tile entropy-enabled flags are run-length compressed.
    pub per_tile_compression_enabled: bool,
    /// Compression applied to per-tile chunk sizes.
    pub tile_size_compression: TileSizeCompression,
    /// Chroma step-width multiplier (7.4.3.3, default 64).
    pub chroma_step_width_multiplier: u8,
    /// Deblocking coefficients.
    pub deblock: Deblock,
    /// Embedded user-data placement.
    pub user_data: UserDataConfig,
    /// Whether a conformance window was signalled.
    pub crop_enabled: bool,
    /// Conformance-window crop.
    pub crop: Crop,
    /// HDR signalling.
    pub hdr_info: HdrInfo,
    /// Deinterlacing signalling.
    pub deinterlacing_info: DeinterlacingInfo,
    /// Video usability information.
    pub vui_info: VuiInfo,
    /// Active bitstream version.
    pub bitstream_version: u8,
    /// Whether the version is pinned (by the host or the stream). The
    /// version byte is write-once.
    pub bitstream_version_set: bool,
    /// Whether a global config block has ever been parsed.
    pub initialized: bool,
}

impl GlobalConfig {
    /// Creates a global config. `force_bitstream_version` pins the
    /// version immediately, because it affects parsing; otherwise the
    /// version is picked up from the first V-Nova SEI payload.
    pub fn new(force_bitstream_version: Option<u8>) -> Self {
        let (version, version_set) = match force_bitstream_version {
            Some(version) => (version, true),
            None => (bitstream_version::CURRENT, false),
        };

        Self {
            width: 0,
            height: 0,
            num_planes: 0,
            chroma: Chroma::Chroma420,
            base_depth: BitDepth::Depth8,
            enhanced_depth: BitDepth::Depth8,
            loq1_use_enhanced_depth: false,
            transform: TransformType::Dd,
            num_layers: types::LAYER_COUNT_DD as u8,
            scaling_modes: [ScalingMode::Scale2D, ScalingMode::Scale0D],
            upscale: UpscaleType::Linear,
            kernel: Kernel::standard(UpscaleType::Linear),
            predicted_average_enabled: false,
            temporal_enabled: false,
            temporal_reduced_signalling_enabled: false,
            temporal_step_width_modifier: types::DEFAULT_TEMPORAL_STEP_WIDTH_MODIFIER,
            tile_dimensions: TileDimensions::None,
            tile_width: [0; MAX_PLANES],
            tile_height: [0; MAX_PLANES],
            num_tiles: [[0; LOQ_ENHANCED_COUNT]; MAX_PLANES],
            per_tile_compression_enabled: false,
            tile_size_compression: TileSizeCompression::None,
            chroma_step_width_multiplier: types::DEFAULT_CHROMA_STEP_WIDTH_MULTIPLIER,
            deblock: Deblock::default(),
            user_data: UserDataConfig::default(),
            crop_enabled: false,
            crop: Crop::default(),
            hdr_info: HdrInfo::default(),
            deinterlacing_info: DeinterlacingInfo::default(),
            vui_info: VuiInfo::default(),
            bitstream_version: version,
            bitstream_version_set: version_set,
            initialized: false,
        }
    }
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Per-picture configuration, reset between pictures. Owns the picture's
/// unencapsulated buffer and the chunk descriptors slicing into it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameConfig {
    /// Whether this picture's NAL unit is an IDR.
    pub nal_idr: bool,
    /// Whether enhancement data is present (`!no_enhancement_bit_flag`).
    pub entropy_enabled: bool,
    /// Frame or field picture.
    pub picture_type: PictureType,
    /// Field parity for field pictures.
    pub field_type: FieldType,
    /// Whether the temporal buffer refreshes this picture.
    pub temporal_refresh: bool,
    /// Whether temporal chunks are present for this picture.
    pub temporal_signalling_present: bool,
    /// Signalled step-width per LOQ, 15 bits.
    pub step_widths: [u16; LOQ_ENHANCED_COUNT],
    /// Active quantization matrices.
    pub quant_matrix: QuantMatrix,
    /// Dequantization-offset derivation mode.
    pub dequant_offset_mode: DequantOffsetMode,
    /// Signalled dequantization offset; `None` when absent.
    pub dequant_offset: Option<u8>,
    /// Whether dithering is enabled.
    pub dither_enabled: bool,
    /// Dither algorithm.
    pub dither_type: DitherType,
    /// Dither strength, 5 bits.
    pub dither_strength: u8,
    /// Whether LOQ-1 deblocking is enabled.
    pub deblock_enabled: bool,
    /// Sharpening filter selector.
    pub sharpen_type: SharpenType,
    /// Sharpening strength in [0.01, 0.32].
    pub sharpen_strength: f32,
    /// Whether each LOQ has any entropy-coded data this picture.
    pub loq_enabled: [bool; LOQ_ENHANCED_COUNT],
    /// Whether a global config block arrived in this picture.
    pub global_config_set: bool,
    /// Whether a picture config block arrived in this picture.
    pub frame_config_set: bool,
    /// Flat chunk array; see [`crate::chunk`] for the index layout.
    pub(crate) chunks: Vec<Chunk>,
    /// `(plane, LOQ) -> first residual chunk` index table.
    pub(crate) tile_chunk_residual_index: [[u32; LOQ_ENHANCED_COUNT]; MAX_PLANES],
    /// `plane -> first temporal chunk` index table.
    pub(crate) tile_chunk_temporal_index: [u32; MAX_PLANES],
    /// The unencapsulated NAL body all chunk data slices into.
    pub(crate) unencapsulated: Bytes,
}

impl FrameConfig {
    /// Creates an empty frame config.
    pub fn new() -> Self {
        Self {
            step_widths: [MAX_STEP_WIDTH; LOQ_ENHANCED_COUNT],
            ..Self::default()
        }
    }

    /// Clears the per-picture parse state. Chunk storage is retained for
    /// reuse; quantization matrices, dither and sharpen state persist
    /// across pictures (7.4.3.4).
    pub fn reset(&mut self) {
        self.global_config_set = false;
        self.frame_config_set = false;
        self.loq_enabled = [false; LOQ_ENHANCED_COUNT];
        self.chunks.clear();
    }

    /// The number of chunk descriptors held for the current picture.
    pub fn num_chunks(&self) -> usize {
        self.chunks.len()
    }
}

/// Parses one encapsulated NAL unit into the configs.
///
/// Returns `true` when the global config was modified by this picture
/// (sequence config, global config, or a global additional-info payload),
/// which tells the host to re-derive downstream state.
pub fn parse_configs(
    data: &[u8],
    global: &mut GlobalConfig,
    frame: &mut FrameConfig,
) -> Result<bool> {
    let nal = Nal::unencapsulate(data)?;

    frame.nal_idr = nal.is_idr;
    frame.unencapsulated = nal.body;
    frame.frame_config_set = false;
    frame.global_config_set = false;
    frame.loq_enabled = [false; LOQ_ENHANCED_COUNT];
    frame.chunks.clear();

    let body = frame.unencapsulated.clone();
    let mut reader = ByteReader::new(&body)?;
    let mut global_modified = false;

    while reader.remaining() > 0 {
        parse_block(&mut reader, &body, global, frame, &mut global_modified)?;
    }

    Ok(global_modified)
}

/// Signalled block-size classes: 0..5 are literal sizes, 6 is reserved,
/// 7 prefixes a multi-byte custom size.
const BLOCK_SIZE_CUSTOM: u8 = 7;
const BLOCK_SIZE_RESERVED: u8 = 6;

fn parse_block(
    reader: &mut ByteReader<'_>,
    body: &Bytes,
    global: &mut GlobalConfig,
    frame: &mut FrameConfig,
    global_modified: &mut bool,
) -> Result<()> {
    let header = reader.read_u8()?;
    let block_type = BlockType::from(header & 0x1F);
    let size_signal = (header & 0xE0) >> 5;

    let block_size = match size_signal {
        BLOCK_SIZE_CUSTOM => {
            let custom = reader.read_multi_byte()?;
            if custom > u64::from(u32::MAX) {
                return Err(DecodeError::EntropyOverflow("custom block size exceeds 32 bits"));
            }
            custom as usize
        }
        BLOCK_SIZE_RESERVED => {
            return Err(DecodeError::UnsupportedFeature("reserved block size class"));
        }
        literal => usize::from(literal),
    };

    let initial_offset = reader.offset();
    tracing::trace!(block = ?block_type, size = block_size, "parsing block");

    match block_type {
        BlockType::SequenceConfig => {
            *global_modified = true;
            sequence::parse_block_sequence_config(reader, global)?;
        }
        BlockType::GlobalConfig => {
            *global_modified = true;
            frame.global_config_set = true;
            global::parse_block_global_config(reader, global)?;
        }
        BlockType::PictureConfig => {
            picture::parse_block_picture_config(reader, frame, global)?;
        }
        BlockType::EncodedData => {
            chunk::parse_encoded_data(reader, body, global, frame)?;
        }
        BlockType::EncodedDataTiled => {
            chunk::parse_encoded_data_tiled(reader, body, global, frame)?;
        }
        BlockType::AdditionalInfo => {
            additional_info::parse_block_additional_info(
                reader,
                block_size,
                global,
                frame,
                global_modified,
            )?;
        }
        BlockType::Filler => {
            reader.seek(block_size)?;
        }
        unknown => {
            tracing::warn!(block = unknown.0, "unrecognized block type, skipping");
            reader.seek(block_size)?;
        }
    }

    let consumed = reader.offset() - initial_offset;
    if consumed != block_size {
        tracing::error!(
            block = block_type.0,
            signalled = block_size,
            consumed,
            "block parser did not consume the signalled size"
        );
        return Err(DecodeError::StreamDesync {
            block: block_type.0,
            signalled: block_size,
            consumed,
        });
    }

    Ok(())
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;
    use crate::tests::encapsulate;

    #[test]
    fn filler_blocks_are_skipped() {
        // Filler (type 6) with literal size 3, then filler with size 0.
        let body = [0x66, 0xAA, 0xAA, 0xAA, 0x06];
        let data = encapsulate(&body, true, false);

        let mut global = GlobalConfig::default();
        let mut frame = FrameConfig::new();
        let modified = parse_configs(&data, &mut global, &mut frame).unwrap();

        assert!(!modified);
        assert!(frame.nal_idr);
        assert!(!frame.frame_config_set);
    }

    #[test]
    fn unknown_block_types_are_skipped() {
        // Type 0x1E does not exist; signalled size 2.
        let body = [0x5E, 0x00, 0x00];
        let data = encapsulate(&body, false, false);

        let mut global = GlobalConfig::default();
        let mut frame = FrameConfig::new();
        parse_configs(&data, &mut global, &mut frame).unwrap();
        assert!(!frame.nal_idr);
    }

    #[test]
    fn reserved_size_class_is_rejected() {
        let body = [0xC6];
        let data = encapsulate(&body, true, false);

        let mut global = GlobalConfig::default();
        let mut frame = FrameConfig::new();
        assert!(matches!(
            parse_configs(&data, &mut global, &mut frame),
            Err(DecodeError::UnsupportedFeature(_))
        ));
    }

    #[test]
    fn desync_is_reported() {
        // Sequence config whose signalled size (5) exceeds what the
        // parser consumes (2 bytes with no extended profile or crop).
        let body = [0xA0, 0x12, 0x00, 0xFF, 0xFF, 0xFF];
        let data = encapsulate(&body, true, false);

        let mut global = GlobalConfig::default();
        let mut frame = FrameConfig::new();
        assert!(matches!(
            parse_configs(&data, &mut global, &mut frame),
            Err(DecodeError::StreamDesync { block: 0, signalled: 5, consumed: 2 })
        ));
    }
}
