//! Closed configuration enums, standard tables and small value types.
//!
//! Wire values that admit unknown codes live in [`crate::enums`]; the
//! types here are closed sets defined by ISO/IEC 23094-2 and reject
//! reserved values at parse time.

use crate::error::{DecodeError, Result};

/// Maximum number of picture planes (Y, U, V).
pub const MAX_PLANES: usize = 3;

/// Number of enhanced levels of quality (LOQ-0 and LOQ-1).
pub const LOQ_ENHANCED_COUNT: usize = 2;

/// Coefficient layer counts per transform type.
pub const LAYER_COUNT_DD: usize = 4;
/// See [`LAYER_COUNT_DD`].
pub const LAYER_COUNT_DDS: usize = 16;

/// Step-width domain, ISO/IEC 23094-2 - 8.5.3.
pub const MIN_STEP_WIDTH: u16 = 1;
/// See [`MIN_STEP_WIDTH`].
pub const MAX_STEP_WIDTH: u16 = 32767;

/// Default deblocking coefficient, 8.9.2.
pub const DEFAULT_DEBLOCK_COEFFICIENT: u32 = 16;
/// Default temporal step-width modifier, 7.4.3.3.
pub const DEFAULT_TEMPORAL_STEP_WIDTH_MODIFIER: u8 = 48;
/// Default chroma step-width multiplier, 7.4.3.3.
pub const DEFAULT_CHROMA_STEP_WIDTH_MULTIPLIER: u8 = 64;

/// Bitstream version constants. The version byte is not part of the
/// standard; it arrives in a V-Nova SEI payload and selects the Huffman
/// length-width table and picture-config tail behaviour.
pub mod bitstream_version {
    /// First deployed version.
    pub const INITIAL: u8 = 0;
    /// Changed the Huffman code-length width table indexing.
    pub const NEW_CODE_LENGTHS: u8 = 1;
    /// Aligned picture-config parsing with the published standard.
    pub const ALIGN_WITH_SPEC: u8 = 2;
    /// Version assumed when the stream never signals one.
    pub const CURRENT: u8 = ALIGN_WITH_SPEC;
}

/// Level of quality. LOQ-0 is the full-resolution enhancement level,
/// LOQ-1 is one scale step down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LoqIndex {
    /// Full-resolution enhancement sub-layer.
    Loq0 = 0,
    /// Reduced-resolution enhancement sub-layer.
    Loq1 = 1,
}

impl LoqIndex {
    /// Both enhanced LOQs, in index order.
    pub const ENHANCED: [LoqIndex; LOQ_ENHANCED_COUNT] = [LoqIndex::Loq0, LoqIndex::Loq1];
}

/// The two standardized transform shapes, 7.4.3.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformType {
    /// Directional decomposition, 2x2 pixels, 4 coefficients.
    Dd = 0,
    /// Directional decomposition squared, 4x4 pixels, 16 coefficients.
    Dds = 1,
}

impl TransformType {
    pub(crate) const fn from_raw(raw: u8) -> Result<Self> {
        match raw {
            0 => Ok(TransformType::Dd),
            1 => Ok(TransformType::Dds),
            _ => Err(DecodeError::UnsupportedFeature("unrecognized transform type")),
        }
    }

    /// Number of coefficient layers.
    pub const fn layer_count(self) -> usize {
        match self {
            TransformType::Dd => LAYER_COUNT_DD,
            TransformType::Dds => LAYER_COUNT_DDS,
        }
    }

    /// Log2 of the transform-unit side in pixels (1 for DD, 2 for DDS).
    pub const fn tu_shift(self) -> u8 {
        match self {
            TransformType::Dd => 1,
            TransformType::Dds => 2,
        }
    }

    /// Transform-unit side in pixels.
    pub const fn tu_size(self) -> u16 {
        1 << self.tu_shift()
    }
}

/// Chroma subsampling, 7.4.3.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Chroma {
    /// Single plane.
    Monochrome = 0,
    /// 4:2:0.
    Chroma420 = 1,
    /// 4:2:2.
    Chroma422 = 2,
    /// 4:4:4.
    Chroma444 = 3,
}

impl Chroma {
    pub(crate) const fn from_raw(raw: u8) -> Result<Self> {
        match raw {
            0 => Ok(Chroma::Monochrome),
            1 => Ok(Chroma::Chroma420),
            2 => Ok(Chroma::Chroma422),
            3 => Ok(Chroma::Chroma444),
            _ => Err(DecodeError::UnsupportedFeature("unrecognized chroma type")),
        }
    }

    /// Horizontal chroma downsample shift.
    pub const fn shift_width(self) -> u16 {
        match self {
            Chroma::Chroma420 | Chroma::Chroma422 => 1,
            Chroma::Monochrome | Chroma::Chroma444 => 0,
        }
    }

    /// Vertical chroma downsample shift.
    pub const fn shift_height(self) -> u16 {
        match self {
            Chroma::Chroma420 => 1,
            Chroma::Chroma422 | Chroma::Monochrome | Chroma::Chroma444 => 0,
        }
    }
}

/// Sample bit depth, 7.4.3.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BitDepth {
    /// 8 bits per sample.
    Depth8 = 0,
    /// 10 bits per sample.
    Depth10 = 1,
    /// 12 bits per sample.
    Depth12 = 2,
    /// 14 bits per sample.
    Depth14 = 3,
}

impl BitDepth {
    pub(crate) const fn from_raw(raw: u8) -> Result<Self> {
        match raw {
            0 => Ok(BitDepth::Depth8),
            1 => Ok(BitDepth::Depth10),
            2 => Ok(BitDepth::Depth12),
            3 => Ok(BitDepth::Depth14),
            _ => Err(DecodeError::UnsupportedFeature("unrecognized bit depth")),
        }
    }

    /// The depth in bits.
    pub const fn bits(self) -> u8 {
        match self {
            BitDepth::Depth8 => 8,
            BitDepth::Depth10 => 10,
            BitDepth::Depth12 => 12,
            BitDepth::Depth14 => 14,
        }
    }
}

/// Scaling mode between two LOQs, 7.4.3.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalingMode {
    /// No upscale.
    Scale0D = 0,
    /// Horizontal-only upscale.
    Scale1D = 1,
    /// Horizontal and vertical upscale.
    Scale2D = 2,
}

impl ScalingMode {
    pub(crate) const fn from_raw(raw: u8) -> Result<Self> {
        match raw {
            0 => Ok(ScalingMode::Scale0D),
            1 => Ok(ScalingMode::Scale1D),
            2 => Ok(ScalingMode::Scale2D),
            _ => Err(DecodeError::UnsupportedFeature("unrecognized scaling mode")),
        }
    }
}

/// Upscale kernel selector, 7.4.3.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpscaleType {
    /// Nearest neighbour.
    Nearest = 0,
    /// Bilinear.
    Linear = 1,
    /// Bicubic (a = -0.6).
    Cubic = 2,
    /// Modified cubic.
    ModifiedCubic = 3,
    /// Cubic with coefficients signalled in the global config.
    AdaptiveCubic = 4,
}

impl UpscaleType {
    pub(crate) const fn from_raw(raw: u8) -> Result<Self> {
        match raw {
            0 => Ok(UpscaleType::Nearest),
            1 => Ok(UpscaleType::Linear),
            2 => Ok(UpscaleType::Cubic),
            3 => Ok(UpscaleType::ModifiedCubic),
            4 => Ok(UpscaleType::AdaptiveCubic),
            _ => Err(DecodeError::UnsupportedFeature("unrecognized upscale type")),
        }
    }
}

/// Tile dimensioning class, 7.4.3.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileDimensions {
    /// One tile spanning the plane.
    None = 0,
    /// 512x256 pixel tiles.
    Tile512x256 = 1,
    /// 1024x512 pixel tiles.
    Tile1024x512 = 2,
    /// Dimensions signalled explicitly.
    Custom = 3,
}

impl TileDimensions {
    pub(crate) const fn from_raw(raw: u8) -> Result<Self> {
        match raw {
            0 => Ok(TileDimensions::None),
            1 => Ok(TileDimensions::Tile512x256),
            2 => Ok(TileDimensions::Tile1024x512),
            3 => Ok(TileDimensions::Custom),
            _ => Err(DecodeError::UnsupportedFeature("unrecognized tile dimensions")),
        }
    }

    /// Nominal pixel dimensions for the fixed classes.
    pub(crate) const fn fixed_size(self) -> Option<(u16, u16)> {
        match self {
            TileDimensions::Tile512x256 => Some((512, 256)),
            TileDimensions::Tile1024x512 => Some((1024, 512)),
            TileDimensions::None | TileDimensions::Custom => None,
        }
    }
}

/// Compression applied to per-tile chunk sizes, 7.4.3.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileSizeCompression {
    /// Sizes are plain multi-byte values before each chunk.
    None = 0,
    /// Sizes are Huffman coded, unsigned.
    Prefix = 1,
    /// Size deltas are Huffman coded, signed, prefix-summed.
    PrefixOnDiff = 2,
}

impl TileSizeCompression {
    pub(crate) const fn from_raw(raw: u8) -> Result<Self> {
        match raw {
            0 => Ok(TileSizeCompression::None),
            1 => Ok(TileSizeCompression::Prefix),
            2 => Ok(TileSizeCompression::PrefixOnDiff),
            _ => Err(DecodeError::UnsupportedFeature("reserved tile size compression")),
        }
    }
}

/// Plane configuration, 7.4.3.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlanesType {
    /// Luma only.
    Y = 0,
    /// Luma and both chroma planes.
    Yuv = 1,
}

impl PlanesType {
    /// Number of coded planes.
    pub const fn plane_count(self) -> u8 {
        match self {
            PlanesType::Y => 1,
            PlanesType::Yuv => 3,
        }
    }
}

/// User-data embedding mode, 7.4.3.3. When enabled, one coefficient layer
/// donates its low bits to application data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserDataMode {
    /// No embedded user data.
    None = 0,
    /// 2 bits per transform unit.
    With2Bits = 1,
    /// 6 bits per transform unit.
    With6Bits = 2,
}

impl UserDataMode {
    pub(crate) const fn from_raw(raw: u8) -> Result<Self> {
        match raw {
            0 => Ok(UserDataMode::None),
            1 => Ok(UserDataMode::With2Bits),
            2 => Ok(UserDataMode::With6Bits),
            _ => Err(DecodeError::UnsupportedFeature("reserved user data mode")),
        }
    }
}

/// Quantization-matrix signalling mode, 7.4.3.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuantMatrixMode {
    /// Keep the previous picture's matrices (defaults on IDR).
    UsePrevious = 0,
    /// Use the standard default matrices.
    UseDefault = 1,
    /// Custom matrix for LOQ-0 only.
    CustomLoq0 = 2,
    /// Custom matrix for LOQ-1 only.
    CustomLoq1 = 3,
    /// One custom matrix applied to both LOQs.
    CustomBoth = 4,
    /// Independent custom matrices for each LOQ.
    CustomBothUnique = 5,
}

impl QuantMatrixMode {
    pub(crate) const fn from_raw(raw: u8) -> Result<Self> {
        match raw {
            0 => Ok(QuantMatrixMode::UsePrevious),
            1 => Ok(QuantMatrixMode::UseDefault),
            2 => Ok(QuantMatrixMode::CustomLoq0),
            3 => Ok(QuantMatrixMode::CustomLoq1),
            4 => Ok(QuantMatrixMode::CustomBoth),
            5 => Ok(QuantMatrixMode::CustomBothUnique),
            _ => Err(DecodeError::UnsupportedFeature("reserved quant matrix mode")),
        }
    }
}

/// Coded picture structure, 7.4.3.4.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PictureType {
    /// Progressive frame.
    #[default]
    Frame = 0,
    /// Interlaced field.
    Field = 1,
}

/// Field parity for field pictures, 7.4.3.4.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Top field.
    #[default]
    Top = 0,
    /// Bottom field.
    Bottom = 1,
}

/// Dithering selector, 7.4.3.4.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DitherType {
    /// No dithering.
    #[default]
    None = 0,
    /// Uniform random dithering.
    Uniform = 1,
}

impl DitherType {
    pub(crate) const fn from_raw(raw: u8) -> Result<Self> {
        match raw {
            0 => Ok(DitherType::None),
            1 => Ok(DitherType::Uniform),
            _ => Err(DecodeError::UnsupportedFeature("reserved dither type")),
        }
    }
}

/// Dequantization-offset derivation mode, 7.4.3.4.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DequantOffsetMode {
    /// Offset tracks the step-width.
    #[default]
    Default = 0,
    /// Offset applied as signalled.
    ConstOffset = 1,
}

/// Sharpening filter selector (additional info).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SharpenType {
    /// No sharpening.
    #[default]
    Disabled = 0,
    /// Applied inside the reconstruction loop.
    InLoop = 1,
    /// Applied to output pictures only.
    OutOfLoop = 2,
}

impl SharpenType {
    pub(crate) const fn from_raw(raw: u8) -> Result<Self> {
        match raw {
            0 => Ok(SharpenType::Disabled),
            1 => Ok(SharpenType::InLoop),
            2 => Ok(SharpenType::OutOfLoop),
            _ => Err(DecodeError::UnsupportedFeature("reserved sharpen type")),
        }
    }
}

/// Per transform-unit temporal prediction signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemporalSignal {
    /// Add the residual to the temporal prediction.
    Inter = 0,
    /// Replace the temporal prediction.
    Intra = 1,
}

/// Number of temporal signal states.
pub const TEMPORAL_SIGNAL_COUNT: usize = 2;

/// Conformance-window crop, in plane-local pixels after parsing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Crop {
    /// Left crop in pixels.
    pub left: u16,
    /// Right crop in pixels.
    pub right: u16,
    /// Top crop in pixels.
    pub top: u16,
    /// Bottom crop in pixels.
    pub bottom: u16,
}

/// Deblocking coefficients, stored as `16 - signalled` (8.9.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deblock {
    /// Weight applied to the four corner residuals.
    pub corner: u32,
    /// Weight applied to the eight edge residuals.
    pub side: u32,
}

impl Default for Deblock {
    fn default() -> Self {
        Self {
            corner: DEFAULT_DEBLOCK_COEFFICIENT,
            side: DEFAULT_DEBLOCK_COEFFICIENT,
        }
    }
}

/// An upscale kernel: forward and reverse phase coefficients, 8.7.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Kernel {
    /// Coefficients for the two filter phases.
    pub coeffs: [[i16; 8]; 2],
    /// Number of taps.
    pub length: u8,
    /// Whether the kernel approximates predicted-average upscaling.
    pub approximated_pa: bool,
}

impl Kernel {
    const fn from_taps<const N: usize>(phase0: [i16; N], phase1: [i16; N]) -> Self {
        let mut coeffs = [[0i16; 8]; 2];
        let mut i = 0;
        while i < N {
            coeffs[0][i] = phase0[i];
            coeffs[1][i] = phase1[i];
            i += 1;
        }
        Self {
            coeffs,
            length: N as u8,
            approximated_pa: false,
        }
    }

    /// The standard-defined kernel for a fixed upscale type; adaptive
    /// cubic kernels are signalled in the stream instead.
    pub(crate) const fn standard(upscale: UpscaleType) -> Self {
        match upscale {
            UpscaleType::Nearest => Self::from_taps([16384, 0], [0, 16384]),
            UpscaleType::Linear => Self::from_taps([12288, 4096], [4096, 12288]),
            UpscaleType::Cubic => {
                Self::from_taps([-1382, 14285, 3942, -461], [-461, 3942, 14285, -1382])
            }
            UpscaleType::ModifiedCubic => {
                Self::from_taps([-2360, 15855, 4165, -1276], [-1276, 4165, 15855, -2360])
            }
            UpscaleType::AdaptiveCubic => Self::from_taps([0; 4], [0; 4]),
        }
    }
}

/// Embedded user-data placement derived from [`UserDataMode`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserDataConfig {
    /// Whether user data is embedded at all.
    pub enabled: bool,
    /// Coefficient layer donating its low bits (1 for DD, 5 for DDS).
    pub layer_index: u8,
    /// Number of bits shifted out of that layer (2 or 6).
    pub shift: u8,
}

/// Mastering display colour volume, D.2.2.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MasteringDisplayColourVolume {
    /// CIE x coordinates of the three display primaries.
    pub display_primaries_x: [u16; 3],
    /// CIE y coordinates of the three display primaries.
    pub display_primaries_y: [u16; 3],
    /// CIE x coordinate of the white point.
    pub white_point_x: u16,
    /// CIE y coordinate of the white point.
    pub white_point_y: u16,
    /// Maximum mastering luminance in 0.0001 cd/m2.
    pub max_display_mastering_luminance: u32,
    /// Minimum mastering luminance in 0.0001 cd/m2.
    pub min_display_mastering_luminance: u32,
}

/// Content light level, D.2.3.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentLightLevel {
    /// Maximum content light level in cd/m2.
    pub max_content_light_level: u16,
    /// Maximum picture-average light level in cd/m2.
    pub max_pic_average_light_level: u16,
}

bitflags::bitflags! {
    /// Which HDR payloads have been seen.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct HdrFlags: u8 {
        /// Mastering display colour volume present.
        const MASTERING_DISPLAY_COLOUR_VOLUME = 1 << 0;
        /// Content light level info present.
        const CONTENT_LIGHT_LEVEL = 1 << 1;
        /// HDR global-config payload present.
        const PAYLOAD_GLOBAL_CONFIG = 1 << 2;
        /// Tone-mapper data blob present (skipped, not stored).
        const TONE_MAPPER_DATA = 1 << 3;
        /// Deinterlacer enabled.
        const DEINTERLACER_ENABLED = 1 << 4;
    }
}

/// Aggregated HDR signalling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HdrInfo {
    /// Payload presence flags.
    pub flags: HdrFlags,
    /// Mastering display colour volume.
    pub mastering_display: MasteringDisplayColourVolume,
    /// Content light level.
    pub content_light_level: ContentLightLevel,
    /// Tone-mapper type per location (0 = base, 1 = enhancement).
    pub tonemapper_type: [u8; 2],
}

/// Deinterlacing signalling from the HDR payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeinterlacingInfo {
    /// Deinterlacer algorithm selector.
    pub deinterlacer_type: u8,
    /// Whether the top field is first.
    pub top_field_first: bool,
}

bitflags::bitflags! {
    /// Which VUI fields are present, E.2.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct VuiFlags: u8 {
        /// `aspect_ratio_info_present_flag`.
        const ASPECT_RATIO_INFO = 1 << 0;
        /// `overscan_info_present_flag`.
        const OVERSCAN_INFO = 1 << 1;
        /// `overscan_appropriate_flag`.
        const OVERSCAN_APPROPRIATE = 1 << 2;
        /// `video_signal_type_present_flag`.
        const VIDEO_SIGNAL_TYPE = 1 << 3;
        /// `video_full_range_flag`.
        const VIDEO_SIGNAL_FULL_RANGE = 1 << 4;
        /// `colour_description_present_flag`.
        const VIDEO_SIGNAL_COLOUR_DESC = 1 << 5;
        /// `chroma_loc_info_present_flag`.
        const CHROMA_LOC_INFO = 1 << 6;
    }
}

/// Video usability information, E.2.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VuiInfo {
    /// Field presence flags.
    pub flags: VuiFlags,
    /// `aspect_ratio_idc`; 255 selects an explicit sample aspect ratio.
    pub aspect_ratio_idc: u8,
    /// Explicit sample aspect ratio width.
    pub sar_width: u16,
    /// Explicit sample aspect ratio height.
    pub sar_height: u16,
    /// `video_format`, 3 bits.
    pub video_format: u8,
    /// `colour_primaries`.
    pub colour_primaries: u8,
    /// `transfer_characteristics`.
    pub transfer_characteristics: u8,
    /// `matrix_coefficients`.
    pub matrix_coefficients: u8,
    /// `chroma_sample_loc_type_top_field`.
    pub chroma_sample_loc_type_top_field: u32,
    /// `chroma_sample_loc_type_bottom_field`.
    pub chroma_sample_loc_type_bottom_field: u32,
}

/// The aspect-ratio IDC value that introduces an explicit SAR.
pub(crate) const VUI_ASPECT_RATIO_IDC_EXTENDED_SAR: u8 = 255;

/// Per-LOQ quantization matrices. Only the first `layer_count` entries of
/// each row are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantMatrix {
    /// Matrix values per LOQ.
    pub values: [[u8; LAYER_COUNT_DDS]; LOQ_ENHANCED_COUNT],
    /// Whether any matrix has been established since the last reset.
    pub set: bool,
}

impl Default for QuantMatrix {
    fn default() -> Self {
        Self {
            values: [[0; LAYER_COUNT_DDS]; LOQ_ENHANCED_COUNT],
            set: false,
        }
    }
}

/// The standard resolution table, 7.4.3.3 (Table 20). Index 0 means the
/// resolution is absent; index 63 signals a custom resolution.
pub(crate) const RESOLUTIONS: [(u16, u16); 51] = [
    (0, 0),
    (360, 200),
    (400, 240),
    (480, 320),
    (640, 360),
    (640, 480),
    (768, 480),
    (800, 600),
    (852, 480),
    (854, 480),
    (856, 480),
    (960, 540),
    (960, 640),
    (1024, 576),
    (1024, 600),
    (1024, 768),
    (1152, 864),
    (1280, 720),
    (1280, 800),
    (1280, 1024),
    (1360, 768),
    (1366, 768),
    (1400, 1050),
    (1440, 900),
    (1600, 1200),
    (1680, 1050),
    (1920, 1080),
    (1920, 1200),
    (2048, 1080),
    (2048, 1152),
    (2048, 1536),
    (2160, 1440),
    (2560, 1440),
    (2560, 1600),
    (2560, 2048),
    (3200, 1800),
    (3200, 2048),
    (3200, 2400),
    (3440, 1440),
    (3840, 1600),
    (3840, 2160),
    (3840, 2400),
    (4096, 2160),
    (4096, 3072),
    (5120, 2880),
    (5120, 3200),
    (5120, 4096),
    (6400, 4096),
    (6400, 4800),
    (7680, 4320),
    (7680, 4800),
];

/// Resolution-type code for an explicit width/height pair.
pub(crate) const RESOLUTION_CUSTOM: u8 = 63;

/// The V-Nova ITU-T T.35 code marking SEI payloads that carry the
/// bitstream version byte: UK country code plus manufacturer code.
pub(crate) const VNOVA_ITU_CODE: [u8; 4] = [0xB4, 0x00, 0x50, 0x00];

/// Maximum value of one conformance-window offset.
pub(crate) const MAX_CONFORMANCE_WINDOW_VALUE: u64 = (1 << 16) - 1;
