//! A pure Rust LCEVC (MPEG-5 Part 2, ISO/IEC 23094-2) enhancement-layer
//! decoder core.
//!
//! LCEVC is a two-layer coding scheme: a base codec produces a
//! low-resolution picture, and the enhancement layer carries compact,
//! codec-independent correction data that is upscaled and added to the
//! base to reconstruct the full-resolution picture. This crate decodes
//! the enhancement layer only:
//!
//! 1. [`Nal::unencapsulate`] strips the start code, NAL header, emulation
//!    prevention bytes and RBSP stop byte of one coded picture.
//! 2. [`parse_configs`] parses the configuration blocks into a
//!    [`GlobalConfig`] (IDR-to-IDR lifetime) and a [`FrameConfig`]
//!    (per-picture lifetime, including the chunk descriptors).
//! 3. [`decode_enhancement`] decodes one `(plane, LOQ, tile)` triple into
//!    a command buffer of residual operations for a downstream applier.
//!    Tiles own disjoint chunk ranges and output buffers, so the caller
//!    may fan tile decodes out across threads.
//!
//! Pixel I/O, upscaling, dithering and sharpening are out of scope; the
//! crate emits command buffers and filter parameters for external
//! collaborators.
//!
//! [`Nal::unencapsulate`]: crate::Nal::unencapsulate
#![deny(unsafe_code)]

mod chunk;
mod cmdbuf;
mod config;
mod decode;
mod dequant;
mod dimensions;
mod entropy;
mod enums;
mod error;
mod huffman;
mod nal;
mod transform;
mod tu;

pub use self::chunk::Chunk;
pub use self::cmdbuf::{
    CmdBufferSink, CpuCmd, CpuCmdBuffer, CpuCmdIter, CpuCmdRecord, CpuEntryPoint, GpuCmdBuffer,
    GpuCommand, GpuOperation,
};
pub use self::config::types::{
    BitDepth, Chroma, ContentLightLevel, Crop, Deblock, DeinterlacingInfo, DequantOffsetMode,
    DitherType, FieldType, HdrFlags, HdrInfo, LoqIndex, MasteringDisplayColourVolume,
    PictureType, ScalingMode, SharpenType, TemporalSignal, TileDimensions, TileSizeCompression,
    TransformType, UpscaleType, UserDataConfig, UserDataMode, VuiFlags, VuiInfo,
};
pub use self::config::{
    DecoderConfig, FrameConfig, GlobalConfig, Kernel, QuantMatrix, parse_configs,
};
pub use self::decode::decode_enhancement;
pub use self::dimensions::{plane_dimensions, tile_dimensions, tile_start};
pub use self::enums::{AdditionalInfoType, BlockType, NalUnitType, SeiPayloadType};
pub use self::error::{DecodeError, Result};
pub use self::nal::Nal;
pub use self::tu::TuState;

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests;
