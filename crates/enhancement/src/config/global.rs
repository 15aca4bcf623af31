use lcevc_bytes_util::ByteReader;

use super::GlobalConfig;
use super::types::{
    BitDepth, Chroma, Deblock, Kernel, LAYER_COUNT_DD, LAYER_COUNT_DDS, LoqIndex, PlanesType,
    RESOLUTION_CUSTOM, RESOLUTIONS, ScalingMode, TileDimensions, TileSizeCompression,
    TransformType, UpscaleType, UserDataConfig, UserDataMode, bitstream_version,
};
use crate::dimensions::plane_dimensions;
use crate::error::{DecodeError, Result};

/// Parses a global config block, ISO/IEC 23094-2 - 7.3.5 (Table 9) &
/// 7.4.3.3. Occurs once per IDR picture.
pub(super) fn parse_block_global_config(
    reader: &mut ByteReader<'_>,
    global: &mut GlobalConfig,
) -> Result<()> {
    if !global.bitstream_version_set {
        // The V-Nova SEI always precedes the global config when present.
        // Reaching a global config without one pins the current version
        // permanently.
        global.bitstream_version_set = true;
        global.bitstream_version = bitstream_version::CURRENT;
    }

    let data = reader.read_u8()?;

    // plane_mode_flag: 1 bit.
    let plane_mode_flag = (data >> 7) & 0x01 != 0;

    // resolution_type: 6 bits.
    let resolution_type = (data >> 1) & 0x3F;
    if resolution_type > 0 && (resolution_type as usize) < RESOLUTIONS.len() {
        let (width, height) = RESOLUTIONS[resolution_type as usize];
        global.width = width;
        global.height = height;
    } else if resolution_type != 0 && resolution_type != RESOLUTION_CUSTOM {
        return Err(DecodeError::UnsupportedFeature("unrecognized resolution type"));
    }

    // transform_type: 1 bit.
    global.transform = TransformType::from_raw(data & 0x01)?;
    global.num_layers = match global.transform {
        TransformType::Dd => LAYER_COUNT_DD as u8,
        TransformType::Dds => LAYER_COUNT_DDS as u8,
    };

    let data = reader.read_u8()?;

    // chroma_sampling_type: 2 bits.
    global.chroma = Chroma::from_raw((data >> 6) & 0x03)?;

    // base_depth_type: 2 bits, enhancement_depth_type: 2 bits.
    global.base_depth = BitDepth::from_raw((data >> 4) & 0x03)?;
    global.enhanced_depth = BitDepth::from_raw((data >> 2) & 0x03)?;

    // temporal_step_width_modifier_signalled_flag: 1 bit.
    let temporal_swm_signalled = (data >> 1) & 0x01 != 0;

    // predicted_residual_mode_flag: 1 bit.
    global.predicted_average_enabled = data & 0x01 != 0;

    let data = reader.read_u8()?;

    // temporal_tile_intra_signalling_enabled_flag: 1 bit.
    global.temporal_reduced_signalling_enabled = (data >> 7) & 0x01 != 0;

    // temporal_enabled_flag: 1 bit.
    global.temporal_enabled = (data >> 6) & 0x01 != 0;

    // upsample_type: 3 bits.
    global.upscale = UpscaleType::from_raw((data >> 3) & 0x07)?;

    // level1_filtering_signalled_flag: 1 bit.
    let deblock_signalled = (data >> 2) & 0x01 != 0;

    // scaling_mode_level1: 2 bits.
    global.scaling_modes[LoqIndex::Loq1 as usize] = ScalingMode::from_raw(data & 0x03)?;

    let data = reader.read_u8()?;

    // scaling_mode_level2: 2 bits.
    global.scaling_modes[LoqIndex::Loq0 as usize] = ScalingMode::from_raw((data >> 6) & 0x03)?;

    // tile_dimensions_type: 2 bits.
    global.tile_dimensions = TileDimensions::from_raw((data >> 4) & 0x03)?;

    // user_data_enabled: 2 bits.
    set_user_data_config(global, UserDataMode::from_raw((data >> 2) & 0x03)?);

    // level1_depth_flag: 1 bit.
    global.loq1_use_enhanced_depth = (data >> 1) & 0x01 != 0;

    // chroma_step_width_flag: 1 bit.
    let chroma_step_width_signalled = data & 0x01 != 0;

    if global.enhanced_depth < global.base_depth {
        // Only promoting base depth to the enhancement depth is
        // supported.
        return Err(DecodeError::UnsupportedFeature(
            "enhancement depth is below the base depth",
        ));
    }

    // plane_type: 4 bits + 4 reserved, only present with the flag.
    global.num_planes = if plane_mode_flag {
        let data = reader.read_u8()?;
        match (data >> 4) & 0x0F {
            0 => PlanesType::Y.plane_count(),
            1 => PlanesType::Yuv.plane_count(),
            _ => return Err(DecodeError::UnsupportedFeature("unrecognized plane type")),
        }
    } else {
        1
    };

    // temporal_step_width_modifier: 8 bits; the default is preset.
    if temporal_swm_signalled {
        global.temporal_step_width_modifier = reader.read_u8()?;
    }

    if global.upscale == UpscaleType::AdaptiveCubic {
        parse_adaptive_kernel(reader, global)?;
    } else {
        global.kernel = Kernel::standard(global.upscale);
    }

    // level1_filtering coefficients: 4 + 4 bits, stored as 16 - value.
    if deblock_signalled {
        let data = reader.read_u8()?;
        global.deblock.corner = 16 - u32::from((data >> 4) & 0x0F);
        global.deblock.side = 16 - u32::from(data & 0x0F);
    } else {
        global.deblock = Deblock::default();
    }

    parse_tile_signalling(reader, global)?;

    // Custom resolution trails the tile data.
    if resolution_type == RESOLUTION_CUSTOM {
        global.width = reader.read_u16()?;
        global.height = reader.read_u16()?;
    }

    // chroma_step_width_multiplier: 8 bits; the default is preset.
    if chroma_step_width_signalled {
        global.chroma_step_width_multiplier = reader.read_u8()?;
    }

    tracing::debug!(
        width = global.width,
        height = global.height,
        planes = global.num_planes,
        transform = ?global.transform,
        temporal = global.temporal_enabled,
        "global config"
    );

    validate_resolution(global)?;
    finalize_tiles_and_crop(global)?;
    calculate_tile_configuration(global)?;

    global.initialized = true;

    Ok(())
}

fn set_user_data_config(global: &mut GlobalConfig, mode: UserDataMode) {
    global.user_data = match mode {
        UserDataMode::None => UserDataConfig::default(),
        _ => UserDataConfig {
            enabled: true,
            layer_index: match global.transform {
                TransformType::Dd => 1,
                TransformType::Dds => 5,
            },
            shift: match mode {
                UserDataMode::With2Bits => 2,
                _ => 6,
            },
        },
    };
}

/// Signalled adaptive-cubic kernel, 8.6.7: four 16-bit magnitudes with
/// the outer taps negated, mirrored into the reverse phase.
fn parse_adaptive_kernel(reader: &mut ByteReader<'_>, global: &mut GlobalConfig) -> Result<()> {
    const KERNEL_SIZE: usize = 4;

    global.kernel = Kernel {
        length: KERNEL_SIZE as u8,
        approximated_pa: false,
        ..Kernel::default()
    };

    for i in 0..KERNEL_SIZE {
        let multiplier: i32 = if i % 3 == 0 { -1 } else { 1 };
        let coeff = reader.read_u16()?;
        let value = (multiplier * i32::from(coeff)) as i16;

        global.kernel.coeffs[0][i] = value;
        global.kernel.coeffs[1][KERNEL_SIZE - 1 - i] = value;
    }

    Ok(())
}

/// Tile width/height and compression flags, 7.3.5 from the row
/// `if (tile_dimensions_type > 0)`.
fn parse_tile_signalling(reader: &mut ByteReader<'_>, global: &mut GlobalConfig) -> Result<()> {
    match global.tile_dimensions {
        // A single plane-sized tile; dimensions are filled in once the
        // resolution is final.
        TileDimensions::None => return Ok(()),
        TileDimensions::Custom => {
            global.tile_width[0] = reader.read_u16()?;
            global.tile_height[0] = reader.read_u16()?;
        }
        fixed => {
            let (width, height) = fixed
                .fixed_size()
                .ok_or(DecodeError::InvalidArgument("tile class without fixed size"))?;
            global.tile_width[0] = width;
            global.tile_height[0] = height;
        }
    }

    let data = reader.read_u8()?;

    // compression_type_entropy_enabled_per_tile_flag: 1 bit.
    global.per_tile_compression_enabled = (data >> 2) & 0x01 != 0;

    // compression_type_size_per_tile: 2 bits.
    global.tile_size_compression = TileSizeCompression::from_raw(data & 0x03)?;

    Ok(())
}

/// Width/height must hold whole transforms through every chroma and
/// scaling expansion.
fn validate_resolution(global: &GlobalConfig) -> Result<()> {
    let scaling = global.scaling_modes[LoqIndex::Loq0 as usize];
    let chroma = global.chroma;

    let with_chroma = global.num_planes > 1 && chroma != Chroma::Monochrome;
    let transform_alignment = global.transform.tu_size();

    let hori_scaling: u16 = if scaling != ScalingMode::Scale0D { 2 } else { 1 };
    let vert_scaling: u16 = if scaling == ScalingMode::Scale2D { 2 } else { 1 };

    let hori_chroma: u16 = if with_chroma && chroma != Chroma::Chroma444 { 2 } else { 1 };
    let vert_chroma: u16 = if with_chroma && chroma == Chroma::Chroma420 { 2 } else { 1 };

    let hori_alignment = transform_alignment * hori_scaling * hori_chroma;
    let vert_alignment = transform_alignment * vert_scaling * vert_chroma;

    // Alignments are powers of two.
    if global.width & (hori_alignment - 1) != 0 || global.height & (vert_alignment - 1) != 0 {
        return Err(DecodeError::UnsupportedFeature(
            "resolution is not a whole number of transforms",
        ));
    }

    Ok(())
}

/// Defaults the tile dimensions for untiled streams, then scales and
/// validates the conformance window against the now-final resolution.
fn finalize_tiles_and_crop(global: &mut GlobalConfig) -> Result<()> {
    if global.tile_dimensions == TileDimensions::None {
        global.tile_width[0] = global.width;
        global.tile_height[0] = global.height;
    }

    if global.crop_enabled {
        let shift_w = global.chroma.shift_width();
        let shift_h = global.chroma.shift_height();

        // The window is signalled in chroma-plane pixels; scale the luma
        // entry up. Widen before shifting so pathological values fail
        // the range check instead of wrapping.
        let left = u32::from(global.crop.left) << shift_w;
        let right = u32::from(global.crop.right) << shift_w;
        let top = u32::from(global.crop.top) << shift_h;
        let bottom = u32::from(global.crop.bottom) << shift_h;

        if left + right >= u32::from(global.width) {
            return Err(DecodeError::UnsupportedFeature(
                "conformance window is wider than the picture",
            ));
        }
        if top + bottom >= u32::from(global.height) {
            return Err(DecodeError::UnsupportedFeature(
                "conformance window is taller than the picture",
            ));
        }

        global.crop.left = left as u16;
        global.crop.right = right as u16;
        global.crop.top = top as u16;
        global.crop.bottom = bottom as u16;
    }

    Ok(())
}

/// Derives per-plane tile dimensions and per-plane per-LOQ tile counts.
///
/// Chroma planes shift the tile dimensions so every plane of a given LOQ
/// carries the same number of tiles.
fn calculate_tile_configuration(global: &mut GlobalConfig) -> Result<()> {
    let hshift = global.chroma.shift_width();
    let vshift = global.chroma.shift_height();

    global.tile_width[1] = (global.tile_width[0] + hshift) >> hshift;
    global.tile_width[2] = global.tile_width[1];
    global.tile_height[1] = (global.tile_height[0] + vshift) >> vshift;
    global.tile_height[2] = global.tile_height[1];

    let tu_size = global.transform.tu_size();

    for plane in 0..usize::from(global.num_planes) {
        if global.tile_width[plane] % tu_size != 0 || global.tile_height[plane] % tu_size != 0 {
            return Err(DecodeError::UnsupportedFeature(
                "tile dimensions are not divisible by the transform size",
            ));
        }

        for loq in LoqIndex::ENHANCED {
            let (loq_width, loq_height) = plane_dimensions(global, loq, plane as u32);

            let tiles_across = u32::from(loq_width.div_ceil(global.tile_width[plane]));
            let tiles_down = u32::from(loq_height.div_ceil(global.tile_height[plane]));

            global.num_tiles[plane][loq as usize] = tiles_across * tiles_down;

            tracing::trace!(
                plane,
                loq = loq as u8,
                tiles_across,
                tiles_down,
                "tile count"
            );

            // All planes of one LOQ must agree on the tile count.
            if plane > 0
                && global.num_tiles[plane][loq as usize] != global.num_tiles[0][loq as usize]
            {
                return Err(DecodeError::UnsupportedFeature(
                    "planes disagree on the tile count",
                ));
            }
        }
    }

    Ok(())
}

/// A hand-packed global config for tests: 1920x1080 (table entry 26),
/// DD, YUV 4:2:0 via plane mode byte, temporal enabled with reduced
/// signalling, linear upscale, 2D scaling into LOQ-0, no tiling.
#[cfg(test)]
pub(crate) fn packed_global_config() -> Vec<u8> {
    vec![
        // plane_mode=1, resolution_type=26, transform=DD.
        0b1_011010_0,
        // chroma=420, base=8-bit, enhanced=8-bit, no swm, no PA.
        0b01_00_00_0_0,
        // reduced=1, temporal=1, upsample=linear, no deblock, loq1 scaling=0D.
        0b1_1_001_0_00,
        // loq0 scaling=2D, tiles=none, user data=none, depth flag=0, chroma sw=0.
        0b10_00_00_0_0,
        // plane_type=YUV.
        0b0001_0000,
    ]
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn parses_packed_config() {
        let data = packed_global_config();
        let mut reader = ByteReader::new(&data).unwrap();
        let mut global = GlobalConfig::default();
        parse_block_global_config(&mut reader, &mut global).unwrap();

        assert_eq!((global.width, global.height), (1920, 1080));
        assert_eq!(global.num_planes, 3);
        assert_eq!(global.transform, TransformType::Dd);
        assert_eq!(global.num_layers, 4);
        assert_eq!(global.chroma, Chroma::Chroma420);
        assert!(global.temporal_enabled);
        assert!(global.temporal_reduced_signalling_enabled);
        assert_eq!(global.scaling_modes[0], ScalingMode::Scale2D);
        assert_eq!(global.scaling_modes[1], ScalingMode::Scale0D);
        assert_eq!(global.tile_dimensions, TileDimensions::None);
        // Untiled: one plane-sized tile each.
        assert_eq!(global.tile_width[0], 1920);
        assert_eq!(global.tile_height[0], 1080);
        assert_eq!(global.num_tiles, [[1, 1], [1, 1], [1, 1]]);
        assert!(global.initialized);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn custom_resolution_and_tiles() {
        let data = vec![
            // plane_mode=1, resolution_type=63 (custom), transform=DDS.
            0b1_111111_1,
            0b01_00_00_0_0,
            // temporal off, nearest upsample, loq1 scaling 0D.
            0b0_0_000_0_00,
            // loq0 scaling=2D, tiles=custom, user data none.
            0b10_11_00_0_0,
            // plane_type=YUV.
            0b0001_0000,
            // custom_tile_width=960, custom_tile_height=1080.
            0x03, 0xC0, 0x04, 0x38,
            // per-tile compression off, size compression none.
            0b00000_0_00,
            // custom resolution 3840x2160.
            0x0F, 0x00, 0x08, 0x70,
        ];

        let mut reader = ByteReader::new(&data).unwrap();
        let mut global = GlobalConfig::default();
        parse_block_global_config(&mut reader, &mut global).unwrap();

        assert_eq!((global.width, global.height), (3840, 2160));
        assert_eq!(global.transform, TransformType::Dds);
        // Luma: 4x2 tiles at LOQ-0; chroma tiles shift with subsampling
        // so every plane sees the same grid.
        assert_eq!(global.num_tiles[0][LoqIndex::Loq0 as usize], 8);
        assert_eq!(global.num_tiles[1][LoqIndex::Loq0 as usize], 8);
        assert_eq!(global.tile_width, [960, 480, 480]);
        assert_eq!(global.tile_height, [1080, 540, 540]);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn rejects_depth_demotion() {
        let mut data = packed_global_config();
        // base=10-bit, enhanced=8-bit.
        data[1] = 0b01_01_00_0_0;
        let mut reader = ByteReader::new(&data).unwrap();
        let mut global = GlobalConfig::default();
        assert!(matches!(
            parse_block_global_config(&mut reader, &mut global),
            Err(DecodeError::UnsupportedFeature(_))
        ));
    }

    #[test]
    fn rejects_misaligned_resolution() {
        // 854x480 (table entry 9) is not divisible by the 4:2:0 + 2D
        // scaling + DD alignment of 8.
        let mut data = packed_global_config();
        data[0] = 0b1_001001_0;
        let mut reader = ByteReader::new(&data).unwrap();
        let mut global = GlobalConfig::default();
        assert!(matches!(
            parse_block_global_config(&mut reader, &mut global),
            Err(DecodeError::UnsupportedFeature(_))
        ));
    }

    #[test]
    fn global_config_pins_unset_version() {
        let data = packed_global_config();
        let mut reader = ByteReader::new(&data).unwrap();
        let mut global = GlobalConfig::new(None);
        assert!(!global.bitstream_version_set);
        parse_block_global_config(&mut reader, &mut global).unwrap();
        assert!(global.bitstream_version_set);
        assert_eq!(global.bitstream_version, bitstream_version::CURRENT);
    }
}
