use lcevc_bytes_util::{BitReader, ByteReader};

use super::{FrameConfig, GlobalConfig};
use crate::config::types::{
    HdrFlags, SharpenType, VNOVA_ITU_CODE, VUI_ASPECT_RATIO_IDC_EXTENDED_SAR, VuiFlags,
    bitstream_version,
};
use crate::enums::{AdditionalInfoType, SeiPayloadType};
use crate::error::{DecodeError, Result};

/// Parses an additional-info block, ISO/IEC 23094-2 - 7.3.10 (Table 14).
/// Unknown info types are skipped using the block size.
pub(super) fn parse_block_additional_info(
    reader: &mut ByteReader<'_>,
    block_size: usize,
    global: &mut GlobalConfig,
    frame: &mut FrameConfig,
    global_modified: &mut bool,
) -> Result<()> {
    if block_size == 0 {
        return Err(DecodeError::InvalidArgument("additional info block size is 0"));
    }

    let info_type = AdditionalInfoType::from(reader.read_u8()?);

    match info_type {
        AdditionalInfoType::Sei => {
            *global_modified = true;
            parse_sei_payload(reader, global, block_size - 1)?;
        }
        AdditionalInfoType::Vui => {
            parse_vui_parameters(reader, global, block_size - 1)?;
        }
        AdditionalInfoType::SFilter => {
            parse_sfilter_payload(reader, frame)?;
        }
        AdditionalInfoType::Hdr => {
            *global_modified = true;
            parse_hdr_payload(reader, global)?;
        }
        unknown => {
            tracing::warn!(info_type = unknown.0, "unsupported additional info type, skipping");
            reader.seek(block_size - 1)?;
        }
    }

    Ok(())
}

/// SEI payloads, D.2. Only the three payload types the enhancement layer
/// defines are interpreted; everything else is skipped.
fn parse_sei_payload(
    reader: &mut ByteReader<'_>,
    global: &mut GlobalConfig,
    payload_size: usize,
) -> Result<()> {
    if payload_size == 0 {
        return Err(DecodeError::EntropyOverflow("SEI payload shorter than its header"));
    }

    let payload_type = SeiPayloadType::from(reader.read_u8()?);

    match payload_type {
        SeiPayloadType::MasteringDisplayColourVolume => {
            // D.2.2.
            let colour = &mut global.hdr_info.mastering_display;

            for i in 0..3 {
                colour.display_primaries_x[i] = reader.read_u16()?;
                colour.display_primaries_y[i] = reader.read_u16()?;
            }

            colour.white_point_x = reader.read_u16()?;
            colour.white_point_y = reader.read_u16()?;
            colour.max_display_mastering_luminance = reader.read_u32()?;
            colour.min_display_mastering_luminance = reader.read_u32()?;

            global.hdr_info.flags |= HdrFlags::MASTERING_DISPLAY_COLOUR_VOLUME;
        }
        SeiPayloadType::ContentLightLevelInfo => {
            // D.2.3.
            let light = &mut global.hdr_info.content_light_level;
            light.max_content_light_level = reader.read_u16()?;
            light.max_pic_average_light_level = reader.read_u16()?;

            global.hdr_info.flags |= HdrFlags::CONTENT_LIGHT_LEVEL;
        }
        SeiPayloadType::UserDataRegistered => {
            // D.2.4: an ITU-T T.35 header; only the V-Nova code carries
            // data we understand (the bitstream version byte).
            let country_code = reader.read_u8()?;
            if country_code != VNOVA_ITU_CODE[0] {
                let remaining = payload_size
                    .checked_sub(2)
                    .ok_or(DecodeError::EntropyOverflow("SEI payload shorter than its header"))?;
                return reader.seek(remaining).map_err(Into::into);
            }

            let mut itu_header = [country_code, 0, 0, 0];
            for slot in itu_header.iter_mut().skip(1) {
                *slot = reader.read_u8()?;
            }

            if itu_header != VNOVA_ITU_CODE {
                let remaining = payload_size
                    .checked_sub(1 + VNOVA_ITU_CODE.len())
                    .ok_or(DecodeError::EntropyOverflow("SEI payload shorter than its header"))?;
                return reader.seek(remaining).map_err(Into::into);
            }

            if global.bitstream_version_set {
                // The version byte is write-once; a pinned version wins,
                // but the byte is still consumed.
                reader.seek(1)?;
                tracing::debug!(
                    version = global.bitstream_version,
                    "ignoring in-band bitstream version, already pinned"
                );
            } else {
                let version = reader.read_u8()?;
                if version > bitstream_version::CURRENT {
                    return Err(DecodeError::UnsupportedFeature("bitstream version out of range"));
                }
                global.bitstream_version = version;
                global.bitstream_version_set = true;
                tracing::debug!(version, "bitstream version");
            }
        }
        unknown => {
            tracing::warn!(payload = unknown.0, "unsupported SEI payload, skipping");
            reader.seek(payload_size - 1)?;
        }
    }

    Ok(())
}

/// VUI parameters, E.2. Bit-packed, so parsed through a dedicated bit
/// reader and then skipped as a whole on the byte stream.
fn parse_vui_parameters(
    reader: &mut ByteReader<'_>,
    global: &mut GlobalConfig,
    vui_size: usize,
) -> Result<()> {
    let vui = &mut global.vui_info;
    let window = reader.current();
    let window = window
        .get(..vui_size)
        .ok_or(DecodeError::InvalidArgument("VUI size exceeds the block"))?;
    let mut bits = BitReader::new(window)?;

    // aspect_ratio_info_present_flag: 1 bit.
    if bits.read_bit()? {
        vui.flags |= VuiFlags::ASPECT_RATIO_INFO;

        // aspect_ratio_idc: 8 bits.
        vui.aspect_ratio_idc = bits.read_bits(8)? as u8;

        if vui.aspect_ratio_idc == VUI_ASPECT_RATIO_IDC_EXTENDED_SAR {
            vui.sar_width = bits.read_bits(16)? as u16;
            vui.sar_height = bits.read_bits(16)? as u16;
        }
    }

    // overscan_info_present_flag: 1 bit.
    if bits.read_bit()? {
        vui.flags |= VuiFlags::OVERSCAN_INFO;

        // overscan_appropriate_flag: 1 bit.
        if bits.read_bit()? {
            vui.flags |= VuiFlags::OVERSCAN_APPROPRIATE;
        }
    }

    // video_signal_type_present_flag: 1 bit.
    if bits.read_bit()? {
        vui.flags |= VuiFlags::VIDEO_SIGNAL_TYPE;

        // video_format: 3 bits.
        vui.video_format = bits.read_bits(3)? as u8;

        // video_full_range_flag: 1 bit.
        if bits.read_bit()? {
            vui.flags |= VuiFlags::VIDEO_SIGNAL_FULL_RANGE;
        }

        // colour_description_present_flag: 1 bit.
        if bits.read_bit()? {
            vui.flags |= VuiFlags::VIDEO_SIGNAL_COLOUR_DESC;

            vui.colour_primaries = bits.read_bits(8)? as u8;
            vui.transfer_characteristics = bits.read_bits(8)? as u8;
            vui.matrix_coefficients = bits.read_bits(8)? as u8;
        }
    }

    // chroma_loc_info_present_flag: 1 bit.
    if bits.read_bit()? {
        vui.flags |= VuiFlags::CHROMA_LOC_INFO;

        vui.chroma_sample_loc_type_top_field = bits.read_exp_golomb()?;
        vui.chroma_sample_loc_type_bottom_field = bits.read_exp_golomb()?;
    }

    // The byte stream advances over the whole signalled VUI size.
    reader.seek(vui_size).map_err(Into::into)
}

/// Sharpening filter payload: type 3 bits, strength 5 bits, mapped to
/// [0.01, 0.32].
fn parse_sfilter_payload(reader: &mut ByteReader<'_>, frame: &mut FrameConfig) -> Result<()> {
    let data = reader.read_u8()?;

    frame.sharpen_type = SharpenType::from_raw((data >> 5) & 0x07)?;
    let signalled_strength = data & 0x1F;
    frame.sharpen_strength = f32::from(signalled_strength + 1) * 0.01;

    tracing::trace!(
        sharpen = ?frame.sharpen_type,
        strength = frame.sharpen_strength,
        "sharpen payload"
    );

    Ok(())
}

/// HDR payload: tone-mapper location/type, optional tone-mapper blob
/// (skipped), optional deinterlacer byte.
fn parse_hdr_payload(reader: &mut ByteReader<'_>, global: &mut GlobalConfig) -> Result<()> {
    let byte = reader.read_u8()?;

    // tone_mapper_location: 1 bit.
    let tone_mapper_location = (byte >> 7) & 0x01;
    // tone_mapper_type: 5 bits.
    let mut tone_mapper_type = (byte >> 2) & 0x1F;
    // tone_mapper_data_present_flag: 1 bit.
    let tone_mapper_data_present = (byte >> 1) & 0x01 != 0;
    // deinterlacer_enabled_flag: 1 bit.
    let deinterlacer_enabled = byte & 0x01 != 0;

    if tone_mapper_data_present {
        // Tone-mapper blobs are not interpreted; skip over the payload.
        let tone_mapper_size = reader.read_multi_byte()?;
        let skip = usize::try_from(tone_mapper_size)
            .map_err(|_| DecodeError::EntropyOverflow("tone mapper size exceeds usize"))?;
        reader.seek(skip)?;
    }

    if tone_mapper_type == 31 {
        // tone_mapper_type_extended: 8 bits.
        tone_mapper_type = reader.read_u8()?;
    }

    if deinterlacer_enabled {
        let byte = reader.read_u8()?;

        // deinterlacer_type: 4 bits, top_field_first_flag: 1 bit,
        // reserved_zeros: 3 bits.
        if byte & 0b111 != 0 {
            return Err(DecodeError::UnsupportedFeature("reserved deinterlacer bits set"));
        }

        global.deinterlacing_info.deinterlacer_type = (byte >> 4) & 0x0F;
        global.deinterlacing_info.top_field_first = (byte >> 3) & 0x01 != 0;
        global.hdr_info.flags |= HdrFlags::DEINTERLACER_ENABLED;
    }

    global.hdr_info.flags |= HdrFlags::PAYLOAD_GLOBAL_CONFIG;
    global.hdr_info.tonemapper_type[usize::from(tone_mapper_location)] = tone_mapper_type;
    if tone_mapper_data_present {
        global.hdr_info.flags |= HdrFlags::TONE_MAPPER_DATA;
    }

    Ok(())
}
