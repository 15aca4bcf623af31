use lcevc_bytes_util::ByteReader;

use super::{FrameConfig, GlobalConfig};
use crate::config::types::{
    DequantOffsetMode, DitherType, FieldType, LoqIndex, MAX_STEP_WIDTH, PictureType,
    QuantMatrixMode, bitstream_version,
};
use crate::dequant::quant_matrix_set_default;
use crate::error::Result;

/// Parses a picture config block, ISO/IEC 23094-2 - 7.3.6 (Table 10) &
/// 7.4.3.4.
pub(super) fn parse_block_picture_config(
    reader: &mut ByteReader<'_>,
    frame: &mut FrameConfig,
    global: &GlobalConfig,
) -> Result<()> {
    let data = reader.read_u8()?;

    // no_enhancement_bit_flag: 1 bit; inverted into "enabled".
    frame.entropy_enabled = data & 0x80 == 0;

    let mut qm_mode = QuantMatrixMode::UsePrevious; // Default, 7.4.3.4.
    let mut step_width_loq1_enabled = false;
    let mut dequant_offset_enabled = false;
    let mut dither_control_present = false;

    if frame.entropy_enabled {
        // quant_matrix_mode: 3 bits.
        qm_mode = QuantMatrixMode::from_raw((data >> 4) & 0x07)?;

        // dequant_offset_signalled_flag: 1 bit.
        dequant_offset_enabled = (data >> 3) & 0x01 != 0;

        // picture_type_bit_flag: 1 bit.
        frame.picture_type = if (data >> 2) & 0x01 != 0 {
            PictureType::Field
        } else {
            PictureType::Frame
        };

        // temporal_refresh_bit_flag: 1 bit.
        frame.temporal_refresh = (data >> 1) & 0x01 != 0;

        // temporal_signalling_present is inferred rather than read when
        // enhancement is enabled.
        frame.temporal_signalling_present = global.temporal_enabled && !frame.temporal_refresh;

        // step_width_sublayer1_enabled_flag: 1 bit.
        step_width_loq1_enabled = data & 0x01 != 0;

        let data16 = reader.read_u16()?;

        // step_width_sublayer2: 15 bits.
        frame.step_widths[LoqIndex::Loq0 as usize] = (data16 >> 1) & 0x7FFF;

        // dithering_control_flag: 1 bit.
        dither_control_present = true;
        frame.dither_enabled = data16 & 0x01 != 0;

        tracing::debug!(
            step_width_loq0 = frame.step_widths[LoqIndex::Loq0 as usize],
            qm_mode = ?qm_mode,
            temporal_signalling = frame.temporal_signalling_present,
            "picture config"
        );
    } else {
        // picture_type_bit_flag: 1 bit.
        frame.picture_type = if (data >> 2) & 0x01 != 0 {
            PictureType::Field
        } else {
            PictureType::Frame
        };

        // temporal_refresh_bit_flag: 1 bit.
        frame.temporal_refresh = (data >> 1) & 0x01 != 0;

        // temporal_signalling_present_flag: 1 bit, explicit in this path.
        frame.temporal_signalling_present = data & 0x01 != 0;

        tracing::debug!(
            temporal_signalling = frame.temporal_signalling_present,
            "picture config without enhancement"
        );

        if frame.global_config_set {
            // IDR with enhancement disabled: dither control is
            // implicitly unsignalled, so dithering resets.
            frame.dither_type = DitherType::None;
            frame.dither_strength = 0;
        }
    }

    // Before AlignWithSpec this tail was only sent with enhancement
    // enabled.
    if global.bitstream_version >= bitstream_version::ALIGN_WITH_SPEC || frame.entropy_enabled {
        parse_picture_config_tail(
            reader,
            qm_mode,
            step_width_loq1_enabled,
            dequant_offset_enabled,
            dither_control_present,
            frame,
            global,
        )?;
    }

    frame.frame_config_set = true;

    Ok(())
}

/// 7.3.6 (Table 10), everything outside the `no_enhancement_bit_flag`
/// test: field type, LOQ-1 step width, quant matrices, dequant offset
/// and dither.
fn parse_picture_config_tail(
    reader: &mut ByteReader<'_>,
    qm_mode: QuantMatrixMode,
    step_width_loq1_enabled: bool,
    dequant_offset_enabled: bool,
    dither_control_present: bool,
    frame: &mut FrameConfig,
    global: &GlobalConfig,
) -> Result<()> {
    if frame.picture_type == PictureType::Field {
        // field_type: 1 bit, reserved: 7 bits.
        let data = reader.read_u8()?;
        frame.field_type = if (data >> 7) & 0x01 != 0 {
            FieldType::Bottom
        } else {
            FieldType::Top
        };
    }

    if step_width_loq1_enabled {
        // step_width_sublayer1: 15 bits,
        // level1_filtering_enabled_flag: 1 bit.
        let data16 = reader.read_u16()?;
        frame.step_widths[LoqIndex::Loq1 as usize] = (data16 >> 1) & 0x7FFF;
        frame.deblock_enabled = data16 & 0x01 != 0;
    } else {
        frame.step_widths[LoqIndex::Loq1 as usize] = MAX_STEP_WIDTH;
    }

    parse_quant_matrices(reader, qm_mode, frame, global)?;

    if dequant_offset_enabled {
        // dequant_offset_mode_flag: 1 bit, dequant_offset: 7 bits.
        let data = reader.read_u8()?;
        frame.dequant_offset_mode = if (data >> 7) & 0x01 != 0 {
            DequantOffsetMode::ConstOffset
        } else {
            DequantOffsetMode::Default
        };
        frame.dequant_offset = Some(data & 0x7F);
    } else {
        frame.dequant_offset = None;
    }

    let dithering_enabled =
        if global.bitstream_version >= bitstream_version::ALIGN_WITH_SPEC {
            if !dither_control_present && frame.nal_idr {
                // 7.4.3.4: an absent flag on an IDR disables dithering.
                frame.dither_enabled = false;
            }
            frame.dither_enabled
        } else {
            // Older versions sent the dither byte on every frame that
            // had dithering enabled.
            dither_control_present && frame.dither_enabled
        };

    if dithering_enabled {
        // dithering_type: 2 bits, reserved: 1 bit,
        // dithering_strength: 5 bits.
        let data = reader.read_u8()?;
        frame.dither_type = DitherType::from_raw((data >> 6) & 0x03)?;

        if frame.dither_type != DitherType::None {
            frame.dither_strength = data & 0x1F;
        }
    }

    Ok(())
}

/// Applies the quant-matrix mode to both LOQs, 7.4.3.4. `UsePrevious` on
/// an IDR (or before any matrix has been signalled) falls back to the
/// standard defaults.
fn parse_quant_matrices(
    reader: &mut ByteReader<'_>,
    qm_mode: QuantMatrixMode,
    frame: &mut FrameConfig,
    global: &GlobalConfig,
) -> Result<()> {
    let loq0_scaling = global.scaling_modes[LoqIndex::Loq0 as usize];
    let layer_count = usize::from(global.num_layers);

    // LOQ-0.
    match qm_mode {
        QuantMatrixMode::UsePrevious | QuantMatrixMode::CustomLoq1 => {
            if frame.nal_idr || !frame.quant_matrix.set {
                quant_matrix_set_default(
                    &mut frame.quant_matrix,
                    loq0_scaling,
                    global.transform,
                    LoqIndex::Loq0,
                );
            }
        }
        QuantMatrixMode::UseDefault => {
            quant_matrix_set_default(
                &mut frame.quant_matrix,
                loq0_scaling,
                global.transform,
                LoqIndex::Loq0,
            );
        }
        QuantMatrixMode::CustomLoq0
        | QuantMatrixMode::CustomBoth
        | QuantMatrixMode::CustomBothUnique => {
            let values = reader.read_n(layer_count)?;
            frame.quant_matrix.values[LoqIndex::Loq0 as usize][..layer_count]
                .copy_from_slice(values);
        }
    }

    // LOQ-1. Note that the LOQ-0 scaling mode still selects the default.
    match qm_mode {
        QuantMatrixMode::UsePrevious | QuantMatrixMode::CustomLoq0 => {
            if frame.nal_idr || !frame.quant_matrix.set {
                quant_matrix_set_default(
                    &mut frame.quant_matrix,
                    loq0_scaling,
                    global.transform,
                    LoqIndex::Loq1,
                );
            }
        }
        QuantMatrixMode::UseDefault => {
            quant_matrix_set_default(
                &mut frame.quant_matrix,
                loq0_scaling,
                global.transform,
                LoqIndex::Loq1,
            );
        }
        QuantMatrixMode::CustomLoq1 | QuantMatrixMode::CustomBothUnique => {
            let values = reader.read_n(layer_count)?;
            frame.quant_matrix.values[LoqIndex::Loq1 as usize][..layer_count]
                .copy_from_slice(values);
        }
        QuantMatrixMode::CustomBoth => {
            let (loq0, loq1) = frame.quant_matrix.values.split_at_mut(1);
            loq1[0][..layer_count].copy_from_slice(&loq0[0][..layer_count]);
        }
    }

    frame.quant_matrix.set = true;

    Ok(())
}
