use lcevc_bytes_util::ByteReader;

use super::GlobalConfig;
use crate::error::{DecodeError, Result};

/// Parses a sequence config block, ISO/IEC 23094-2 - 7.3.4 (Table 8) &
/// 7.4.3.2.
///
/// Profile and level constrain the encoder, not the decoder, so they are
/// only logged. The conformance window is stored raw here; it is scaled
/// to plane-local pixels and validated against the picture dimensions
/// when the global config block is parsed.
pub(super) fn parse_block_sequence_config(
    reader: &mut ByteReader<'_>,
    global: &mut GlobalConfig,
) -> Result<()> {
    let data = reader.read_u8()?;

    // profile_idc: 4 bits, level_idc: 4 bits.
    let profile = (data >> 4) & 0x0F;
    let level = data & 0x0F;
    tracing::debug!(profile, level, "sequence config");

    let data = reader.read_u8()?;

    // sublevel_idc: 2 bits.
    let sublevel = (data >> 6) & 0x03;

    // conformance_window_flag: 1 bit.
    global.crop_enabled = (data >> 5) & 0x01 != 0;
    tracing::debug!(sublevel, crop = global.crop_enabled, "sequence config");

    // extended_profile_idc: 3 bits, extended_level_idc: 7 bits (v2).
    if profile == 15 || level == 15 {
        let extended = reader.read_u8()?;
        tracing::debug!(
            extended_profile = (extended >> 5) & 0x07,
            extended_level = (extended >> 1) & 0x7F,
            "sequence config"
        );
    }

    if global.crop_enabled {
        global.crop.left = parse_conformance_value(reader)?;
        global.crop.right = parse_conformance_value(reader)?;
        global.crop.top = parse_conformance_value(reader)?;
        global.crop.bottom = parse_conformance_value(reader)?;
        tracing::debug!(crop = ?global.crop, "conformance window");
    }

    Ok(())
}

fn parse_conformance_value(reader: &mut ByteReader<'_>) -> Result<u16> {
    let value = reader.read_multi_byte()?;

    if value > super::types::MAX_CONFORMANCE_WINDOW_VALUE {
        return Err(DecodeError::EntropyOverflow("conformance window value exceeds 16 bits"));
    }

    Ok(value as u16)
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn parses_without_crop() {
        let data = [0x12, 0b00_0_00000];
        let mut reader = ByteReader::new(&data).unwrap();
        let mut global = GlobalConfig::default();
        parse_block_sequence_config(&mut reader, &mut global).unwrap();
        assert!(!global.crop_enabled);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn parses_crop_values() {
        // Crop flag set; offsets 1, 2, 300, 4 (300 = 0x82 0x2C).
        let data = [0x12, 0b00_1_00000, 0x01, 0x02, 0x82, 0x2C, 0x04];
        let mut reader = ByteReader::new(&data).unwrap();
        let mut global = GlobalConfig::default();
        parse_block_sequence_config(&mut reader, &mut global).unwrap();

        assert!(global.crop_enabled);
        assert_eq!(
            (global.crop.left, global.crop.right, global.crop.top, global.crop.bottom),
            (1, 2, 300, 4)
        );
    }

    #[test]
    fn extended_profile_byte_is_consumed() {
        let data = [0xF0, 0x00, 0xAA];
        let mut reader = ByteReader::new(&data).unwrap();
        let mut global = GlobalConfig::default();
        parse_block_sequence_config(&mut reader, &mut global).unwrap();
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn oversized_crop_value_is_rejected() {
        // 0x84 0x80 0x00 encodes 65536, one past the maximum.
        let data = [0x12, 0b00_1_00000, 0x84, 0x80, 0x00];
        let mut reader = ByteReader::new(&data).unwrap();
        let mut global = GlobalConfig::default();
        assert!(matches!(
            parse_block_sequence_config(&mut reader, &mut global),
            Err(DecodeError::EntropyOverflow(_))
        ));
    }
}
