use byteorder::{BigEndian, ByteOrder};
use bytes::Bytes;

use crate::NalUnitType;
use crate::error::{DecodeError, Result};

/// An unencapsulated LCEVC NAL unit: the raw block payload with start
/// code, header, emulation prevention bytes and RBSP stop byte removed.
///
/// ISO/IEC 23094-2 - 7.3.2 (Table 6) & 7.4.2.2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nal {
    /// The unencapsulated payload. Chunk descriptors parsed from this
    /// picture borrow (refcounted) slices of this buffer.
    pub body: Bytes,
    /// Whether the NAL unit is an IDR picture. Global configuration is
    /// only expected to change on IDR pictures.
    pub is_idr: bool,
}

impl Nal {
    /// Unencapsulates one NAL unit.
    ///
    /// The input must begin with a `00 00 01` or `00 00 00 01` start
    /// code, carry the 16-bit NAL header `(forbidden_zero=0,
    /// forbidden_one=1, nal_unit_type:5, reserved:9 = 0x1FF)`, and end
    /// with the RBSP stop byte `0x80`. Emulation prevention byte removal
    /// collapses every `00 00 03` to `00 00` in the body.
    pub fn unencapsulate(data: &[u8]) -> Result<Self> {
        // Start code, 2 header bytes, stop byte.
        if data.len() < 6 {
            return Err(DecodeError::MalformedNal("too short for a NAL unit"));
        }

        let header_offset = if data[..3] == [0x00, 0x00, 0x01] {
            3
        } else if data[..4] == [0x00, 0x00, 0x00, 0x01] {
            4
        } else {
            return Err(DecodeError::MalformedNal("missing start code"));
        };

        if data[data.len() - 1] != 0x80 {
            return Err(DecodeError::MalformedNal("missing RBSP stop byte"));
        }

        let header = BigEndian::read_u16(&data[header_offset..]);

        // forbidden_zero_bit u(1), forbidden_one_bit u(1),
        // nal_unit_type u(5), reserved_flag u(9).
        if header >> 14 != 0b01 {
            return Err(DecodeError::MalformedNal("forbidden bits are not 01"));
        }
        if header & 0x1FF != 0x1FF {
            return Err(DecodeError::MalformedNal("reserved flags are not all set"));
        }

        let nal_unit_type = NalUnitType::from(((header >> 9) & 0x1F) as u8);
        let is_idr = match nal_unit_type {
            NalUnitType::Idr => true,
            NalUnitType::NonIdr => false,
            _ => return Err(DecodeError::MalformedNal("NAL type is not IDR or non-IDR")),
        };

        let payload = &data[header_offset + 2..data.len() - 1];
        let mut body = Vec::with_capacity(payload.len());
        let mut zeroes = 0u8;

        for &byte in payload {
            if zeroes == 2 && byte == 0x03 {
                zeroes = 0;
                continue;
            }

            if byte == 0x00 {
                zeroes += 1;
            } else {
                zeroes = 0;
            }

            body.push(byte);
        }

        Ok(Self {
            body: Bytes::from(body),
            is_idr,
        })
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;
    use crate::tests::{encapsulate, encapsulate_body};

    #[test]
    fn unencapsulates_idr_and_non_idr() {
        let data = encapsulate(&[0xAA, 0xBB], true, false);
        let nal = Nal::unencapsulate(&data).unwrap();
        assert!(nal.is_idr);
        assert_eq!(nal.body.as_ref(), [0xAA, 0xBB]);

        let data = encapsulate(&[0xAA, 0xBB], false, true);
        let nal = Nal::unencapsulate(&data).unwrap();
        assert!(!nal.is_idr);
        assert_eq!(nal.body.as_ref(), [0xAA, 0xBB]);
    }

    #[test]
    fn emulation_prevention_round_trip() {
        // A body of three zero bytes must be sent as 00 00 03 00.
        let encapsulated = encapsulate(&[0x00, 0x00, 0x00], true, false);
        assert_eq!(&encapsulated[5..9], [0x00, 0x00, 0x03, 0x00]);

        let nal = Nal::unencapsulate(&encapsulated).unwrap();
        assert_eq!(nal.body.as_ref(), [0x00, 0x00, 0x00]);

        // And unencapsulating then re-encapsulating is the identity on
        // the wire form.
        assert_eq!(encapsulate_body(&nal.body), &encapsulated[5..9]);
    }

    #[test]
    fn strips_every_emulation_sequence() {
        let body = [0x01, 0x00, 0x00, 0x02, 0x00, 0x00, 0x01, 0xFF];
        let data = encapsulate(&body, true, false);
        let nal = Nal::unencapsulate(&data).unwrap();
        assert_eq!(nal.body.as_ref(), body);
    }

    #[test]
    fn rejects_bad_start_code() {
        let mut data = encapsulate(&[0xAA], true, false);
        data[2] = 0x02;
        assert!(matches!(
            Nal::unencapsulate(&data),
            Err(DecodeError::MalformedNal("missing start code"))
        ));
    }

    #[test]
    fn rejects_missing_stop_byte() {
        let mut data = encapsulate(&[0xAA], true, false);
        *data.last_mut().unwrap() = 0x00;
        assert!(matches!(
            Nal::unencapsulate(&data),
            Err(DecodeError::MalformedNal("missing RBSP stop byte"))
        ));
    }

    #[test]
    fn rejects_bad_header_bits() {
        // Forbidden bits 00.
        let mut data = encapsulate(&[0xAA], true, false);
        data[3] &= 0b0011_1111;
        assert!(Nal::unencapsulate(&data).is_err());

        // Reserved flags not all ones.
        let mut data = encapsulate(&[0xAA], true, false);
        data[4] = 0x00;
        assert!(Nal::unencapsulate(&data).is_err());

        // A NAL type that is neither IDR nor non-IDR.
        let mut data = encapsulate(&[0xAA], true, false);
        let header = (0b01u16 << 14) | (5 << 9) | 0x1FF;
        data[3..5].copy_from_slice(&header.to_be_bytes());
        assert!(matches!(
            Nal::unencapsulate(&data),
            Err(DecodeError::MalformedNal("NAL type is not IDR or non-IDR"))
        ));
    }
}
