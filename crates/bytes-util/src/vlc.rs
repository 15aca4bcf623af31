/// Maximum number of bytes in a multi-byte encoded `u64`: nine 7-bit
/// payload groups cover 63 bits, so a tenth byte is needed for the top bit.
pub const MULTI_BYTE_MAX_BYTES: usize = 10;

/// Appends the multi-byte encoding of `value` to `out`.
///
/// This is the inverse of [`ByteReader::read_multi_byte`]: 7 payload bits
/// per byte, most significant group first, top bit set on every byte
/// except the last.
///
/// [`ByteReader::read_multi_byte`]: crate::ByteReader::read_multi_byte
pub fn encode_multi_byte(value: u64, out: &mut Vec<u8>) {
    let groups = match value {
        0 => 1,
        _ => (70 - value.leading_zeros() as usize) / 7,
    };

    for group in (0..groups).rev() {
        let payload = ((value >> (group * 7)) & 0x7F) as u8;
        out.push(if group == 0 { payload } else { payload | 0x80 });
    }
}
