//! Byte-order and slicing helpers shared by the packet and signal codecs.
//!
//! All multi-byte integers on the wire are little-endian, independent of the
//! host byte order.

use crate::error::BLError;
use byteorder::{ByteOrder, LittleEndian};

/// Encode a signed 16-bit value as 2 little-endian bytes.
pub fn i16_to_le(value: i16) -> [u8; 2] {
    let mut buf = [0u8; 2];
    LittleEndian::write_i16(&mut buf, value);
    buf
}

/// Encode a signed 32-bit value as 4 little-endian bytes.
pub fn i32_to_le(value: i32) -> [u8; 4] {
    let mut buf = [0u8; 4];
    LittleEndian::write_i32(&mut buf, value);
    buf
}

/// Read a little-endian `u16` at `offset`.
pub fn read_u16_le(buf: &[u8], offset: usize) -> Result<u16, BLError> {
    let bytes = field(buf, offset, 2)?;
    Ok(LittleEndian::read_u16(bytes))
}

/// Read a little-endian `i16` at `offset`.
pub fn read_i16_le(buf: &[u8], offset: usize) -> Result<i16, BLError> {
    let bytes = field(buf, offset, 2)?;
    Ok(LittleEndian::read_i16(bytes))
}

fn field(buf: &[u8], offset: usize, len: usize) -> Result<&[u8], BLError> {
    buf.get(offset..offset + len).ok_or(BLError::InsufficientData {
        expected: offset + len,
        actual: buf.len(),
    })
}

/// Copy the inclusive byte range `[start, end]` out of `buf`.
///
/// Fails with [`BLError::Argument`] if `end <= start` or `end` is past the
/// last byte of `buf`.
pub fn slice_inclusive(buf: &[u8], start: usize, end: usize) -> Result<Vec<u8>, BLError> {
    if end <= start || end >= buf.len() {
        return Err(BLError::Argument(format!(
            "invalid range [{start}, {end}] for buffer of {} bytes",
            buf.len()
        )));
    }
    Ok(buf[start..=end].to_vec())
}

/// Copy `src` into `dst[first..=last]`.
///
/// The source is truncated when it is longer than the range; bytes of the
/// range beyond the end of `src` are left as they were.
pub fn fill_from(src: &[u8], dst: &mut [u8], first: usize, last: usize) {
    if last < first || first >= dst.len() {
        return;
    }
    let last = last.min(dst.len() - 1);
    let len = src.len().min(last - first + 1);
    dst[first..first + len].copy_from_slice(&src[..len]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_le_encoding_is_host_independent() {
        assert_eq!(i16_to_le(0x0065), [0x65, 0x00]);
        assert_eq!(i16_to_le(-1), [0xff, 0xff]);
        assert_eq!(i32_to_le(0x0102_0304), [0x04, 0x03, 0x02, 0x01]);
        assert_eq!(i32_to_le(-8), [0xf8, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn test_read_le_values() {
        let buf = [0x00, 0xff, 0xff, 0x2a, 0x27];
        assert_eq!(read_u16_le(&buf, 1).unwrap(), 0xffff);
        assert_eq!(read_i16_le(&buf, 1).unwrap(), -1);
        assert_eq!(read_u16_le(&buf, 3).unwrap(), 0x272a);
        assert!(matches!(
            read_u16_le(&buf, 4),
            Err(BLError::InsufficientData { expected: 6, actual: 5 })
        ));
    }

    #[test]
    fn test_slice_inclusive() {
        let buf = [1u8, 2, 3, 4, 5, 6];
        assert_eq!(slice_inclusive(&buf, 1, 3).unwrap(), vec![2, 3, 4]);
        assert_eq!(slice_inclusive(&buf, 4, 5).unwrap(), vec![5, 6]);
        assert!(matches!(slice_inclusive(&buf, 3, 3), Err(BLError::Argument(_))));
        assert!(matches!(slice_inclusive(&buf, 4, 2), Err(BLError::Argument(_))));
        assert!(matches!(slice_inclusive(&buf, 0, 6), Err(BLError::Argument(_))));
    }

    #[test]
    fn test_fill_from_truncates_and_preserves() {
        let mut dst = [0xaau8; 8];
        fill_from(b"hello world", &mut dst, 2, 4);
        assert_eq!(dst, [0xaa, 0xaa, b'h', b'e', b'l', 0xaa, 0xaa, 0xaa]);

        let mut dst = [0u8; 8];
        fill_from(b"ab", &mut dst, 1, 6);
        assert_eq!(dst, [0, b'a', b'b', 0, 0, 0, 0, 0]);
    }
}
