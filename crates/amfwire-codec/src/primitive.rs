//! Stateless primitive encoding: varint29, doubles and fixed-width network integers.
//!
//! Readers operate on a `&[u8]` cursor that is advanced past consumed bytes.
//! Every reader checks the remaining length first and fails with
//! [`AmfError::IncompleteData`] instead of panicking, so callers can rewind
//! and retry once more bytes arrive.

use bytes::{Buf, BufMut};

use crate::error::{AmfError, Result};
use crate::marker::MAX_INTEGER;

/// Mask applied to every value before varint29 encoding.
pub const U29_MASK: u32 = 0x1FFF_FFFF;

/// Write a varint29 using the minimal number of bytes (1-4).
///
/// Wire format:
/// ```text
/// 0x00000000 - 0x0000007F : 0xxxxxxx
/// 0x00000080 - 0x00003FFF : 1xxxxxxx 0xxxxxxx
/// 0x00004000 - 0x001FFFFF : 1xxxxxxx 1xxxxxxx 0xxxxxxx
/// 0x00200000 - 0x1FFFFFFF : 1xxxxxxx 1xxxxxxx 1xxxxxxx xxxxxxxx
/// ```
pub fn put_u29(dst: &mut impl BufMut, value: u32) {
    let value = value & U29_MASK;
    if value < 0x80 {
        dst.put_u8(value as u8);
    } else if value < 0x4000 {
        dst.put_u8(((value >> 7) & 0x7F | 0x80) as u8);
        dst.put_u8((value & 0x7F) as u8);
    } else if value < 0x20_0000 {
        dst.put_u8(((value >> 14) & 0x7F | 0x80) as u8);
        dst.put_u8(((value >> 7) & 0x7F | 0x80) as u8);
        dst.put_u8((value & 0x7F) as u8);
    } else {
        dst.put_u8(((value >> 22) & 0x7F | 0x80) as u8);
        dst.put_u8(((value >> 15) & 0x7F | 0x80) as u8);
        dst.put_u8(((value >> 8) & 0x7F | 0x80) as u8);
        dst.put_u8((value & 0xFF) as u8);
    }
}

/// Write a signed integer in varint29 two's-complement form.
///
/// The caller is responsible for range checking; out-of-range values are
/// silently truncated to their low 29 bits.
pub fn put_i29(dst: &mut impl BufMut, value: i64) {
    put_u29(dst, value as u32);
}

/// Read a varint29 as an unsigned 29-bit quantity (reference/length headers).
pub fn get_u29(src: &mut &[u8]) -> Result<u32> {
    let mut result: u32 = 0;
    let mut n = 0;
    let mut byte = get_u8(src)?;

    while byte & 0x80 != 0 && n < 3 {
        result = (result << 7) | u32::from(byte & 0x7F);
        byte = get_u8(src)?;
        n += 1;
    }

    if n < 3 {
        result = (result << 7) | u32::from(byte);
    } else {
        // The fourth byte contributes all 8 bits.
        result = (result << 8) | u32::from(byte);
    }

    Ok(result)
}

/// Read a varint29 integer value, sign-adjusting magnitudes above `MAX_INTEGER`.
pub fn get_i29(src: &mut &[u8]) -> Result<i32> {
    let raw = i64::from(get_u29(src)?);
    let value = if raw > MAX_INTEGER { raw - (1 << 29) } else { raw };
    Ok(value as i32)
}

/// Read a single byte.
pub fn get_u8(src: &mut &[u8]) -> Result<u8> {
    ensure(src, 1)?;
    Ok(src.get_u8())
}

/// Read a big-endian u16.
pub fn get_u16(src: &mut &[u8]) -> Result<u16> {
    ensure(src, 2)?;
    Ok(src.get_u16())
}

/// Read a big-endian u32.
pub fn get_u32(src: &mut &[u8]) -> Result<u32> {
    ensure(src, 4)?;
    Ok(src.get_u32())
}

/// Read a big-endian i32.
pub fn get_i32(src: &mut &[u8]) -> Result<i32> {
    ensure(src, 4)?;
    Ok(src.get_i32())
}

/// Read an 8-byte big-endian IEEE-754 double.
pub fn get_f64(src: &mut &[u8]) -> Result<f64> {
    ensure(src, 8)?;
    Ok(src.get_f64())
}

/// Borrow the next `len` bytes and advance past them.
pub fn get_slice<'a>(src: &mut &'a [u8], len: usize) -> Result<&'a [u8]> {
    ensure(src, len)?;
    let whole: &'a [u8] = *src;
    let (head, tail) = whole.split_at(len);
    *src = tail;
    Ok(head)
}

fn ensure(src: &[u8], len: usize) -> Result<()> {
    if src.len() < len {
        return Err(AmfError::IncompleteData);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;
    use crate::marker::MIN_INTEGER;

    fn encode(value: u32) -> Vec<u8> {
        let mut buf = BytesMut::new();
        put_u29(&mut buf, value);
        buf.to_vec()
    }

    #[test]
    fn test_u29_minimal_lengths() {
        assert_eq!(encode(0), vec![0x00]);
        assert_eq!(encode(0x7F), vec![0x7F]);
        assert_eq!(encode(0x80), vec![0x81, 0x00]);
        assert_eq!(encode(0x3FFF), vec![0xFF, 0x7F]);
        assert_eq!(encode(0x4000), vec![0x81, 0x80, 0x00]);
        assert_eq!(encode(0x1F_FFFF), vec![0xFF, 0xFF, 0x7F]);
        assert_eq!(encode(0x20_0000), vec![0x80, 0xC0, 0x80, 0x00]);
        assert_eq!(encode(0x0FFF_FFFF), vec![0xBF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_i29_boundaries_roundtrip() {
        for value in [0i64, 127, 16383, 2_097_151, MAX_INTEGER, MIN_INTEGER, -1] {
            let mut buf = BytesMut::new();
            put_i29(&mut buf, value);
            let mut src = &buf[..];
            assert_eq!(i64::from(get_i29(&mut src).unwrap()), value);
            assert!(src.is_empty());
        }
    }

    #[test]
    fn test_min_integer_wire_bytes() {
        let mut buf = BytesMut::new();
        put_i29(&mut buf, MIN_INTEGER);
        assert_eq!(buf.as_ref(), &[0xC0, 0x80, 0x80, 0x00]);
    }

    #[test]
    fn test_mask_applied_before_encoding() {
        assert_eq!(encode(0xFFFF_FFFF), encode(U29_MASK));
    }

    #[test]
    fn test_u29_incomplete() {
        let mut src: &[u8] = &[0x81, 0x80];
        assert!(matches!(get_u29(&mut src), Err(AmfError::IncompleteData)));

        let mut empty: &[u8] = &[];
        assert!(matches!(get_u29(&mut empty), Err(AmfError::IncompleteData)));
    }

    #[test]
    fn test_fixed_width_network_order() {
        let mut buf = BytesMut::new();
        buf.put_u16(0x1234);
        buf.put_u32(0xDEAD_BEEF);
        buf.put_i32(-2);
        buf.put_f64(3.5);
        assert_eq!(&buf[..2], &[0x12, 0x34]);
        assert_eq!(&buf[2..6], &[0xDE, 0xAD, 0xBE, 0xEF]);

        let mut src = &buf[..];
        assert_eq!(get_u16(&mut src).unwrap(), 0x1234);
        assert_eq!(get_u32(&mut src).unwrap(), 0xDEAD_BEEF);
        assert_eq!(get_i32(&mut src).unwrap(), -2);
        assert_eq!(get_f64(&mut src).unwrap(), 3.5);
        assert!(src.is_empty());
    }

    #[test]
    fn test_double_wire_bytes() {
        let mut buf = BytesMut::new();
        buf.put_f64(3.5);
        assert_eq!(buf.as_ref(), &[0x40, 0x0C, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_slice_truncated() {
        let mut src: &[u8] = b"abc";
        assert!(matches!(get_slice(&mut src, 4), Err(AmfError::IncompleteData)));
        assert_eq!(get_slice(&mut src, 2).unwrap(), b"ab");
        assert_eq!(src, b"c");
    }
}
