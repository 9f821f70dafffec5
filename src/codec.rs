//! # Codec Module
//!
//! Primitive (de)serialization shared by every layer above it: fixed-width
//! big-endian integers of arbitrary byte width up to 8, NUL-terminated
//! strings, and IEEE floats written in the host's native byte order (a
//! deliberate trade-off — the format is not portable across platforms of
//! differing endianness).

use crate::error::{StoreError, StoreResult};

/// Appends the low `width` bytes of `value`, big-endian, truncating any
/// higher-order bits that don't fit. `width` must be in `1..=8`.
pub fn write_uint(buf: &mut Vec<u8>, value: u64, width: usize) {
    debug_assert!((1..=8).contains(&width), "integer width must be 1..=8");
    let bytes = value.to_be_bytes();
    buf.extend_from_slice(&bytes[8 - width..]);
}

/// Reads `width` big-endian bytes from the front of `data` and zero-extends
/// them into a `u64`.
pub fn read_uint(data: &[u8], width: usize) -> StoreResult<u64> {
    debug_assert!((1..=8).contains(&width), "integer width must be 1..=8");
    if data.len() < width {
        return Err(StoreError::Persistence(format!(
            "truncated integer: need {} bytes, have {}",
            width,
            data.len()
        )));
    }
    let mut padded = [0u8; 8];
    padded[8 - width..].copy_from_slice(&data[..width]);
    Ok(u64::from_be_bytes(padded))
}

/// As [`write_uint`], but sign-extends `value` into the low `width` bytes.
pub fn write_int(buf: &mut Vec<u8>, value: i64, width: usize) {
    write_uint(buf, value as u64, width);
}

/// As [`read_uint`], but sign-extends the result back out to `i64`.
pub fn read_int(data: &[u8], width: usize) -> StoreResult<i64> {
    let raw = read_uint(data, width)?;
    let shift = 64 - (width as u32 * 8);
    Ok(((raw << shift) as i64) >> shift)
}

/// Appends `s` followed by a single NUL terminator.
pub fn write_cstring(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(s.as_bytes());
    buf.push(0);
}

/// Reads a NUL-terminated string from the front of `data`, returning the
/// decoded string slice and the number of bytes consumed (including the
/// terminator). The borrow is only valid as long as `data` is.
pub fn read_cstring(data: &[u8]) -> StoreResult<(&str, usize)> {
    let nul = data
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| StoreError::Persistence("unterminated string".into()))?;
    let s = std::str::from_utf8(&data[..nul])
        .map_err(|e| StoreError::Persistence(format!("invalid UTF-8 string: {}", e)))?;
    Ok((s, nul + 1))
}

/// Appends the raw bytes of `v` in the host's native byte order.
pub fn write_f32_native(buf: &mut Vec<u8>, v: f32) {
    buf.extend_from_slice(&v.to_ne_bytes());
}

pub fn read_f32_native(data: &[u8]) -> StoreResult<f32> {
    let bytes: [u8; 4] = data
        .get(..4)
        .ok_or_else(|| StoreError::Persistence("truncated f32".into()))?
        .try_into()
        .unwrap();
    Ok(f32::from_ne_bytes(bytes))
}

pub fn write_f64_native(buf: &mut Vec<u8>, v: f64) {
    buf.extend_from_slice(&v.to_ne_bytes());
}

pub fn read_f64_native(data: &[u8]) -> StoreResult<f64> {
    let bytes: [u8; 8] = data
        .get(..8)
        .ok_or_else(|| StoreError::Persistence("truncated f64".into()))?
        .try_into()
        .unwrap();
    Ok(f64::from_ne_bytes(bytes))
}

/// Raw-data and float collections require the native width to equal the
/// declared `byteSize`; this rejects configurations that would silently
/// truncate or pad on this platform (e.g. a 32-bit `long`).
pub fn check_native_width(type_name: &str, native_width: usize, declared: usize) -> StoreResult<()> {
    if native_width != declared {
        return Err(StoreError::InvalidArgument(format!(
            "{} has native width {} on this platform but was declared with byteSize {}; \
             raw-data and float APIs require them to match",
            type_name, native_width, declared
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_unsigned_correctness() {
        let data = [0xDEu8, 0xAD, 0xBE, 0xEF];
        assert_eq!(read_uint(&data, 4).unwrap(), 0xDEAD_BEEFu64);
        assert_eq!(read_uint(&data[..2], 2).unwrap(), 0xDEAD);
    }

    #[test]
    fn write_then_read_round_trips_every_width() {
        for width in 1..=8usize {
            let max = if width == 8 { u64::MAX } else { (1u64 << (width * 8)) - 1 };
            let mut buf = Vec::new();
            write_uint(&mut buf, max, width);
            assert_eq!(buf.len(), width);
            assert_eq!(read_uint(&buf, width).unwrap(), max);
        }
    }

    #[test]
    fn write_uint_truncates_high_bits() {
        let mut buf = Vec::new();
        write_uint(&mut buf, 0x1_0000, 2);
        assert_eq!(buf, vec![0x00, 0x00]);
    }

    #[test]
    fn signed_round_trip_preserves_sign() {
        let mut buf = Vec::new();
        write_int(&mut buf, -1, 2);
        assert_eq!(read_int(&buf, 2).unwrap(), -1);

        let mut buf = Vec::new();
        write_int(&mut buf, -42, 4);
        assert_eq!(read_int(&buf, 4).unwrap(), -42);
    }

    #[test]
    fn parse_unsigned_error_on_truncation() {
        let data = [0xDEu8, 0xAD];
        assert!(read_uint(&data, 4).is_err());
    }

    #[test]
    fn parse_string_correctness() {
        let mut buf = Vec::new();
        write_cstring(&mut buf, "summrs");
        let (s, consumed) = read_cstring(&buf).unwrap();
        assert_eq!(s, "summrs");
        assert_eq!(consumed, buf.len());
    }

    #[test]
    fn parse_string_error_on_missing_terminator() {
        let data = [b'h', b'i'];
        assert!(read_cstring(&data).is_err());
    }

    #[test]
    fn float_round_trip_native() {
        let mut buf = Vec::new();
        write_f32_native(&mut buf, 2.5);
        assert_eq!(read_f32_native(&buf).unwrap(), 2.5);

        let mut buf = Vec::new();
        write_f64_native(&mut buf, 1.44);
        assert_eq!(read_f64_native(&buf).unwrap(), 1.44);
    }
}
