//! Nullable variable-width length prefix.
//!
//! ```text
//! 0b01xx_xxxx (single byte, bit 6 set)   null
//! 0b00LL_LLLL                            length < 64
//! 1LLL_LLLL [1LLL_LLLL ...] 0LLL_LLLL    7 bits per byte, high groups first
//! ```
//!
//! A multi-byte prefix spans 2 to 4 bytes, so the largest length is
//! 2^28 - 1. The null state is distinct from length zero.

use crate::error::{constants, ProtocolError, Result};
use crate::serialization::reader::ByteReader;
use bytes::{BufMut, BytesMut};

/// Largest length the prefix can carry
pub const MAX_LENGTH: usize = (1 << 28) - 1;

/// The single-byte null marker
pub const NULL_MARKER: u8 = 0x40;

const CONTINUATION: u8 = 0x80;
const SINGLE_BYTE_LIMIT: usize = 1 << 6;
const MAX_BYTES: usize = 4;

/// Number of bytes the prefix for `len` occupies. `None` encodes null.
pub fn length_size(len: Option<usize>) -> Result<usize> {
    let Some(len) = len else {
        return Ok(1);
    };
    if len < SINGLE_BYTE_LIMIT {
        Ok(1)
    } else if len < 1 << 14 {
        Ok(2)
    } else if len < 1 << 21 {
        Ok(3)
    } else if len <= MAX_LENGTH {
        Ok(4)
    } else {
        Err(ProtocolError::CapacityExceeded {
            len,
            max: MAX_LENGTH,
        })
    }
}

/// Writes a length prefix. Capacity is checked before anything is written.
pub fn write_length(dst: &mut BytesMut, len: Option<usize>) -> Result<()> {
    let size = length_size(len)?;
    let Some(len) = len else {
        dst.put_u8(NULL_MARKER);
        return Ok(());
    };
    if size == 1 {
        dst.put_u8(len as u8);
        return Ok(());
    }
    for group in (0..size).rev() {
        let bits = ((len >> (7 * group)) & 0x7F) as u8;
        let flag = if group == 0 { 0 } else { CONTINUATION };
        dst.put_u8(bits | flag);
    }
    Ok(())
}

/// Reads a length prefix, returning `None` for the null marker.
pub fn read_length(src: &mut ByteReader<'_>) -> Result<Option<usize>> {
    let first = src.read_u8()?;
    if first & CONTINUATION == 0 {
        if first & NULL_MARKER != 0 {
            return Ok(None);
        }
        return Ok(Some(first as usize));
    }

    let mut len = (first & 0x7F) as usize;
    for _ in 1..MAX_BYTES {
        let byte = src.read_u8()?;
        len = (len << 7) | (byte & 0x7F) as usize;
        if byte & CONTINUATION == 0 {
            return Ok(Some(len));
        }
    }
    Err(ProtocolError::Malformed(format!(
        "length prefix longer than {MAX_BYTES} bytes"
    )))
}

/// Reads a length prefix in a position where null is not meaningful.
pub fn read_required_length(src: &mut ByteReader<'_>) -> Result<usize> {
    read_length(src)?.ok_or_else(|| ProtocolError::malformed(constants::ERR_NULL_NOT_ALLOWED))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(len: Option<usize>) -> Vec<u8> {
        let mut dst = BytesMut::new();
        write_length(&mut dst, len).unwrap();
        dst.to_vec()
    }

    #[test]
    fn test_width_class_boundaries() {
        let cases = [
            (0usize, 1usize),
            (63, 1),
            (64, 2),
            (127, 2),
            (128, 2),
            (255, 2),
            (256, 2),
            (16383, 2),
            (16384, 3),
            (65535, 3),
            (65536, 3),
            (2_097_151, 3),
            (2_097_152, 4),
            (MAX_LENGTH, 4),
        ];
        for (len, size) in cases {
            assert_eq!(length_size(Some(len)).unwrap(), size, "len {len}");
            let bytes = encode(Some(len));
            assert_eq!(bytes.len(), size, "len {len}");
            let decoded = read_length(&mut ByteReader::new(&bytes)).unwrap();
            assert_eq!(decoded, Some(len));
        }
    }

    #[test]
    fn test_null_differs_from_zero() {
        assert_eq!(encode(None), vec![NULL_MARKER]);
        assert_eq!(encode(Some(0)), vec![0x00]);
        assert_eq!(read_length(&mut ByteReader::new(&[NULL_MARKER])).unwrap(), None);
        assert_eq!(read_length(&mut ByteReader::new(&[0x00])).unwrap(), Some(0));
    }

    #[test]
    fn test_exact_bytes() {
        assert_eq!(encode(Some(64)), vec![0x80, 0x40]);
        assert_eq!(encode(Some(300)), vec![0x82, 0x2C]);
        assert_eq!(encode(Some(16384)), vec![0x81, 0x80, 0x00]);
        assert_eq!(encode(Some(MAX_LENGTH)), vec![0xFF, 0xFF, 0xFF, 0x7F]);
    }

    #[test]
    fn test_capacity_ceiling_writes_nothing() {
        let mut dst = BytesMut::new();
        assert!(write_length(&mut dst, Some(MAX_LENGTH)).is_ok());
        dst.clear();
        let err = write_length(&mut dst, Some(MAX_LENGTH + 1)).unwrap_err();
        assert!(matches!(err, ProtocolError::CapacityExceeded { .. }));
        assert!(dst.is_empty());
    }

    #[test]
    fn test_overlong_prefix_rejected() {
        let bytes = [0xFF, 0xFF, 0xFF, 0xFF, 0x01];
        assert!(read_length(&mut ByteReader::new(&bytes)).is_err());
    }

    #[test]
    fn test_truncated_prefix_rejected() {
        assert!(read_length(&mut ByteReader::new(&[0x81])).is_err());
    }
}
