//! Bounds-checked big-endian reader shared by every decoder.
//!
//! `bytes::Buf` panics on underflow; decoding untrusted frames must not, so
//! each read here returns `Malformed` instead.

use crate::error::{constants, ProtocolError, Result};

/// Maximum container nesting accepted while decoding
pub const MAX_DEPTH: usize = 64;

#[derive(Debug)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
    depth: usize,
}

macro_rules! read_be {
    ($($name:ident => $ty:ty),* $(,)?) => {
        $(
            #[inline]
            pub fn $name(&mut self) -> Result<$ty> {
                Ok(<$ty>::from_be_bytes(self.read_array()?))
            }
        )*
    };
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            depth: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn peek_u8(&self) -> Result<u8> {
        self.buf
            .get(self.pos)
            .copied()
            .ok_or_else(|| ProtocolError::malformed(constants::ERR_UNEXPECTED_EOF))
    }

    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        let byte = self.peek_u8()?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(ProtocolError::malformed(constants::ERR_UNEXPECTED_EOF));
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    read_be!(
        read_u16 => u16,
        read_u32 => u32,
        read_u64 => u64,
        read_i16 => i16,
        read_i32 => i32,
        read_i64 => i64,
        read_f32 => f32,
        read_f64 => f64,
    );

    /// Reads `len` bytes as UTF-8 text.
    pub fn read_str(&mut self, len: usize) -> Result<&'a str> {
        std::str::from_utf8(self.read_bytes(len)?)
            .map_err(|_| ProtocolError::malformed(constants::ERR_INVALID_UTF8))
    }

    /// Enters a nested container, failing past [`MAX_DEPTH`].
    pub fn enter(&mut self) -> Result<()> {
        if self.depth >= MAX_DEPTH {
            return Err(ProtocolError::Malformed(format!(
                "nesting deeper than {MAX_DEPTH}"
            )));
        }
        self.depth += 1;
        Ok(())
    }

    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Capacity hint for `count` items that is never larger than the input.
    pub fn capacity_hint(&self, count: usize) -> usize {
        count.min(self.remaining())
    }
}
