//! The pluggable binary converter contract and the codec selector.

use crate::error::{constants, ProtocolError, Result};
use crate::serialization::reader::ByteReader;
use crate::serialization::value::Value;
use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Codec selector carried in the low three bits of header byte 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum CodecKind {
    /// Custom compact format (default)
    #[default]
    Compact = 0,
    /// MessagePack-compatible format
    #[serde(rename = "msgpack")]
    MessagePack = 1,
}

impl CodecKind {
    pub const ALL: [CodecKind; 2] = [CodecKind::Compact, CodecKind::MessagePack];

    /// The 3-bit selector value written into the header
    pub fn bits(self) -> u8 {
        self as u8
    }

    /// Recovers a selector from its header bits
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(CodecKind::Compact),
            1 => Some(CodecKind::MessagePack),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CodecKind::Compact => "Compact",
            CodecKind::MessagePack => "MessagePack",
        }
    }
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Serializes a [`Value`] graph to bytes and back.
///
/// `encoded_len` must return exactly the number of bytes `encode` appends
/// for the same value. It also performs every validation `encode` needs, so
/// a value that passes `encoded_len` never fails half-way through `encode`.
pub trait BinaryConverter: fmt::Debug + Send + Sync {
    fn kind(&self) -> CodecKind;

    fn encoded_len(&self, value: &Value) -> Result<usize>;

    /// Appends `value` to `dst`. On error `dst` is truncated back to the
    /// length it had on entry.
    fn encode(&self, value: &Value, dst: &mut BytesMut) -> Result<()>;

    fn decode(&self, src: &mut ByteReader<'_>) -> Result<Value>;

    /// Sizes a buffer with `encoded_len`, then encodes into it.
    fn serialize(&self, value: &Value) -> Result<Bytes> {
        let len = self.encoded_len(value)?;
        let mut dst = BytesMut::with_capacity(len);
        self.encode(value, &mut dst)?;
        debug_assert_eq!(dst.len(), len, "{} length/encode mismatch", self.kind());
        Ok(dst.freeze())
    }

    /// Decodes exactly one value; trailing bytes are an error.
    fn deserialize(&self, data: &[u8]) -> Result<Value> {
        let mut src = ByteReader::new(data);
        let value = self.decode(&mut src)?;
        if !src.is_empty() {
            return Err(ProtocolError::malformed(constants::ERR_TRAILING_BYTES));
        }
        Ok(value)
    }
}
