//! # Compact Codec
//!
//! Custom binary format with a private one-byte type code per shape.
//!
//! ## Wire Format
//! ```text
//! value    := [code(1)] payload            code 0 (null) has no payload
//! string   := len* utf8                    len* = nullable varint (see `varint`)
//! array    := len* [elem code(1)] payload{len}
//! list     := len* value{len}
//! map      := len* section(keys) section(values)
//! section  := [elem code(1)] payload{len}  (fixed layout)
//!           | value{len}                   (dynamic layout)
//! ```
//!
//! Numbers are fixed width, big-endian. Chars are written as UTF-8.
//! Containers whose items share one kind store the type code once, so a
//! `Vec<u32>` costs 4 bytes per item instead of 5.

mod collection;
mod formatter;
pub mod varint;

use crate::error::{ProtocolError, Result};
use crate::serialization::converter::{BinaryConverter, CodecKind};
use crate::serialization::reader::ByteReader;
use crate::serialization::value::{Value, ValueKind};
use bytes::{BufMut, BytesMut};
use formatter::{by_code, by_kind};

const CODEC_NAME: &str = "Compact";

/// Type codes private to the compact codec.
pub mod codes {
    pub const NULL: u8 = 0;
    pub const BOOL: u8 = 1;
    pub const CHAR: u8 = 2;
    pub const I8: u8 = 3;
    pub const U8: u8 = 4;
    pub const I16: u8 = 5;
    pub const U16: u8 = 6;
    pub const I32: u8 = 7;
    pub const U32: u8 = 8;
    pub const I64: u8 = 9;
    pub const U64: u8 = 10;
    pub const F32: u8 = 11;
    pub const F64: u8 = 12;
    pub const DECIMAL: u8 = 13;
    pub const TIMESTAMP: u8 = 14;
    pub const STRING: u8 = 15;
    pub const BYTES: u8 = 16;
    pub const ARRAY: u8 = 17;
    pub const LIST: u8 = 18;
    pub const MAP_FIXED_FIXED: u8 = 19;
    pub const MAP_FIXED_DYNAMIC: u8 = 20;
    pub const MAP_DYNAMIC_FIXED: u8 = 21;
    pub const MAP_DYNAMIC_DYNAMIC: u8 = 22;
}

/// The compact binary converter.
#[derive(Debug, Default, Clone, Copy)]
pub struct CompactConverter;

impl BinaryConverter for CompactConverter {
    fn kind(&self) -> CodecKind {
        CodecKind::Compact
    }

    fn encoded_len(&self, value: &Value) -> Result<usize> {
        value_len(value)
    }

    fn encode(&self, value: &Value, dst: &mut BytesMut) -> Result<()> {
        let start = dst.len();
        write_value(value, dst).inspect_err(|_| dst.truncate(start))
    }

    fn decode(&self, src: &mut ByteReader<'_>) -> Result<Value> {
        read_value(src)
    }
}

fn unsupported(kind: ValueKind) -> ProtocolError {
    ProtocolError::UnsupportedType {
        codec: CODEC_NAME,
        kind: kind.name().to_string(),
    }
}

/// Size of a type-coded value: its code byte plus its payload.
fn value_len(value: &Value) -> Result<usize> {
    if value.is_null() {
        return Ok(1);
    }
    let kind = value.kind();
    let formatter = by_kind(kind).ok_or_else(|| unsupported(kind))?;
    Ok(1 + formatter.payload_len(value)?)
}

fn write_value(value: &Value, dst: &mut BytesMut) -> Result<()> {
    if value.is_null() {
        dst.put_u8(codes::NULL);
        return Ok(());
    }
    let kind = value.kind();
    let formatter = by_kind(kind).ok_or_else(|| unsupported(kind))?;
    dst.put_u8(formatter.type_code());
    formatter.write_payload(value, dst)
}

fn read_value(src: &mut ByteReader<'_>) -> Result<Value> {
    let code = src.read_u8()?;
    if code == codes::NULL {
        return Ok(Value::Null);
    }
    let formatter = by_code(code).ok_or(ProtocolError::UnknownTypeCode {
        codec: CODEC_NAME,
        code,
    })?;
    formatter.read_payload(src)
}
