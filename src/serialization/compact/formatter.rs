//! Per-kind formatters and the registry that dispatches to them.
//!
//! A formatter owns one type code and knows how to size, write and read the
//! *payload* of its kind; the type code itself is written by the caller, so
//! homogeneous containers can write it once for all items.

use super::codes;
use super::collection::{ArrayFormatter, ListFormatter, MapFormatter};
use super::varint::{length_size, read_length, write_length};
use crate::error::{constants, ProtocolError, Result};
use crate::serialization::reader::ByteReader;
use crate::serialization::value::{is_valid_decimal, Value, ValueKind};
use bytes::{BufMut, BytesMut};

pub(crate) trait Formatter: Sync {
    fn type_code(&self) -> u8;

    fn kind(&self) -> ValueKind;

    fn payload_len(&self, value: &Value) -> Result<usize>;

    fn write_payload(&self, value: &Value, dst: &mut BytesMut) -> Result<()>;

    fn read_payload(&self, src: &mut ByteReader<'_>) -> Result<Value>;
}

/// Error for a value routed to a formatter of another kind.
pub(crate) fn mismatch(expected: ValueKind, value: &Value) -> ProtocolError {
    ProtocolError::InvalidValue(format!(
        "expected {expected}, got {}",
        value.kind()
    ))
}

/// Indexed by `type_code - 1`; `codes::NULL` has no formatter.
static REGISTRY: [&dyn Formatter; 22] = [
    &BoolFormatter,
    &CharFormatter,
    &I8Formatter,
    &U8Formatter,
    &I16Formatter,
    &U16Formatter,
    &I32Formatter,
    &U32Formatter,
    &I64Formatter,
    &U64Formatter,
    &F32Formatter,
    &F64Formatter,
    &TextFormatter::DECIMAL,
    &TimestampFormatter,
    &TextFormatter::STRING,
    &BytesFormatter,
    &ArrayFormatter,
    &ListFormatter,
    &MapFormatter::new(codes::MAP_FIXED_FIXED, true, true),
    &MapFormatter::new(codes::MAP_FIXED_DYNAMIC, true, false),
    &MapFormatter::new(codes::MAP_DYNAMIC_FIXED, false, true),
    &MapFormatter::new(codes::MAP_DYNAMIC_DYNAMIC, false, false),
];

/// Type code for a runtime kind, `None` when the codec cannot carry it.
pub(crate) fn type_code(kind: ValueKind) -> Option<u8> {
    let code = match kind {
        ValueKind::Bool => codes::BOOL,
        ValueKind::Char => codes::CHAR,
        ValueKind::I8 => codes::I8,
        ValueKind::U8 => codes::U8,
        ValueKind::I16 => codes::I16,
        ValueKind::U16 => codes::U16,
        ValueKind::I32 => codes::I32,
        ValueKind::U32 => codes::U32,
        ValueKind::I64 => codes::I64,
        ValueKind::U64 => codes::U64,
        ValueKind::F32 => codes::F32,
        ValueKind::F64 => codes::F64,
        ValueKind::Decimal => codes::DECIMAL,
        ValueKind::Timestamp => codes::TIMESTAMP,
        ValueKind::String => codes::STRING,
        ValueKind::Bytes => codes::BYTES,
        ValueKind::Array => codes::ARRAY,
        ValueKind::List => codes::LIST,
        ValueKind::Map {
            fixed_keys,
            fixed_values,
        } => match (fixed_keys, fixed_values) {
            (true, true) => codes::MAP_FIXED_FIXED,
            (true, false) => codes::MAP_FIXED_DYNAMIC,
            (false, true) => codes::MAP_DYNAMIC_FIXED,
            (false, false) => codes::MAP_DYNAMIC_DYNAMIC,
        },
        ValueKind::Null | ValueKind::Ext => return None,
    };
    Some(code)
}

pub(crate) fn by_code(code: u8) -> Option<&'static dyn Formatter> {
    let index = code.checked_sub(1)?;
    REGISTRY.get(index as usize).copied()
}

pub(crate) fn by_kind(kind: ValueKind) -> Option<&'static dyn Formatter> {
    type_code(kind).and_then(by_code)
}

macro_rules! fixed_width_formatter {
    ($name:ident, $variant:ident, $code:path, $width:expr, $read:ident) => {
        pub(crate) struct $name;

        impl Formatter for $name {
            fn type_code(&self) -> u8 {
                $code
            }

            fn kind(&self) -> ValueKind {
                ValueKind::$variant
            }

            fn payload_len(&self, value: &Value) -> Result<usize> {
                match value {
                    Value::$variant(_) => Ok($width),
                    other => Err(mismatch(ValueKind::$variant, other)),
                }
            }

            fn write_payload(&self, value: &Value, dst: &mut BytesMut) -> Result<()> {
                match value {
                    Value::$variant(v) => {
                        dst.put_slice(&v.to_be_bytes());
                        Ok(())
                    }
                    other => Err(mismatch(ValueKind::$variant, other)),
                }
            }

            fn read_payload(&self, src: &mut ByteReader<'_>) -> Result<Value> {
                Ok(Value::$variant(src.$read()?))
            }
        }
    };
}

fixed_width_formatter!(I8Formatter, I8, codes::I8, 1, read_i8);
fixed_width_formatter!(U8Formatter, U8, codes::U8, 1, read_u8);
fixed_width_formatter!(I16Formatter, I16, codes::I16, 2, read_i16);
fixed_width_formatter!(U16Formatter, U16, codes::U16, 2, read_u16);
fixed_width_formatter!(I32Formatter, I32, codes::I32, 4, read_i32);
fixed_width_formatter!(U32Formatter, U32, codes::U32, 4, read_u32);
fixed_width_formatter!(I64Formatter, I64, codes::I64, 8, read_i64);
fixed_width_formatter!(U64Formatter, U64, codes::U64, 8, read_u64);
fixed_width_formatter!(F32Formatter, F32, codes::F32, 4, read_f32);
fixed_width_formatter!(F64Formatter, F64, codes::F64, 8, read_f64);
fixed_width_formatter!(TimestampFormatter, Timestamp, codes::TIMESTAMP, 8, read_i64);

pub(crate) struct BoolFormatter;

impl Formatter for BoolFormatter {
    fn type_code(&self) -> u8 {
        codes::BOOL
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Bool
    }

    fn payload_len(&self, value: &Value) -> Result<usize> {
        match value {
            Value::Bool(_) => Ok(1),
            other => Err(mismatch(ValueKind::Bool, other)),
        }
    }

    fn write_payload(&self, value: &Value, dst: &mut BytesMut) -> Result<()> {
        match value {
            Value::Bool(v) => {
                dst.put_u8(u8::from(*v));
                Ok(())
            }
            other => Err(mismatch(ValueKind::Bool, other)),
        }
    }

    fn read_payload(&self, src: &mut ByteReader<'_>) -> Result<Value> {
        match src.read_u8()? {
            0 => Ok(Value::Bool(false)),
            1 => Ok(Value::Bool(true)),
            other => Err(ProtocolError::Malformed(format!(
                "invalid bool byte 0x{other:02x}"
            ))),
        }
    }
}

/// Chars travel as their UTF-8 encoding; the lead byte gives the width.
pub(crate) struct CharFormatter;

fn utf8_width(lead: u8) -> Option<usize> {
    match lead.leading_ones() {
        0 => Some(1),
        2 => Some(2),
        3 => Some(3),
        4 => Some(4),
        _ => None,
    }
}

impl Formatter for CharFormatter {
    fn type_code(&self) -> u8 {
        codes::CHAR
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Char
    }

    fn payload_len(&self, value: &Value) -> Result<usize> {
        match value {
            Value::Char(c) => Ok(c.len_utf8()),
            other => Err(mismatch(ValueKind::Char, other)),
        }
    }

    fn write_payload(&self, value: &Value, dst: &mut BytesMut) -> Result<()> {
        match value {
            Value::Char(c) => {
                let mut buf = [0u8; 4];
                dst.put_slice(c.encode_utf8(&mut buf).as_bytes());
                Ok(())
            }
            other => Err(mismatch(ValueKind::Char, other)),
        }
    }

    fn read_payload(&self, src: &mut ByteReader<'_>) -> Result<Value> {
        let width = utf8_width(src.peek_u8()?)
            .ok_or_else(|| ProtocolError::malformed(constants::ERR_INVALID_CHAR))?;
        let text = src.read_str(width)?;
        text.chars()
            .next()
            .map(Value::Char)
            .ok_or_else(|| ProtocolError::malformed(constants::ERR_INVALID_CHAR))
    }
}

/// Length-prefixed UTF-8, shared by `String` and `Decimal`.
pub(crate) struct TextFormatter {
    code: u8,
    kind: ValueKind,
}

impl TextFormatter {
    const STRING: TextFormatter = TextFormatter {
        code: codes::STRING,
        kind: ValueKind::String,
    };
    const DECIMAL: TextFormatter = TextFormatter {
        code: codes::DECIMAL,
        kind: ValueKind::Decimal,
    };

    /// `Ok(None)` for a null item inside a homogeneous container.
    fn text<'v>(&self, value: &'v Value) -> Result<Option<&'v str>> {
        match (self.kind, value) {
            (_, Value::Null) => Ok(None),
            (ValueKind::String, Value::String(s)) => Ok(Some(s)),
            (ValueKind::Decimal, Value::Decimal(d)) => {
                if !is_valid_decimal(d) {
                    return Err(ProtocolError::InvalidValue(format!(
                        "not a decimal number: {d:?}"
                    )));
                }
                Ok(Some(d))
            }
            (kind, other) => Err(mismatch(kind, other)),
        }
    }
}

impl Formatter for TextFormatter {
    fn type_code(&self) -> u8 {
        self.code
    }

    fn kind(&self) -> ValueKind {
        self.kind
    }

    fn payload_len(&self, value: &Value) -> Result<usize> {
        let text = self.text(value)?;
        Ok(length_size(text.map(str::len))? + text.map_or(0, str::len))
    }

    fn write_payload(&self, value: &Value, dst: &mut BytesMut) -> Result<()> {
        let text = self.text(value)?;
        write_length(dst, text.map(str::len))?;
        if let Some(text) = text {
            dst.put_slice(text.as_bytes());
        }
        Ok(())
    }

    fn read_payload(&self, src: &mut ByteReader<'_>) -> Result<Value> {
        let Some(len) = read_length(src)? else {
            return Ok(Value::Null);
        };
        let text = src.read_str(len)?.to_string();
        match self.kind {
            ValueKind::Decimal if !is_valid_decimal(&text) => Err(ProtocolError::Malformed(
                format!("not a decimal number: {text:?}"),
            )),
            ValueKind::Decimal => Ok(Value::Decimal(text)),
            _ => Ok(Value::String(text)),
        }
    }
}

pub(crate) struct BytesFormatter;

impl BytesFormatter {
    fn data<'v>(value: &'v Value) -> Result<Option<&'v [u8]>> {
        match value {
            Value::Null => Ok(None),
            Value::Bytes(b) => Ok(Some(b)),
            other => Err(mismatch(ValueKind::Bytes, other)),
        }
    }
}

impl Formatter for BytesFormatter {
    fn type_code(&self) -> u8 {
        codes::BYTES
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Bytes
    }

    fn payload_len(&self, value: &Value) -> Result<usize> {
        let data = Self::data(value)?;
        Ok(length_size(data.map(<[u8]>::len))? + data.map_or(0, <[u8]>::len))
    }

    fn write_payload(&self, value: &Value, dst: &mut BytesMut) -> Result<()> {
        let data = Self::data(value)?;
        write_length(dst, data.map(<[u8]>::len))?;
        if let Some(data) = data {
            dst.put_slice(data);
        }
        Ok(())
    }

    fn read_payload(&self, src: &mut ByteReader<'_>) -> Result<Value> {
        match read_length(src)? {
            None => Ok(Value::Null),
            Some(len) => Ok(Value::Bytes(src.read_bytes(len)?.to_vec())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_index_matches_type_code() {
        for (index, formatter) in REGISTRY.iter().enumerate() {
            assert_eq!(formatter.type_code() as usize, index + 1);
            assert_eq!(type_code(formatter.kind()), Some(formatter.type_code()));
        }
    }

    #[test]
    fn test_unknown_codes_have_no_formatter() {
        assert!(by_code(codes::NULL).is_none());
        assert!(by_code(23).is_none());
        assert!(by_code(0xFF).is_none());
        assert!(by_kind(ValueKind::Ext).is_none());
    }

    #[test]
    fn test_char_widths() {
        for c in ['a', 'é', '€', '🦀'] {
            let value = Value::Char(c);
            let mut dst = BytesMut::new();
            CharFormatter.write_payload(&value, &mut dst).unwrap();
            assert_eq!(dst.len(), CharFormatter.payload_len(&value).unwrap());
            let decoded = CharFormatter
                .read_payload(&mut ByteReader::new(&dst))
                .unwrap();
            assert_eq!(decoded, value);
        }
    }

    #[test]
    fn test_invalid_bool_byte() {
        assert!(BoolFormatter
            .read_payload(&mut ByteReader::new(&[2]))
            .is_err());
    }

    #[test]
    fn test_text_null_payload() {
        let mut dst = BytesMut::new();
        TextFormatter::STRING
            .write_payload(&Value::Null, &mut dst)
            .unwrap();
        assert_eq!(&dst[..], &[super::super::varint::NULL_MARKER]);
    }
}
