//! # MessagePack-Compatible Codec
//!
//! Implements the standard MessagePack type-code space, choosing the
//! smallest code able to hold each value. Signedness comes from the static
//! width of the value (`Value::I32` vs `Value::U32`), never from its sign.
//!
//! Decoding yields the narrowest Rust type of the code that was read:
//! positive fixint and uint8 become `U8`, negative fixint and int8 become
//! `I8`, arrays become `List`, maps become dynamic/dynamic `Map`s.
//!
//! `Char`, `Decimal` and `Timestamp` have no MessagePack representation in
//! this numbering and fail to encode.

mod decode;
mod encode;

use crate::error::Result;
use crate::serialization::converter::{BinaryConverter, CodecKind};
use crate::serialization::reader::ByteReader;
use crate::serialization::value::Value;
use bytes::BytesMut;

const CODEC_NAME: &str = "MessagePack";

/// MessagePack type codes.
pub mod codes {
    pub const POSITIVE_FIXINT_MAX: u8 = 0x7f;
    pub const FIXMAP: u8 = 0x80;
    pub const FIXARRAY: u8 = 0x90;
    pub const FIXSTR: u8 = 0xa0;
    pub const NIL: u8 = 0xc0;
    pub const NEVER_USED: u8 = 0xc1;
    pub const FALSE: u8 = 0xc2;
    pub const TRUE: u8 = 0xc3;
    pub const BIN8: u8 = 0xc4;
    pub const BIN16: u8 = 0xc5;
    pub const BIN32: u8 = 0xc6;
    pub const EXT8: u8 = 0xc7;
    pub const EXT16: u8 = 0xc8;
    pub const EXT32: u8 = 0xc9;
    pub const FLOAT32: u8 = 0xca;
    pub const FLOAT64: u8 = 0xcb;
    pub const UINT8: u8 = 0xcc;
    pub const UINT16: u8 = 0xcd;
    pub const UINT32: u8 = 0xce;
    pub const UINT64: u8 = 0xcf;
    pub const INT8: u8 = 0xd0;
    pub const INT16: u8 = 0xd1;
    pub const INT32: u8 = 0xd2;
    pub const INT64: u8 = 0xd3;
    pub const FIXEXT1: u8 = 0xd4;
    pub const FIXEXT2: u8 = 0xd5;
    pub const FIXEXT4: u8 = 0xd6;
    pub const FIXEXT8: u8 = 0xd7;
    pub const FIXEXT16: u8 = 0xd8;
    pub const STR8: u8 = 0xd9;
    pub const STR16: u8 = 0xda;
    pub const STR32: u8 = 0xdb;
    pub const ARRAY16: u8 = 0xdc;
    pub const ARRAY32: u8 = 0xdd;
    pub const MAP16: u8 = 0xde;
    pub const MAP32: u8 = 0xdf;
    pub const NEGATIVE_FIXINT_MIN: u8 = 0xe0;

    /// Largest count a fixarray/fixmap header holds
    pub const FIX_CONTAINER_MAX: usize = 15;
    /// Largest byte length a fixstr header holds
    pub const FIXSTR_MAX: usize = 31;
}

/// The MessagePack-compatible binary converter.
#[derive(Debug, Default, Clone, Copy)]
pub struct MessagePackConverter;

impl BinaryConverter for MessagePackConverter {
    fn kind(&self) -> CodecKind {
        CodecKind::MessagePack
    }

    fn encoded_len(&self, value: &Value) -> Result<usize> {
        encode::value_len(value)
    }

    fn encode(&self, value: &Value, dst: &mut BytesMut) -> Result<()> {
        let start = dst.len();
        encode::write_value(value, dst).inspect_err(|_| dst.truncate(start))
    }

    fn decode(&self, src: &mut ByteReader<'_>) -> Result<Value> {
        decode::read_value(src)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProtocolError;
    use crate::serialization::value::{Array, Layout, Map, ValueKind};

    fn bytes(value: &Value) -> Vec<u8> {
        let out = MessagePackConverter.serialize(value).unwrap();
        assert_eq!(out.len(), MessagePackConverter.encoded_len(value).unwrap());
        out.to_vec()
    }

    #[test]
    fn test_unsigned_minimal_width() {
        assert_eq!(bytes(&Value::U32(127)), vec![0x7f]);
        assert_eq!(bytes(&Value::U32(128)), vec![codes::UINT8, 0x80]);
        assert_eq!(bytes(&Value::U64(255)), vec![codes::UINT8, 0xff]);
        assert_eq!(bytes(&Value::U16(256)), vec![codes::UINT16, 0x01, 0x00]);
        assert_eq!(bytes(&Value::U32(65535)), vec![codes::UINT16, 0xff, 0xff]);
        assert_eq!(
            bytes(&Value::U32(65536)),
            vec![codes::UINT32, 0x00, 0x01, 0x00, 0x00]
        );
        assert_eq!(bytes(&Value::U64(u64::MAX)).len(), 9);
    }

    #[test]
    fn test_signed_minimal_width() {
        assert_eq!(bytes(&Value::I32(0)), vec![0x00]);
        assert_eq!(bytes(&Value::I32(127)), vec![0x7f]);
        assert_eq!(bytes(&Value::I32(-1)), vec![0xff]);
        assert_eq!(bytes(&Value::I32(-32)), vec![0xe0]);
        assert_eq!(bytes(&Value::I32(-33)), vec![codes::INT8, 0xdf]);
        // signed static type keeps the signed family above the fixint range
        assert_eq!(bytes(&Value::I32(128)), vec![codes::INT16, 0x00, 0x80]);
        assert_eq!(bytes(&Value::I64(-129)), vec![codes::INT16, 0xff, 0x7f]);
        assert_eq!(
            bytes(&Value::I64(i64::from(i32::MIN))),
            vec![codes::INT32, 0x80, 0x00, 0x00, 0x00]
        );
        assert_eq!(bytes(&Value::I64(i64::MIN)).len(), 9);
    }

    #[test]
    fn test_floats_keep_static_width() {
        assert_eq!(bytes(&Value::F32(1.0)).len(), 5);
        assert_eq!(bytes(&Value::F64(1.0)).len(), 9);
        assert_eq!(bytes(&Value::F32(1.5))[0], codes::FLOAT32);
    }

    #[test]
    fn test_string_header_thresholds() {
        let cases = [(0usize, 1usize), (31, 1), (32, 2), (255, 2), (256, 3), (65535, 3), (65536, 5)];
        for (len, header) in cases {
            let value = Value::String("a".repeat(len));
            assert_eq!(bytes(&value).len(), header + len, "len {len}");
        }
    }

    #[test]
    fn test_container_header_thresholds() {
        for (count, header) in [(0usize, 1usize), (15, 1), (16, 3), (65535, 3), (65536, 5)] {
            let list = Value::List(vec![Value::Null; count]);
            assert_eq!(bytes(&list).len(), header + count, "count {count}");
        }
    }

    #[test]
    fn test_ext_forms() {
        assert_eq!(bytes(&Value::Ext(5, vec![9]))[..2], [codes::FIXEXT1, 5]);
        assert_eq!(bytes(&Value::Ext(5, vec![0; 2]))[0], codes::FIXEXT2);
        assert_eq!(bytes(&Value::Ext(5, vec![0; 4]))[0], codes::FIXEXT4);
        assert_eq!(bytes(&Value::Ext(5, vec![0; 8]))[0], codes::FIXEXT8);
        // no fixed form exists for 3 bytes
        assert_eq!(bytes(&Value::Ext(5, vec![1, 2, 3])), vec![codes::EXT8, 3, 5, 1, 2, 3]);
        assert_eq!(bytes(&Value::Ext(-1, vec![0; 300]))[..4], [codes::EXT16, 0x01, 0x2c, 0xff]);
    }

    #[test]
    fn test_roundtrip_canonical_values() {
        let values = vec![
            Value::Null,
            Value::Bool(false),
            Value::U8(200),
            Value::I8(-100),
            Value::U16(40_000),
            Value::I16(-30_000),
            Value::U32(4_000_000_000),
            Value::I32(-2_000_000_000),
            Value::U64(u64::MAX),
            Value::I64(i64::MIN),
            Value::F32(0.25),
            Value::F64(-3.5),
            Value::from("hello"),
            Value::Bytes(vec![1, 2, 3]),
            Value::Ext(42, vec![1, 2, 3, 4, 5]),
            Value::List(vec![Value::U8(1), Value::Null, Value::from("x")]),
            Value::Map(Map::dynamic(vec![(Value::from("k"), Value::Bool(true))])),
        ];
        for value in values {
            let encoded = bytes(&value);
            assert_eq!(MessagePackConverter.deserialize(&encoded).unwrap(), value);
        }
    }

    #[test]
    fn test_typed_containers_decode_as_dynamic() {
        let array = Array::of(ValueKind::U8, [1u8, 2]).unwrap();
        let decoded = MessagePackConverter
            .deserialize(&bytes(&Value::Array(array)))
            .unwrap();
        assert_eq!(decoded, Value::List(vec![Value::U8(1), Value::U8(2)]));

        let map = Map::new(
            Layout::Fixed(ValueKind::String),
            Layout::Dynamic,
            vec![("a".into(), Value::U8(1))],
        )
        .unwrap();
        let decoded = MessagePackConverter
            .deserialize(&bytes(&Value::Map(map)))
            .unwrap();
        assert_eq!(
            decoded,
            Value::Map(Map::dynamic(vec![("a".into(), Value::U8(1))]))
        );
    }

    #[test]
    fn test_unsupported_shapes() {
        for value in [
            Value::Char('x'),
            Value::Timestamp(1),
            Value::Decimal("1.0".to_string()),
        ] {
            assert!(matches!(
                MessagePackConverter.encoded_len(&value),
                Err(ProtocolError::UnsupportedType { .. })
            ));
        }
    }

    #[test]
    fn test_reserved_code_rejected() {
        assert!(matches!(
            MessagePackConverter.deserialize(&[codes::NEVER_USED]),
            Err(ProtocolError::UnknownTypeCode { .. })
        ));
    }

    #[test]
    fn test_decodes_foreign_fixext16_and_str8() {
        let mut data = vec![codes::FIXEXT16, 7];
        data.extend_from_slice(&[0xAA; 16]);
        assert_eq!(
            MessagePackConverter.deserialize(&data).unwrap(),
            Value::Ext(7, vec![0xAA; 16])
        );
        assert_eq!(
            MessagePackConverter
                .deserialize(&[codes::STR8, 2, b'o', b'k'])
                .unwrap(),
            Value::from("ok")
        );
    }
}
