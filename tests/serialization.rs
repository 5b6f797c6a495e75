//! Integration tests for the two binary converters
//!
//! Exercises realistic value graphs end to end through the public API and
//! pins the byte layouts peers depend on.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use rpc_wire::serialization::compact::codes as compact;
use rpc_wire::serialization::msgpack::codes as msgpack;
use rpc_wire::serialization::{
    Array, BinaryConverter, CodecKind, CompactConverter, Layout, Map, MessagePackConverter,
    Parameters, Value, ValueKind,
};

fn inventory() -> Value {
    let slots = Array::of(ValueKind::U16, [101u16, 102, 0, 7]).unwrap();
    let tags = Array::of(ValueKind::String, [Some("rare"), None, Some("bound")]).unwrap();
    let stats = Map::new(
        Layout::Fixed(ValueKind::String),
        Layout::Fixed(ValueKind::I32),
        vec![
            (Value::from("str"), Value::I32(14)),
            (Value::from("dex"), Value::I32(-2)),
        ],
    )
    .unwrap();
    let by_id = Map::new(
        Layout::Fixed(ValueKind::U32),
        Layout::Dynamic,
        vec![
            (Value::U32(1), Value::from("sword")),
            (Value::U32(2), Value::Null),
            (Value::U32(3), Value::List(vec![Value::Bool(false), Value::F32(0.5)])),
        ],
    )
    .unwrap();
    let mixed_keys = Map::new(
        Layout::Dynamic,
        Layout::Fixed(ValueKind::Bool),
        vec![(Value::U8(1), Value::Bool(true)), (Value::from("two"), Value::Bool(false))],
    )
    .unwrap();

    Value::List(vec![
        Value::Array(slots),
        Value::Array(tags),
        Value::Map(stats),
        Value::Map(by_id),
        Value::Map(mixed_keys),
        Value::Char('é'),
        Value::decimal("-1024.75").unwrap(),
        Value::Timestamp(638_000_000_000_000_000),
        Value::Bytes(vec![0xDE, 0xAD, 0xBE, 0xEF]),
        Value::Null,
    ])
}

#[test]
fn test_compact_inventory_roundtrip() {
    let value = inventory();
    let bytes = CompactConverter.serialize(&value).unwrap();
    assert_eq!(bytes.len(), CompactConverter.encoded_len(&value).unwrap());
    assert_eq!(CompactConverter.deserialize(&bytes).unwrap(), value);
}

#[test]
fn test_compact_map_variants_use_distinct_codes() {
    let layouts = [
        (Layout::Fixed(ValueKind::String), Layout::Fixed(ValueKind::U8), compact::MAP_FIXED_FIXED),
        (Layout::Fixed(ValueKind::String), Layout::Dynamic, compact::MAP_FIXED_DYNAMIC),
        (Layout::Dynamic, Layout::Fixed(ValueKind::U8), compact::MAP_DYNAMIC_FIXED),
        (Layout::Dynamic, Layout::Dynamic, compact::MAP_DYNAMIC_DYNAMIC),
    ];
    for (keys, values, code) in layouts {
        let map = Map::new(keys, values, vec![(Value::from("k"), Value::U8(9))]).unwrap();
        let bytes = CompactConverter.serialize(&Value::Map(map)).unwrap();
        assert_eq!(bytes[0], code);
    }
}

#[test]
fn test_compact_map_layout_bytes() {
    let map = Map::new(
        Layout::Fixed(ValueKind::String),
        Layout::Fixed(ValueKind::U8),
        vec![(Value::from("a"), Value::U8(1)), (Value::from("b"), Value::U8(2))],
    )
    .unwrap();
    let bytes = CompactConverter.serialize(&Value::Map(map)).unwrap();
    // one count, then key section and value section without their own counts
    assert_eq!(
        bytes.to_vec(),
        vec![
            compact::MAP_FIXED_FIXED,
            2,
            compact::STRING,
            1,
            b'a',
            1,
            b'b',
            compact::U8,
            1,
            2
        ]
    );
}

#[test]
fn test_compact_homogeneous_array_is_smaller() {
    let numbers: Vec<u32> = (0..100).collect();
    let array = Value::Array(Array::of(ValueKind::U32, numbers.clone()).unwrap());
    let list = Value::List(numbers.into_iter().map(Value::U32).collect());

    let array_len = CompactConverter.encoded_len(&array).unwrap();
    let list_len = CompactConverter.encoded_len(&list).unwrap();
    assert_eq!(list_len - array_len, 100 - 1);
}

#[test]
fn test_msgpack_document() {
    let mut params = Parameters::new();
    params.insert("id".into(), Value::U8(200));
    params.insert("offset".into(), Value::I8(-40));
    params.insert("name".into(), Value::from("knight"));
    params.insert("scores".into(), Value::List(vec![Value::F64(1.5), Value::Null]));
    let value = Value::Map(Map::from_parameters(&params));

    let bytes = MessagePackConverter.serialize(&value).unwrap();
    assert_eq!(bytes[0], msgpack::FIXMAP | 4);

    let decoded = MessagePackConverter.deserialize(&bytes).unwrap();
    let Value::Map(map) = decoded else {
        panic!("expected a map");
    };
    assert_eq!(map.into_parameters().unwrap(), params);
}

#[test]
fn test_msgpack_known_encodings() {
    let cases: Vec<(Value, Vec<u8>)> = vec![
        (Value::U32(127), vec![0x7f]),
        (Value::U32(128), vec![msgpack::UINT8, 0x80]),
        (Value::I32(-32), vec![0xe0]),
        (Value::I32(-33), vec![msgpack::INT8, 0xdf]),
        (Value::U16(256), vec![msgpack::UINT16, 0x01, 0x00]),
        (Value::F32(1.0), vec![msgpack::FLOAT32, 0x3f, 0x80, 0x00, 0x00]),
        (Value::Bool(true), vec![msgpack::TRUE]),
        (Value::from("hi"), vec![0xa2, b'h', b'i']),
        (Value::Bytes(vec![1]), vec![msgpack::BIN8, 1, 1]),
        (Value::Ext(-1, vec![0xAA]), vec![msgpack::FIXEXT1, 0xff, 0xAA]),
    ];
    for (value, expected) in cases {
        assert_eq!(MessagePackConverter.serialize(&value).unwrap().to_vec(), expected, "{value:?}");
    }
}

#[test]
fn test_msgpack_homogeneous_array_becomes_list() {
    let array = Value::Array(Array::of(ValueKind::U16, [1u16, 2, 300]).unwrap());
    let bytes = MessagePackConverter.serialize(&array).unwrap();
    assert_eq!(
        MessagePackConverter.deserialize(&bytes).unwrap(),
        Value::List(vec![Value::U8(1), Value::U8(2), Value::U16(300)])
    );
}

#[test]
fn test_codecs_are_not_wire_compatible() {
    let value = Value::List(vec![Value::from("abc"), Value::U32(70_000)]);
    let compact_bytes = CompactConverter.serialize(&value).unwrap();
    let msgpack_bytes = MessagePackConverter.serialize(&value).unwrap();
    assert_ne!(compact_bytes, msgpack_bytes);
    assert_ne!(MessagePackConverter.deserialize(&compact_bytes).ok(), Some(value.clone()));
    assert_ne!(CompactConverter.deserialize(&msgpack_bytes).ok(), Some(value));
}

#[test]
fn test_converter_kinds() {
    assert_eq!(CompactConverter.kind(), CodecKind::Compact);
    assert_eq!(MessagePackConverter.kind(), CodecKind::MessagePack);
    for kind in CodecKind::ALL {
        assert_eq!(CodecKind::from_bits(kind.bits()), Some(kind));
    }
}
