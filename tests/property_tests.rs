//! Property-based tests using proptest
//!
//! These tests validate codec and framing invariants across a wide range of
//! randomly generated inputs.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use bytes::BytesMut;
use proptest::prelude::*;
use rpc_wire::core::{Header, OperationKind, SendFlags, MAX_PAYLOAD_LEN};
use rpc_wire::protocol::{EventModel, OperationModel, RequestModel, WireProtocol};
use rpc_wire::serialization::{
    Array, BinaryConverter, CompactConverter, Map, MessagePackConverter, Parameters, Value,
    ValueKind,
};
use rpc_wire::{CodecKind, CryptoKind};

/// Scalars both codecs can represent. Floats stay finite so equality holds.
fn shared_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i8>().prop_map(Value::I8),
        any::<u8>().prop_map(Value::U8),
        any::<i16>().prop_map(Value::I16),
        any::<u16>().prop_map(Value::U16),
        any::<i32>().prop_map(Value::I32),
        any::<u32>().prop_map(Value::U32),
        any::<i64>().prop_map(Value::I64),
        any::<u64>().prop_map(Value::U64),
        (-1.0e6f32..1.0e6).prop_map(Value::F32),
        (-1.0e12f64..1.0e12).prop_map(Value::F64),
        ".{0,40}".prop_map(Value::String),
        prop::collection::vec(any::<u8>(), 0..64).prop_map(Value::Bytes),
    ]
}

fn compact_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        4 => shared_scalar(),
        1 => any::<char>().prop_map(Value::Char),
        1 => any::<i64>().prop_map(Value::Timestamp),
        1 => (any::<i32>(), 0u32..10_000).prop_map(|(i, f)| Value::Decimal(format!("{i}.{f}"))),
        1 => prop::collection::vec(any::<u32>(), 0..20)
            .prop_map(|v| Value::Array(Array::of(ValueKind::U32, v).unwrap())),
        1 => prop::collection::vec(prop::option::of(".{0,8}"), 0..10)
            .prop_map(|v| Value::Array(Array::of(ValueKind::String, v).unwrap())),
    ]
}

fn nested(leaf: impl Strategy<Value = Value> + 'static) -> impl Strategy<Value = Value> {
    leaf.prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..8).prop_map(Value::List),
            prop::collection::vec((".{0,8}", inner), 0..8).prop_map(|entries| {
                Value::Map(Map::dynamic(
                    entries.into_iter().map(|(k, v)| (Value::String(k), v)).collect(),
                ))
            }),
        ]
    })
}

fn parameters() -> impl Strategy<Value = Option<Parameters>> {
    prop::option::of(prop::collection::btree_map("[a-z]{1,8}", nested(compact_scalar()), 0..6))
}

fn encode(codec: &dyn BinaryConverter, value: &Value) -> Vec<u8> {
    let mut dst = BytesMut::new();
    codec.encode(value, &mut dst).unwrap();
    dst.to_vec()
}

// Property: declared length equals emitted bytes, and decode inverts encode
proptest! {
    #[test]
    fn prop_compact_roundtrip(value in nested(compact_scalar())) {
        let bytes = encode(&CompactConverter, &value);
        prop_assert_eq!(bytes.len(), CompactConverter.encoded_len(&value).unwrap());
        prop_assert_eq!(CompactConverter.deserialize(&bytes).unwrap(), value);
    }
}

// Property: MessagePack decodes to equivalent narrowest types, so re-encoding is byte-identical
proptest! {
    #[test]
    fn prop_msgpack_canonical(value in nested(shared_scalar())) {
        let bytes = encode(&MessagePackConverter, &value);
        prop_assert_eq!(bytes.len(), MessagePackConverter.encoded_len(&value).unwrap());

        let decoded = MessagePackConverter.deserialize(&bytes).unwrap();
        prop_assert!(decoded.equivalent(&value));
        prop_assert_eq!(encode(&MessagePackConverter, &decoded), bytes);
    }
}

// Property: header encode/decode is lossless for every field combination
proptest! {
    #[test]
    fn prop_header_roundtrip(
        kind_bits in 0u8..8,
        codec in prop::sample::select(CodecKind::ALL.to_vec()),
        flags in (any::<bool>(), any::<bool>(), any::<bool>()),
        encrypted in any::<bool>(),
        payload_len in 0usize..=MAX_PAYLOAD_LEN,
    ) {
        let kind = OperationKind::from_bits(kind_bits);
        let flags = SendFlags::default()
            .with_unreliable(flags.0)
            .with_immediate(flags.1)
            .with_sync(flags.2);
        let mut header = Header::new(kind, codec, flags);
        if encrypted && kind.carries_flags() {
            header = header.encrypted(CryptoKind::XChaCha20Poly1305).unwrap();
        }
        header.payload_len = payload_len;

        let mut dst = BytesMut::new();
        header.encode(&mut dst).unwrap();
        prop_assert_eq!(dst.len(), header.encoded_len().unwrap());

        let (decoded, used) = Header::decode(&dst).unwrap().unwrap();
        prop_assert_eq!(used, dst.len());
        prop_assert_eq!(decoded, header);
    }
}

// Property: request frames survive write/read/deserialize, encrypted or not
proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]
    #[test]
    fn prop_request_frame_roundtrip(
        code in "[a-z_]{1,32}",
        request_id in any::<u16>(),
        parameters in parameters(),
        encrypt in any::<bool>(),
    ) {
        let wire = WireProtocol::with_defaults();
        let model: OperationModel = RequestModel { operation_code: code, parameters, request_id }.into();
        let key = b"prop key";

        let mut buf = BytesMut::new();
        if encrypt {
            wire.write_encrypted(&mut buf, &model, SendFlags::default(), CodecKind::Compact, CryptoKind::XChaCha20Poly1305, key).unwrap();
        } else {
            wire.write(&mut buf, &model, SendFlags::default(), CodecKind::Compact).unwrap();
        }

        let mut src = &buf[..];
        let frame = wire.try_read(&mut src).unwrap();
        prop_assert!(src.is_empty());
        prop_assert_eq!(frame.header.is_encrypted(), encrypt);
        prop_assert_eq!(wire.try_deserialize_frame(&frame, Some(key)), Some(model));
    }
}

// Property: MessagePack event frames reproduce the same bytes after a decode cycle
proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]
    #[test]
    fn prop_msgpack_event_frame_stable(
        code in "[a-z]{1,16}",
        parameters in prop::option::of(prop::collection::btree_map("[a-z]{1,8}", nested(shared_scalar()), 0..6)),
    ) {
        let wire = WireProtocol::with_defaults();
        let model: OperationModel = EventModel { event_code: code, parameters }.into();

        let mut first = BytesMut::new();
        wire.write(&mut first, &model, SendFlags::default(), CodecKind::MessagePack).unwrap();
        let frame = wire.try_read(&mut &first[..]).unwrap();
        let decoded = wire.try_deserialize_frame(&frame, None).unwrap();
        prop_assert!(decoded.equivalent(&model));

        let mut second = BytesMut::new();
        wire.write(&mut second, &decoded, SendFlags::default(), CodecKind::MessagePack).unwrap();
        prop_assert_eq!(first, second);
    }
}

// Property: arbitrary bytes never panic the decoders or the framer
proptest! {
    #[test]
    fn prop_random_bytes_never_panic(data in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = CompactConverter.deserialize(&data);
        let _ = MessagePackConverter.deserialize(&data);

        let wire = WireProtocol::with_defaults();
        let mut src = &data[..];
        while let Some(frame) = wire.try_read(&mut src) {
            let _ = wire.try_deserialize_frame(&frame, Some(b"k"));
        }
        prop_assert!(src.len() <= data.len());
    }
}
