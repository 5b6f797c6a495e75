#![no_main]

use libfuzzer_sys::fuzz_target;
use rpc_wire::serialization::{BinaryConverter, CompactConverter, MessagePackConverter};

fuzz_target!(|data: &[u8]| {
    // Anything that decodes must re-encode to a buffer of its declared length
    for codec in [&CompactConverter as &dyn BinaryConverter, &MessagePackConverter] {
        if let Ok(value) = codec.deserialize(data) {
            let len = codec.encoded_len(&value).expect("decoded value must encode");
            let bytes = codec.serialize(&value).expect("decoded value must encode");
            assert_eq!(bytes.len(), len);
        }
    }
});
