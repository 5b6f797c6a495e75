#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use rpc_wire::{FrameCodec, WireProtocol};
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    // Framer and stream codec must reject garbage without panicking
    let wire = WireProtocol::with_defaults();
    let mut src = data;
    while let Some(frame) = wire.try_read(&mut src) {
        let _ = wire.try_deserialize_frame(&frame, Some(b"fuzz"));
    }

    let mut codec = FrameCodec::default();
    let mut buf = BytesMut::from(data);
    while let Ok(Some(_)) = codec.decode(&mut buf) {}
});
