//! # Frame Codec
//!
//! Tokio codec that cuts a byte stream into [`Frame`]s. Transports wrap their
//! socket in `Framed::new(stream, FrameCodec::default())` and exchange frames
//! with the framer in [`crate::protocol::wire`].
//!
//! The decoder never copies payload bytes: a complete frame is split off the
//! read buffer and frozen.

use super::frame::Frame;
use super::header::{Header, MAX_PAYLOAD_LEN};
use crate::config::ProtocolConfig;
use crate::error::{ProtocolError, Result};
use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    max_payload_size: usize,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self {
            max_payload_size: MAX_PAYLOAD_LEN,
        }
    }
}

impl FrameCodec {
    /// Limits accepted and emitted payloads to `max_payload_size` bytes,
    /// clamped to what the header can describe.
    pub fn new(max_payload_size: usize) -> Self {
        Self {
            max_payload_size: max_payload_size.min(MAX_PAYLOAD_LEN),
        }
    }

    /// Uses the configured `max_payload_size`.
    pub fn from_config(config: &ProtocolConfig) -> Self {
        Self::new(config.max_payload_size)
    }

    pub fn max_payload_size(&self) -> usize {
        self.max_payload_size
    }

    fn check_len(&self, len: usize) -> Result<()> {
        if len > self.max_payload_size {
            return Err(ProtocolError::CapacityExceeded {
                len,
                max: self.max_payload_size,
            });
        }
        Ok(())
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        let Some((header, header_len)) = Header::decode(&src[..])? else {
            return Ok(None);
        };
        if let Err(e) = self.check_len(header.payload_len) {
            debug!(kind = %header.kind, len = header.payload_len, "Rejecting oversized frame");
            return Err(e);
        }

        let frame_len = header_len + header.payload_len;
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        src.advance(header_len);
        let payload = src.split_to(header.payload_len).freeze();
        Ok(Some(Frame { header, payload }))
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<()> {
        self.check_len(item.payload.len())?;
        Frame::new(item.header, item.payload).encode(dst)
    }
}
