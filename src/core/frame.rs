//! A header plus the payload bytes it describes.

use super::header::Header;
use crate::error::Result;
use bytes::{Bytes, BytesMut};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: Header,
    /// Codec output, or ciphertext when the header is marked encrypted
    pub payload: Bytes,
}

impl Frame {
    /// Pairs `payload` with `header`, fixing up the declared length.
    pub fn new(mut header: Header, payload: Bytes) -> Self {
        header.payload_len = payload.len();
        Self { header, payload }
    }

    pub fn encoded_len(&self) -> Result<usize> {
        Ok(self.header.encoded_len()? + self.payload.len())
    }

    /// Appends header, length field and payload. Nothing is written when the
    /// header cannot be encoded.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        dst.reserve(self.encoded_len()?);
        self.header.encode(dst)?;
        dst.extend_from_slice(&self.payload);
        Ok(())
    }

    /// Parses one frame from the front of `src`.
    ///
    /// Returns `Ok(None)` when `src` ends before the frame does, otherwise the
    /// frame and the number of bytes it occupied.
    pub fn decode(src: &[u8]) -> Result<Option<(Frame, usize)>> {
        let Some((header, header_len)) = Header::decode(src)? else {
            return Ok(None);
        };
        let end = header_len + header.payload_len;
        let Some(payload) = src.get(header_len..end) else {
            return Ok(None);
        };
        let frame = Frame {
            header,
            payload: Bytes::copy_from_slice(payload),
        };
        Ok(Some((frame, end)))
    }
}
