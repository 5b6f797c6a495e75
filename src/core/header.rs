//! Frame header: one or two bit-packed bytes plus a 0-3 byte length field.
//!
//! ```text
//! byte 0:  [width(2)] [operation kind(3)] [codec(3)]
//! byte 1:  [crypto(3)] [unreliable] [encrypted] [immediate] [sync] [reserved]
//!          (only for Request / Response / Event)
//! length:  `width` low-order bytes of the big-endian u32 payload length
//! ```
//!
//! Width classes: 0 = no payload, 1 = up to 127 bytes, 2 = up to 32767,
//! 3 = up to 2^24 - 1. Anything longer cannot be framed.

use super::bits::{BitReader, BitWriter};
use crate::error::{ProtocolError, Result};
use crate::serialization::converter::CodecKind;
use crate::utils::crypto::CryptoKind;
use bytes::{BufMut, BytesMut};
use std::fmt;

/// Largest payload a frame can carry (3-byte length field)
pub const MAX_PAYLOAD_LEN: usize = (1 << 24) - 1;

/// Longest possible header: two header bytes and a 3-byte length
pub const MAX_HEADER_LEN: usize = 5;

/// Upper bound (inclusive) of width classes 1, 2 and 3
const WIDTH_LIMITS: [usize; 3] = [0x7F, 0x7FFF, MAX_PAYLOAD_LEN];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OperationKind {
    Handshake = 0,
    HandshakeAck = 1,
    Disconnect = 2,
    Request = 3,
    Response = 4,
    Event = 5,
    Ping = 6,
    Pong = 7,
}

impl OperationKind {
    pub const ALL: [OperationKind; 8] = [
        OperationKind::Handshake,
        OperationKind::HandshakeAck,
        OperationKind::Disconnect,
        OperationKind::Request,
        OperationKind::Response,
        OperationKind::Event,
        OperationKind::Ping,
        OperationKind::Pong,
    ];

    pub fn bits(self) -> u8 {
        self as u8
    }

    /// Every 3-bit value names a kind; higher bits are ignored.
    pub fn from_bits(bits: u8) -> Self {
        Self::ALL[(bits & 0x07) as usize]
    }

    /// Whether frames of this kind carry the second header byte.
    pub fn carries_flags(self) -> bool {
        matches!(
            self,
            OperationKind::Request | OperationKind::Response | OperationKind::Event
        )
    }

    /// Ping and Pong never carry a payload.
    pub fn has_payload(self) -> bool {
        !matches!(self, OperationKind::Ping | OperationKind::Pong)
    }

    pub fn name(self) -> &'static str {
        match self {
            OperationKind::Handshake => "Handshake",
            OperationKind::HandshakeAck => "HandshakeAck",
            OperationKind::Disconnect => "Disconnect",
            OperationKind::Request => "Request",
            OperationKind::Response => "Response",
            OperationKind::Event => "Event",
            OperationKind::Ping => "Ping",
            OperationKind::Pong => "Pong",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-message delivery hints for Request / Response / Event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SendFlags {
    pub unreliable: bool,
    pub encrypted: bool,
    pub immediate: bool,
    pub sync: bool,
}

impl SendFlags {
    pub fn with_unreliable(mut self, unreliable: bool) -> Self {
        self.unreliable = unreliable;
        self
    }

    pub fn with_immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }

    pub fn with_sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }
}

/// Smallest width class able to describe `len`.
pub fn width_class(len: usize) -> Result<u8> {
    if len == 0 {
        return Ok(0);
    }
    WIDTH_LIMITS
        .iter()
        .position(|&limit| len <= limit)
        .map(|index| index as u8 + 1)
        .ok_or(ProtocolError::CapacityExceeded {
            len,
            max: MAX_PAYLOAD_LEN,
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub kind: OperationKind,
    pub codec: CodecKind,
    /// Present only when `flags.encrypted` is set
    pub crypto: Option<CryptoKind>,
    /// Present only for kinds that carry flags
    pub flags: Option<SendFlags>,
    pub payload_len: usize,
}

impl Header {
    /// Builds an unencrypted header. Flags are dropped for kinds that cannot
    /// carry them and `encrypted` is always cleared.
    pub fn new(kind: OperationKind, codec: CodecKind, flags: SendFlags) -> Self {
        let flags = kind.carries_flags().then_some(SendFlags {
            encrypted: false,
            ..flags
        });
        Self {
            kind,
            codec,
            crypto: None,
            flags,
            payload_len: 0,
        }
    }

    /// Marks the payload as encrypted by `crypto`.
    pub fn encrypted(mut self, crypto: CryptoKind) -> Result<Self> {
        let Some(flags) = self.flags.as_mut() else {
            return Err(ProtocolError::FlagsNotSupported(self.kind.name()));
        };
        flags.encrypted = true;
        self.crypto = Some(crypto);
        Ok(self)
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags.is_some_and(|f| f.encrypted)
    }

    /// Header bytes plus length-field bytes.
    pub fn encoded_len(&self) -> Result<usize> {
        let flag_byte = usize::from(self.flags.is_some());
        Ok(1 + flag_byte + width_class(self.payload_len)? as usize)
    }

    /// Writes the header and length field. Fails before writing anything.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        let width = width_class(self.payload_len)?;
        if self.flags.is_some() != self.kind.carries_flags()
            || self.is_encrypted() != self.crypto.is_some()
        {
            return Err(ProtocolError::InvalidHeader);
        }

        dst.reserve(MAX_HEADER_LEN);
        dst.put_u8(
            BitWriter::new()
                .write(width, 2)
                .write(self.kind.bits(), 3)
                .write(self.codec.bits(), 3)
                .finish(),
        );
        if let Some(flags) = self.flags {
            let crypto = self.crypto.map_or(0, CryptoKind::bits);
            dst.put_u8(
                BitWriter::new()
                    .write(crypto, 3)
                    .write_flag(flags.unreliable)
                    .write_flag(flags.encrypted)
                    .write_flag(flags.immediate)
                    .write_flag(flags.sync)
                    .skip(1)
                    .finish(),
            );
        }
        let len = (self.payload_len as u32).to_be_bytes();
        dst.put_slice(&len[4 - width as usize..]);
        Ok(())
    }

    /// Parses a header from the front of `src`.
    ///
    /// Returns `Ok(None)` when more bytes are needed and the header length
    /// alongside the header otherwise.
    pub fn decode(src: &[u8]) -> Result<Option<(Header, usize)>> {
        let Some(&first) = src.first() else {
            return Ok(None);
        };
        let mut bits = BitReader::new(first);
        let width = bits.read(2) as usize;
        let kind = OperationKind::from_bits(bits.read(3));
        let codec = CodecKind::from_bits(bits.read(3)).ok_or(ProtocolError::InvalidHeader)?;

        let mut pos = 1;
        let (flags, crypto) = if kind.carries_flags() {
            let Some(&second) = src.get(1) else {
                return Ok(None);
            };
            pos = 2;
            let mut bits = BitReader::new(second);
            let crypto_bits = bits.read(3);
            let flags = SendFlags {
                unreliable: bits.read_flag(),
                encrypted: bits.read_flag(),
                immediate: bits.read_flag(),
                sync: bits.read_flag(),
            };
            let crypto = if flags.encrypted {
                Some(CryptoKind::from_bits(crypto_bits).ok_or(ProtocolError::InvalidHeader)?)
            } else {
                None
            };
            (Some(flags), crypto)
        } else {
            (None, None)
        };

        let Some(len_bytes) = src.get(pos..pos + width) else {
            return Ok(None);
        };
        let mut len = [0u8; 4];
        len[4 - width..].copy_from_slice(len_bytes);

        let header = Header {
            kind,
            codec,
            crypto,
            flags,
            payload_len: u32::from_be_bytes(len) as usize,
        };
        Ok(Some((header, pos + width)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(header: &Header) -> Vec<u8> {
        let mut dst = BytesMut::new();
        header.encode(&mut dst).unwrap();
        assert_eq!(dst.len(), header.encoded_len().unwrap());
        dst.to_vec()
    }

    #[test]
    fn test_width_class_boundaries() {
        assert_eq!(width_class(0).unwrap(), 0);
        assert_eq!(width_class(1).unwrap(), 1);
        assert_eq!(width_class(127).unwrap(), 1);
        assert_eq!(width_class(128).unwrap(), 2);
        assert_eq!(width_class(130).unwrap(), 2);
        assert_eq!(width_class(32767).unwrap(), 2);
        assert_eq!(width_class(32768).unwrap(), 3);
        assert_eq!(width_class(MAX_PAYLOAD_LEN).unwrap(), 3);
        assert!(matches!(
            width_class(MAX_PAYLOAD_LEN + 1),
            Err(ProtocolError::CapacityExceeded { .. })
        ));
    }

    #[test]
    fn test_request_header_bit_exact() {
        let mut header = Header::new(
            OperationKind::Request,
            CodecKind::Compact,
            SendFlags::default().with_sync(true),
        );
        header.payload_len = 130;
        assert_eq!(encode(&header), vec![0b10_011_000, 0b0000_0010, 0x00, 0x82]);
    }

    #[test]
    fn test_ping_header_single_byte() {
        let header = Header::new(OperationKind::Ping, CodecKind::MessagePack, SendFlags::default());
        assert_eq!(encode(&header), vec![0b00_110_001]);
    }

    #[test]
    fn test_flags_dropped_for_flagless_kinds() {
        let header = Header::new(
            OperationKind::Handshake,
            CodecKind::Compact,
            SendFlags::default().with_sync(true),
        );
        assert_eq!(header.flags, None);
        assert!(matches!(
            header.encrypted(CryptoKind::XChaCha20Poly1305),
            Err(ProtocolError::FlagsNotSupported(_))
        ));
    }

    #[test]
    fn test_encrypted_header_bits() {
        let mut header = Header::new(
            OperationKind::Event,
            CodecKind::MessagePack,
            SendFlags::default().with_unreliable(true),
        )
        .encrypted(CryptoKind::XChaCha20Poly1305)
        .unwrap();
        header.payload_len = 5;
        let bytes = encode(&header);
        assert_eq!(bytes, vec![0b01_101_001, 0b000_1_1_0_0_0, 0x05]);
        let (decoded, len) = Header::decode(&bytes).unwrap().unwrap();
        assert_eq!(len, 3);
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_decode_roundtrip_all_kinds() {
        for kind in OperationKind::ALL {
            for codec in CodecKind::ALL {
                for payload_len in [0usize, 1, 127, 128, 32767, 32768, MAX_PAYLOAD_LEN] {
                    let mut header = Header::new(kind, codec, SendFlags::default().with_immediate(true));
                    header.payload_len = payload_len;
                    let bytes = encode(&header);
                    let (decoded, len) = Header::decode(&bytes).unwrap().unwrap();
                    assert_eq!(len, bytes.len());
                    assert_eq!(decoded, header);
                }
            }
        }
    }

    #[test]
    fn test_oversized_payload_writes_nothing() {
        let mut header = Header::new(OperationKind::Event, CodecKind::Compact, SendFlags::default());
        header.payload_len = MAX_PAYLOAD_LEN + 1;
        let mut dst = BytesMut::new();
        assert!(header.encode(&mut dst).is_err());
        assert!(dst.is_empty());
    }

    #[test]
    fn test_decode_incomplete() {
        assert!(Header::decode(&[]).unwrap().is_none());
        // request needs the flag byte
        assert!(Header::decode(&[0b00_011_000]).unwrap().is_none());
        // width class 3 needs three length bytes
        assert!(Header::decode(&[0b11_000_000, 0x00]).unwrap().is_none());
    }

    #[test]
    fn test_decode_unknown_selectors() {
        // codec selector 5 is not assigned
        assert!(Header::decode(&[0b00_110_101]).is_err());
        // encrypted with crypto selector 7
        assert!(Header::decode(&[0b00_011_000, 0b111_0_1_0_0_0]).is_err());
    }

    #[test]
    fn test_crypto_bits_ignored_when_not_encrypted() {
        let (header, _) = Header::decode(&[0b00_011_000, 0b111_0_0_0_0_1]).unwrap().unwrap();
        assert_eq!(header.crypto, None);
        assert_eq!(header.flags, Some(SendFlags::default()));
    }
}
