//! # Wire Protocol Framer
//!
//! Turns an [`OperationModel`] into a frame and back.
//!
//! ## Write path
//! 1. Serialize the model's positional tuple with the selected codec
//!    (Ping/Pong produce no payload)
//! 2. Optionally encrypt the serialized bytes
//! 3. Pack the header and emit header, length and payload
//!
//! ## Read path
//! `try_read` recovers the header and raw payload of one frame;
//! `try_deserialize_*` turn a payload into a model. Malformed frames, unknown
//! selectors and failed decryption all yield `None` and are logged at
//! `debug`, so callers can drop the frame without crashing.
//!
//! ## Concurrency
//! Providers are registered through `&mut self` before the framer is shared.
//! After that every method takes `&self`, so one `Arc<WireProtocol>` can be
//! used from any number of threads.

use crate::config::ProtocolConfig;
use crate::core::codec::FrameCodec;
use crate::core::frame::Frame;
use crate::core::header::{Header, OperationKind, SendFlags, MAX_PAYLOAD_LEN};
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::model::OperationModel;
use crate::serialization::compact::CompactConverter;
use crate::serialization::converter::{BinaryConverter, CodecKind};
use crate::serialization::msgpack::MessagePackConverter;
use crate::utils::crypto::{CryptoKind, CryptoProvider, XChaChaProvider};
use bytes::{Bytes, BytesMut};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// One slot per 3-bit selector value
const SELECTOR_SLOTS: usize = 8;

pub struct WireProtocol {
    codecs: [Option<Arc<dyn BinaryConverter>>; SELECTOR_SLOTS],
    cryptos: [Option<Arc<dyn CryptoProvider>>; SELECTOR_SLOTS],
    default_codec: CodecKind,
    max_payload_size: usize,
}

impl fmt::Debug for WireProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let codecs: Vec<_> = self.codecs.iter().flatten().map(|c| c.kind()).collect();
        let cryptos: Vec<_> = self.cryptos.iter().flatten().map(|c| c.kind()).collect();
        f.debug_struct("WireProtocol")
            .field("codecs", &codecs)
            .field("cryptos", &cryptos)
            .field("default_codec", &self.default_codec)
            .field("max_payload_size", &self.max_payload_size)
            .finish()
    }
}

impl Default for WireProtocol {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl WireProtocol {
    /// A framer with no providers registered.
    pub fn new() -> Self {
        Self {
            codecs: Default::default(),
            cryptos: Default::default(),
            default_codec: CodecKind::default(),
            max_payload_size: MAX_PAYLOAD_LEN,
        }
    }

    /// Both codecs and the XChaCha20-Poly1305 provider.
    pub fn with_defaults() -> Self {
        let mut wire = Self::new();
        wire.register_default_codecs();
        wire.register_crypto(CryptoKind::XChaCha20Poly1305, Arc::new(XChaChaProvider));
        wire
    }

    /// Builds a framer from validated configuration. The crypto provider is
    /// only registered when encryption is enabled.
    pub fn from_config(config: &ProtocolConfig) -> Result<Self> {
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(ProtocolError::ConfigError(errors.join("; ")));
        }

        let mut wire = Self::new();
        wire.register_default_codecs();
        if config.encryption_enabled {
            match config.crypto {
                CryptoKind::XChaCha20Poly1305 => {
                    wire.register_crypto(config.crypto, Arc::new(XChaChaProvider))
                }
            }
        }
        wire.default_codec = config.default_codec;
        wire.max_payload_size = config.max_payload_size;
        Ok(wire)
    }

    fn register_default_codecs(&mut self) {
        self.register_codec(CodecKind::Compact, Arc::new(CompactConverter));
        self.register_codec(CodecKind::MessagePack, Arc::new(MessagePackConverter));
    }

    /// Installs `converter` for `kind`, replacing any previous one.
    pub fn register_codec(&mut self, kind: CodecKind, converter: Arc<dyn BinaryConverter>) {
        debug!(codec = %kind, "Registering codec");
        self.codecs[kind.bits() as usize] = Some(converter);
    }

    /// Installs `provider` for `kind`, replacing any previous one.
    pub fn register_crypto(&mut self, kind: CryptoKind, provider: Arc<dyn CryptoProvider>) {
        debug!(crypto = %kind, "Registering crypto provider");
        self.cryptos[kind.bits() as usize] = Some(provider);
    }

    pub fn default_codec(&self) -> CodecKind {
        self.default_codec
    }

    pub fn max_payload_size(&self) -> usize {
        self.max_payload_size
    }

    /// A stream codec that enforces this framer's payload limit.
    pub fn frame_codec(&self) -> FrameCodec {
        FrameCodec::new(self.max_payload_size)
    }

    pub fn codec(&self, kind: CodecKind) -> Result<&dyn BinaryConverter> {
        self.codecs[kind.bits() as usize]
            .as_deref()
            .ok_or(ProtocolError::UnregisteredCodec(kind.bits()))
    }

    pub fn crypto(&self, kind: CryptoKind) -> Result<&dyn CryptoProvider> {
        self.cryptos[kind.bits() as usize]
            .as_deref()
            .ok_or(ProtocolError::UnregisteredCrypto(kind.bits()))
    }

    fn serialize_model(&self, model: &OperationModel, codec: CodecKind) -> Result<Bytes> {
        let converter = self.codec(codec)?;
        match model.to_payload() {
            Some(value) => converter.serialize(&value),
            None => Ok(Bytes::new()),
        }
    }

    fn check_payload_len(&self, len: usize) -> Result<()> {
        let max = self.max_payload_size.min(MAX_PAYLOAD_LEN);
        if len > max {
            return Err(ProtocolError::CapacityExceeded { len, max });
        }
        Ok(())
    }

    fn emit(&self, header: Header, payload: Bytes, dst: &mut BytesMut) -> Result<()> {
        self.check_payload_len(payload.len())?;
        let frame = Frame::new(header, payload);
        frame.encode(dst)?;
        debug!(
            kind = %frame.header.kind,
            len = frame.header.payload_len,
            "Frame written"
        );
        Ok(())
    }

    /// Serializes `model` with `codec` and appends one unencrypted frame to
    /// `dst`. The `encrypted` flag is ignored, and flags are dropped for
    /// kinds other than Request/Response/Event.
    ///
    /// Nothing is appended when any step fails.
    #[instrument(level = "debug", skip_all, fields(kind = %model.kind(), codec = %codec))]
    pub fn write(
        &self,
        dst: &mut BytesMut,
        model: &OperationModel,
        flags: SendFlags,
        codec: CodecKind,
    ) -> Result<()> {
        let payload = self.serialize_model(model, codec)?;
        self.emit(Header::new(model.kind(), codec, flags), payload, dst)
    }

    /// [`write`](Self::write) with the configured default codec.
    pub fn write_default(
        &self,
        dst: &mut BytesMut,
        model: &OperationModel,
        flags: SendFlags,
    ) -> Result<()> {
        self.write(dst, model, flags, self.default_codec)
    }

    /// Like [`write`](Self::write), but the serialized payload is encrypted
    /// with `key` and the header carries the crypto selector.
    ///
    /// Only Request, Response and Event can be encrypted.
    #[instrument(level = "debug", skip_all, fields(kind = %model.kind(), codec = %codec, crypto = %crypto))]
    pub fn write_encrypted(
        &self,
        dst: &mut BytesMut,
        model: &OperationModel,
        flags: SendFlags,
        codec: CodecKind,
        crypto: CryptoKind,
        key: &[u8],
    ) -> Result<()> {
        let header = Header::new(model.kind(), codec, flags).encrypted(crypto)?;
        let provider = self.crypto(crypto)?;
        let plaintext = self.serialize_model(model, codec)?;
        let payload = provider.encrypt(&plaintext, key)?;
        self.emit(header, Bytes::from(payload), dst)
    }

    /// Reads one frame from the front of `src` and advances it past the
    /// frame. On failure `src` is left untouched.
    pub fn try_read(&self, src: &mut &[u8]) -> Option<Frame> {
        let bytes: &[u8] = src;
        let (frame, used) = match Frame::decode(bytes) {
            Ok(Some(decoded)) => decoded,
            Ok(None) => {
                debug!(available = bytes.len(), "{}", constants::ERR_PAYLOAD_MISMATCH);
                return None;
            }
            Err(e) => {
                debug!(error = %e, "Dropping unreadable frame");
                return None;
            }
        };
        if let Err(e) = self.check_payload_len(frame.payload.len()) {
            debug!(error = %e, "Dropping oversized frame");
            return None;
        }
        *src = &bytes[used..];
        Some(frame)
    }

    /// Decodes an unencrypted payload into a model of `kind`.
    pub fn try_deserialize_operation_model(
        &self,
        payload: &[u8],
        kind: OperationKind,
        codec: CodecKind,
    ) -> Option<OperationModel> {
        self.deserialize_operation_model(payload, kind, codec)
            .map_err(|e| debug!(%kind, %codec, error = %e, "Dropping undecodable payload"))
            .ok()
    }

    /// Decrypts `payload` with `key`, then decodes it into a model of `kind`.
    pub fn try_deserialize_encrypt_operation_model(
        &self,
        payload: &[u8],
        kind: OperationKind,
        codec: CodecKind,
        crypto: CryptoKind,
        key: &[u8],
    ) -> Option<OperationModel> {
        let plaintext = self
            .crypto(crypto)
            .and_then(|provider| provider.decrypt(payload, key))
            .map_err(|e| debug!(%kind, %crypto, error = %e, "Dropping undecryptable payload"))
            .ok()?;
        self.try_deserialize_operation_model(&plaintext, kind, codec)
    }

    /// Decodes the payload of `frame`, decrypting with `key` when the header
    /// says so. Encrypted frames without a key yield `None`.
    pub fn try_deserialize_frame(&self, frame: &Frame, key: Option<&[u8]>) -> Option<OperationModel> {
        let header = &frame.header;
        match (header.crypto, key) {
            (Some(crypto), Some(key)) => self.try_deserialize_encrypt_operation_model(
                &frame.payload,
                header.kind,
                header.codec,
                crypto,
                key,
            ),
            (Some(_), None) => {
                debug!(kind = %header.kind, "Encrypted frame without a key");
                None
            }
            (None, _) => {
                self.try_deserialize_operation_model(&frame.payload, header.kind, header.codec)
            }
        }
    }

    fn deserialize_operation_model(
        &self,
        payload: &[u8],
        kind: OperationKind,
        codec: CodecKind,
    ) -> Result<OperationModel> {
        let value = if payload.is_empty() {
            None
        } else {
            Some(self.codec(codec)?.deserialize(payload)?)
        };
        OperationModel::from_payload(kind, value)
    }
}
