//! # rpc-wire
//!
//! Wire protocol and binary codec layer of an RPC transport.
//!
//! A typed [`OperationModel`](protocol::OperationModel) (ping, handshake,
//! request, response, event, disconnect) is serialized with one of two
//! interchangeable binary codecs, optionally encrypted, and wrapped in a
//! bit-packed frame header. The same path runs in reverse on receive.
//!
//! ## Modules
//! - [`serialization`]: value graph, Compact codec, MessagePack-compatible codec
//! - [`core`]: frame header packing, frames, the Tokio stream codec
//! - [`protocol`]: operation models and the [`WireProtocol`](protocol::WireProtocol) framer
//! - [`utils`]: payload encryption and logging setup
//! - [`config`]: TOML / environment configuration
//! - [`error`]: [`ProtocolError`](error::ProtocolError) and the `Result` alias
//!
//! Transport I/O is not part of this crate. Stream transports frame their
//! sockets with [`FrameCodec`](core::FrameCodec).

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod serialization;
pub mod utils;

pub use crate::core::{Frame, FrameCodec, Header, OperationKind, SendFlags};
pub use crate::error::{ProtocolError, Result};
pub use crate::protocol::{OperationModel, WireProtocol};
pub use crate::serialization::{BinaryConverter, CodecKind, Value};
pub use crate::utils::crypto::{CryptoKind, CryptoProvider};
