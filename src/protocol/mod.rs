//! # Protocol Layer
//!
//! Typed operations and the framer that moves them on and off the wire.
//!
//! ## Components
//! - **Model**: the eight operation kinds and their positional layouts
//! - **Wire**: codec/crypto registry plus write, read and deserialize
//!
//! ## Example
//! ```rust
//! use bytes::BytesMut;
//! use rpc_wire::core::SendFlags;
//! use rpc_wire::protocol::{OperationModel, RequestModel, WireProtocol};
//! use rpc_wire::serialization::CodecKind;
//!
//! let wire = WireProtocol::with_defaults();
//! let model: OperationModel = RequestModel {
//!     operation_code: "join".into(),
//!     parameters: None,
//!     request_id: 1,
//! }
//! .into();
//!
//! let mut buf = BytesMut::new();
//! wire.write(&mut buf, &model, SendFlags::default(), CodecKind::Compact).unwrap();
//!
//! let mut src = &buf[..];
//! let frame = wire.try_read(&mut src).unwrap();
//! assert_eq!(wire.try_deserialize_frame(&frame, None), Some(model));
//! ```

pub mod model;
pub mod wire;

pub use model::{
    DisconnectModel, DisconnectReason, EventModel, HandshakeAckModel, HandshakeModel,
    OperationModel, RequestModel, ResponseModel,
};
pub use wire::WireProtocol;
