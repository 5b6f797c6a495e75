//! # Core Framing Components
//!
//! Frame headers, bit packing and the stream codec.
//!
//! ## Components
//! - **Bits**: MSB-first field packing shared by header encode and decode
//! - **Header**: operation kind, codec and crypto selectors, send flags and
//!   the variable-width payload length
//! - **Frame**: header plus payload bytes
//! - **Codec**: Tokio codec for framing over byte streams
//!
//! ## Wire Format
//! ```text
//! [W(2) Kind(3) Codec(3)] [Crypto(3) U E I S -]? [Length(0-3)] [Payload(N)]
//! ```
//!
//! ## Limits
//! - Maximum payload size: 2^24 - 1 bytes (3-byte length field)
//! - Length validation before allocation

pub mod bits;
pub mod codec;
pub mod frame;
pub mod header;

pub use codec::FrameCodec;
pub use frame::Frame;
pub use header::{Header, OperationKind, SendFlags, MAX_PAYLOAD_LEN};
