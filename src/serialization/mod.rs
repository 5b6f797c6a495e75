//! # Serialization Formats
//!
//! Value graph and the interchangeable binary converters selected by the
//! codec bits of a frame header.
//!
//! ## Formats
//! - **Compact** (selector 0): private type codes, nullable varint lengths,
//!   homogeneous containers that store their element type once
//! - **MessagePack** (selector 1): standard MessagePack type codes with
//!   minimal-width integers
//!
//! The two numbering spaces are independent; bytes written by one codec are
//! not readable by the other.
//!
//! ## Usage
//! ```rust
//! use rpc_wire::serialization::{BinaryConverter, CompactConverter, MessagePackConverter, Value};
//!
//! let value = Value::List(vec![Value::U16(7), Value::from("seven"), Value::Null]);
//! for codec in [&CompactConverter as &dyn BinaryConverter, &MessagePackConverter] {
//!     let bytes = codec.serialize(&value).unwrap();
//!     assert_eq!(bytes.len(), codec.encoded_len(&value).unwrap());
//! }
//! ```

pub mod compact;
pub mod converter;
pub mod msgpack;
pub mod reader;
pub mod value;

pub use compact::CompactConverter;
pub use converter::{BinaryConverter, CodecKind};
pub use msgpack::MessagePackConverter;
pub use reader::ByteReader;
pub use value::{Array, Layout, Map, Parameters, Value, ValueKind};
