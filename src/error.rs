//! # Error Types
//!
//! Error handling for the wire protocol and its binary codecs.
//!
//! ## Error Categories
//! - **Wiring errors**: unregistered codec/crypto selectors, values a codec
//!   cannot represent, operation kinds that cannot carry a crypto selector
//! - **Malformed input**: truncated buffers, unknown type codes, bad UTF-8,
//!   declared lengths that exceed the remaining bytes
//! - **Cryptographic errors**: encryption/decryption failures
//! - **Capacity errors**: payloads or collections larger than the wire format
//!   can describe, raised before any byte is written
//!
//! Public `try_*` entry points on the framer fold malformed-input and crypto
//! errors into `None`; everything else surfaces as `Err`.
//!
//! ## Example Usage
//! ```rust
//! use rpc_wire::error::{ProtocolError, Result};
//!
//! fn checked_len(len: usize, max: usize) -> Result<usize> {
//!     if len > max {
//!         return Err(ProtocolError::CapacityExceeded { len, max });
//!     }
//!     Ok(len)
//! }
//!
//! assert!(checked_len(10, 5).is_err());
//! ```

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Decoder errors
    pub const ERR_UNEXPECTED_EOF: &str = "Unexpected end of input";
    pub const ERR_TRAILING_BYTES: &str = "Trailing bytes after value";
    pub const ERR_INVALID_UTF8: &str = "Invalid UTF-8 in string payload";
    pub const ERR_INVALID_CHAR: &str = "Invalid char scalar value";
    pub const ERR_NULL_NOT_ALLOWED: &str = "Null length in a non-nullable position";

    /// Framing errors
    pub const ERR_INVALID_HEADER: &str = "Invalid frame header";
    pub const ERR_PAYLOAD_MISMATCH: &str = "Declared payload length exceeds remaining bytes";

    /// Operation model errors
    pub const ERR_UNEXPECTED_PAYLOAD: &str = "Operation kind carries no payload";
    pub const ERR_MISSING_PAYLOAD: &str = "Operation kind requires a payload";
    pub const ERR_NOT_A_TUPLE: &str = "Operation payload is not a heterogeneous sequence";

    /// Cryptographic errors
    pub const ERR_ENCRYPTION_FAILED: &str = "Encryption failed";
    pub const ERR_DECRYPTION_FAILED: &str = "Decryption failed";
}

// ProtocolError is the primary error type for all wire operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed input: {0}")]
    Malformed(String),

    #[error("Unknown type code 0x{code:02x} for {codec} codec")]
    UnknownTypeCode { codec: &'static str, code: u8 },

    #[error("Unsupported value shape for {codec} codec: {kind}")]
    UnsupportedType { codec: &'static str, kind: String },

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Length {len} exceeds maximum representable {max}")]
    CapacityExceeded { len: usize, max: usize },

    #[error("No codec registered for selector {0}")]
    UnregisteredCodec(u8),

    #[error("No crypto provider registered for selector {0}")]
    UnregisteredCrypto(u8),

    #[error("Invalid frame header")]
    InvalidHeader,

    #[error("Operation kind {0} cannot carry send flags")]
    FlagsNotSupported(&'static str),

    #[error("Encryption failed")]
    EncryptionFailure,

    #[error("Decryption failed")]
    DecryptionFailure,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ProtocolError {
    /// Shorthand for a [`ProtocolError::Malformed`] built from a static message.
    pub(crate) fn malformed(msg: &str) -> Self {
        ProtocolError::Malformed(msg.to_string())
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
