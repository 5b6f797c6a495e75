//! # Utility Modules
//!
//! Supporting utilities for payload encryption and logging.
//!
//! ## Components
//! - **Crypto**: XChaCha20-Poly1305 payload encryption behind the
//!   `CryptoProvider` trait
//! - **Logging**: Structured logging configuration
//!
//! ## Security
//! - Cryptographically secure RNG (getrandom)
//! - Keys derived with SHA-256 from caller key material

pub mod crypto;
pub mod logging;

pub use crypto::{CryptoKind, CryptoProvider, XChaChaProvider};
