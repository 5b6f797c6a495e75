//! # Payload Encryption
//!
//! Crypto providers selected by the crypto bits of an encrypted frame.
//!
//! The default provider is XChaCha20-Poly1305. Key material of any length is
//! stretched to a 256-bit key with SHA-256, and every message gets a fresh
//! 24-byte nonce from the OS RNG:
//!
//! ```text
//! [Nonce(24)] [Ciphertext(N)] [Tag(16)]
//! ```
//!
//! Decryption reports every failure (short input, wrong key, tampered bytes)
//! as the same [`ProtocolError::DecryptionFailure`].

use crate::error::{ProtocolError, Result};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use tracing::debug;

/// Nonce length for XChaCha20-Poly1305
pub const NONCE_LEN: usize = 24;
/// Poly1305 authentication tag length
pub const TAG_LEN: usize = 16;

/// Crypto selector carried in the high three bits of header byte 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum CryptoKind {
    #[default]
    #[serde(rename = "xchacha20poly1305")]
    XChaCha20Poly1305 = 0,
}

impl CryptoKind {
    pub const ALL: [CryptoKind; 1] = [CryptoKind::XChaCha20Poly1305];

    pub fn bits(self) -> u8 {
        self as u8
    }

    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(CryptoKind::XChaCha20Poly1305),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CryptoKind::XChaCha20Poly1305 => "XChaCha20-Poly1305",
        }
    }
}

impl fmt::Display for CryptoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Encrypts and decrypts serialized payloads.
pub trait CryptoProvider: fmt::Debug + Send + Sync {
    fn kind(&self) -> CryptoKind;

    fn encrypt(&self, plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>>;

    fn decrypt(&self, ciphertext: &[u8], key: &[u8]) -> Result<Vec<u8>>;
}

/// XChaCha20-Poly1305 with a SHA-256 derived key and random nonces.
#[derive(Debug, Default, Clone, Copy)]
pub struct XChaChaProvider;

impl XChaChaProvider {
    fn cipher(key: &[u8]) -> XChaCha20Poly1305 {
        let digest = Sha256::digest(key);
        XChaCha20Poly1305::new(Key::from_slice(&digest))
    }
}

impl CryptoProvider for XChaChaProvider {
    fn kind(&self) -> CryptoKind {
        CryptoKind::XChaCha20Poly1305
    }

    fn encrypt(&self, plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>> {
        let mut nonce = [0u8; NONCE_LEN];
        getrandom::fill(&mut nonce).map_err(|e| {
            debug!(error = %e, "OS RNG unavailable");
            ProtocolError::EncryptionFailure
        })?;

        let ciphertext = Self::cipher(key)
            .encrypt(XNonce::from_slice(&nonce), plaintext)
            .map_err(|_| ProtocolError::EncryptionFailure)?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &[u8], key: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() < NONCE_LEN + TAG_LEN {
            return Err(ProtocolError::DecryptionFailure);
        }
        let (nonce, sealed) = ciphertext.split_at(NONCE_LEN);
        Self::cipher(key)
            .decrypt(XNonce::from_slice(nonce), sealed)
            .map_err(|_| ProtocolError::DecryptionFailure)
    }
}
