//! Envelope decryption key normalization
//!
//! The configured secret may come from several upstream sources, so it is
//! accepted in two encodings:
//!
//! - `b64:<base64>` - the remainder is base64-decoded
//! - anything else - the raw UTF-8 bytes of the string
//!
//! A decoded key of exactly [`KEY_SIZE`] bytes is used as-is. Any other
//! length is mapped to SHA-256 of the decoded bytes.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use crypto_box::{PublicKey, SecretKey};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::KeyFormatError;

/// X25519 key size in bytes
pub const KEY_SIZE: usize = 32;

/// Prefix marking a base64 transport-encoded key
pub const BASE64_PREFIX: &str = "b64:";

/// Normalized recipient key for opening envelopes
#[derive(Clone)]
pub struct KeyMaterial {
    secret: SecretKey,
}

impl KeyMaterial {
    /// Build key material from the configured secret.
    ///
    /// `None` or an empty string means the key is not configured, which is
    /// fatal for every decryption attempt.
    pub fn from_config(secret: Option<&str>) -> Result<Self, KeyFormatError> {
        match secret {
            Some(s) if !s.is_empty() => Self::parse(s),
            _ => Err(KeyFormatError::Missing("encryption key")),
        }
    }

    /// Parse and normalize a secret string
    pub fn parse(secret: &str) -> Result<Self, KeyFormatError> {
        let decoded = decode_secret(secret)?;
        Ok(Self::from_bytes(&decoded))
    }

    /// Normalize arbitrary key bytes to a 32-byte secret
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            secret: SecretKey::from(normalize_key_bytes(bytes)),
        }
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret
    }

    /// Public key producers encrypt evidence to
    pub fn public_key(&self) -> PublicKey {
        self.secret.public_key()
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("public_key", &STANDARD.encode(self.public_key().as_bytes()))
            .finish_non_exhaustive()
    }
}

/// Decode the transport encoding of a configured secret
pub fn decode_secret(secret: &str) -> Result<Vec<u8>, KeyFormatError> {
    match secret.strip_prefix(BASE64_PREFIX) {
        Some(encoded) => STANDARD
            .decode(encoded.trim())
            .map_err(|e| KeyFormatError::InvalidBase64(e.to_string())),
        None => Ok(secret.as_bytes().to_vec()),
    }
}

/// Exact-length input passes through; anything else is hashed to length
pub fn normalize_key_bytes(bytes: &[u8]) -> [u8; KEY_SIZE] {
    if let Ok(exact) = <[u8; KEY_SIZE]>::try_from(bytes) {
        return exact;
    }
    let digest = Sha256::digest(bytes);
    let mut key = [0u8; KEY_SIZE];
    key.copy_from_slice(&digest);
    key
}
