//! Signer identity derived from an ed25519 account key
//!
//! NEAR stores account keys as `ed25519:<base58>` where the base58 payload
//! is the 64-byte expanded secret (seed followed by public key). Only the
//! first 32 bytes (the seed) are used; the public key is always re-derived.

use ed25519_dalek::SigningKey;

use crate::error::KeyFormatError;

/// Algorithm prefix of an extended account key
pub const ED25519_PREFIX: &str = "ed25519:";

/// Ed25519 seed size
pub const SEED_SIZE: usize = 32;

/// Decode an extended private key and return the signing seed
fn decode_seed(extended_private_key: &str) -> Result<[u8; SEED_SIZE], KeyFormatError> {
    let encoded = extended_private_key
        .strip_prefix(ED25519_PREFIX)
        .unwrap_or(extended_private_key);

    // The other curve NEAR supports is not usable for this
    if encoded.contains(':') {
        return Err(KeyFormatError::UnsupportedAlgorithm {
            expected: ED25519_PREFIX,
        });
    }

    let decoded = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| KeyFormatError::InvalidBase58(e.to_string()))?;

    if decoded.len() < SEED_SIZE {
        return Err(KeyFormatError::TooShort {
            actual: decoded.len(),
            required: SEED_SIZE,
        });
    }

    let mut seed = [0u8; SEED_SIZE];
    seed.copy_from_slice(&decoded[..SEED_SIZE]);
    Ok(seed)
}

/// Derive the base58 public key for an `ed25519:` extended private key.
///
/// Pure and deterministic: no randomness, no I/O.
pub fn derive_public_key(extended_private_key: &str) -> Result<String, KeyFormatError> {
    let seed = decode_seed(extended_private_key)?;
    let signing_key = SigningKey::from_bytes(&seed);
    Ok(bs58::encode(signing_key.verifying_key().to_bytes()).into_string())
}

/// Base58 of the bare 32-byte signing seed
pub fn signing_seed_base58(extended_private_key: &str) -> Result<String, KeyFormatError> {
    let seed = decode_seed(extended_private_key)?;
    Ok(bs58::encode(seed).into_string())
}

/// Local account identity, resolved once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerIdentity {
    /// Base58 ed25519 public key
    pub public_key: String,
    /// Account id owning the key, if the directory knows one
    pub account_id: Option<String>,
}

impl SignerIdentity {
    /// Derive the identity from the configured signer key
    pub fn from_config(signer_private_key: Option<&str>) -> Result<Self, KeyFormatError> {
        let key = signer_private_key
            .filter(|k| !k.is_empty())
            .ok_or(KeyFormatError::Missing("signer private key"))?;
        Ok(Self {
            public_key: derive_public_key(key)?,
            account_id: None,
        })
    }

    pub fn with_account_id(mut self, account_id: Option<String>) -> Self {
        self.account_id = account_id;
        self
    }

    /// Public key in NEAR's prefixed form
    pub fn prefixed_public_key(&self) -> String {
        format!("{}{}", ED25519_PREFIX, self.public_key)
    }
}
