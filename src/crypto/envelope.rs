//! Encrypted evidence envelopes
//!
//! Confidential evidence is stored as a JSON envelope:
//!
//! ```json
//! {"nonce": "<base64>", "encryptedData": "<base64>", "senderPublicKey": "<base64>"}
//! ```
//!
//! The ciphertext is a NaCl box (X25519 + XSalsa20-Poly1305, tag first)
//! from the sender's secret key to the recipient's public key. Opening it
//! derives the same shared secret from the recipient's secret key and the
//! sender's public key.
//!
//! Validation order matters: the field presence check runs before any
//! base64 decoding, and decoding runs before any cryptographic work.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use crypto_box::{
    aead::{generic_array::GenericArray, Aead},
    PublicKey, SalsaBox, SecretKey,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::key_material::{KeyMaterial, KEY_SIZE};
use crate::error::{DecryptionError, EnvelopeError, KeyFormatError, VerifyError};

/// XSalsa20 nonce size (192 bits)
pub const NONCE_SIZE: usize = 24;

pub const FIELD_NONCE: &str = "nonce";
pub const FIELD_ENCRYPTED_DATA: &str = "encryptedData";
pub const FIELD_SENDER_PUBLIC_KEY: &str = "senderPublicKey";

/// Wire form of an envelope. All three fields are required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncryptedEnvelope {
    pub nonce: String,
    #[serde(rename = "encryptedData")]
    pub encrypted_data: String,
    #[serde(rename = "senderPublicKey")]
    pub sender_public_key: String,
}

/// Lenient shape used only to report every missing field at once
#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    nonce: Option<String>,
    #[serde(default, rename = "encryptedData")]
    encrypted_data: Option<String>,
    #[serde(default, rename = "senderPublicKey")]
    sender_public_key: Option<String>,
}

/// Envelope after transport decoding, ready to open
pub struct DecodedEnvelope {
    nonce: [u8; NONCE_SIZE],
    ciphertext: Vec<u8>,
    sender_public_key: PublicKey,
}

impl EncryptedEnvelope {
    /// Parse and validate an envelope payload.
    ///
    /// Absent, null or empty fields are rejected; nothing is defaulted.
    pub fn from_json(payload: &[u8]) -> Result<Self, EnvelopeError> {
        let value: serde_json::Value = serde_json::from_slice(payload)
            .map_err(|e| EnvelopeError::Malformed(format!("payload is not JSON ({})", e)))?;
        if !value.is_object() {
            return Err(EnvelopeError::Malformed(
                "payload is not a JSON object".to_string(),
            ));
        }
        let raw: RawEnvelope = serde_json::from_value(value)
            .map_err(|e| EnvelopeError::Malformed(format!("unexpected field type ({})", e)))?;

        let present = |v: Option<String>| v.filter(|s| !s.is_empty());
        let nonce = present(raw.nonce);
        let encrypted_data = present(raw.encrypted_data);
        let sender_public_key = present(raw.sender_public_key);

        match (nonce, encrypted_data, sender_public_key) {
            (Some(nonce), Some(encrypted_data), Some(sender_public_key)) => Ok(Self {
                nonce,
                encrypted_data,
                sender_public_key,
            }),
            (nonce, encrypted_data, sender_public_key) => {
                let missing: Vec<&str> = [
                    (FIELD_NONCE, nonce.is_none()),
                    (FIELD_ENCRYPTED_DATA, encrypted_data.is_none()),
                    (FIELD_SENDER_PUBLIC_KEY, sender_public_key.is_none()),
                ]
                .into_iter()
                .filter(|(_, absent)| *absent)
                .map(|(name, _)| name)
                .collect();
                Err(EnvelopeError::Malformed(missing.join(", ")))
            }
        }
    }

    /// Serialize to the wire format
    pub fn to_json(&self) -> Vec<u8> {
        // Three string fields, cannot fail
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Transport-decode each field independently
    pub fn decode(&self) -> Result<DecodedEnvelope, EnvelopeError> {
        let nonce: [u8; NONCE_SIZE] = decode_field(FIELD_NONCE, &self.nonce)?
            .try_into()
            .map_err(|v: Vec<u8>| length_error(FIELD_NONCE, NONCE_SIZE, v.len()))?;

        let ciphertext = decode_field(FIELD_ENCRYPTED_DATA, &self.encrypted_data)?;

        let sender: [u8; KEY_SIZE] =
            decode_field(FIELD_SENDER_PUBLIC_KEY, &self.sender_public_key)?
                .try_into()
                .map_err(|v: Vec<u8>| length_error(FIELD_SENDER_PUBLIC_KEY, KEY_SIZE, v.len()))?;

        Ok(DecodedEnvelope {
            nonce,
            ciphertext,
            sender_public_key: PublicKey::from(sender),
        })
    }

    /// Decode and open with the recipient's key
    pub fn open(&self, recipient: &KeyMaterial) -> Result<Vec<u8>, VerifyError> {
        let decoded = self.decode()?;
        Ok(decoded.open(recipient.secret_key())?)
    }

    /// Seal `plaintext` for `recipient` with a fresh random nonce
    pub fn seal(
        sender: &SecretKey,
        recipient: &PublicKey,
        plaintext: &[u8],
    ) -> Result<Self, crypto_box::aead::Error> {
        let mut nonce = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce);
        Self::seal_with_nonce(sender, recipient, &nonce, plaintext)
    }

    /// Seal with a caller-chosen nonce. Never reuse a nonce for the same key pair.
    pub fn seal_with_nonce(
        sender: &SecretKey,
        recipient: &PublicKey,
        nonce: &[u8; NONCE_SIZE],
        plaintext: &[u8],
    ) -> Result<Self, crypto_box::aead::Error> {
        let salsa_box = SalsaBox::new(recipient, sender);
        let ciphertext = salsa_box.encrypt(GenericArray::from_slice(nonce), plaintext)?;

        Ok(Self {
            nonce: STANDARD.encode(nonce),
            encrypted_data: STANDARD.encode(ciphertext),
            sender_public_key: STANDARD.encode(sender.public_key().as_bytes()),
        })
    }
}

impl DecodedEnvelope {
    /// Open the box. All-or-nothing: no plaintext on any failure.
    pub fn open(&self, recipient: &SecretKey) -> Result<Vec<u8>, DecryptionError> {
        let salsa_box = SalsaBox::new(&self.sender_public_key, recipient);
        salsa_box
            .decrypt(GenericArray::from_slice(&self.nonce), self.ciphertext.as_slice())
            .map_err(|_| DecryptionError)
    }

    pub fn ciphertext_len(&self) -> usize {
        self.ciphertext.len()
    }
}

/// Parse, validate, decode and open an envelope payload.
///
/// The recipient key is only loaded once the envelope has passed its
/// shape and encoding checks.
pub fn decrypt_envelope<F>(payload: &[u8], load_key: F) -> Result<Vec<u8>, VerifyError>
where
    F: FnOnce() -> Result<KeyMaterial, KeyFormatError>,
{
    let envelope = EncryptedEnvelope::from_json(payload)?;
    let decoded = envelope.decode()?;
    let recipient = load_key()?;
    debug!(
        ciphertext_len = decoded.ciphertext_len(),
        "Opening evidence envelope"
    );
    Ok(decoded.open(recipient.secret_key())?)
}

fn decode_field(field: &'static str, value: &str) -> Result<Vec<u8>, EnvelopeError> {
    STANDARD
        .decode(value.trim())
        .map_err(|e| EnvelopeError::Encoding {
            field,
            reason: e.to_string(),
        })
}

fn length_error(field: &'static str, expected: usize, actual: usize) -> EnvelopeError {
    EnvelopeError::Encoding {
        field,
        reason: format!("expected {} bytes, got {}", expected, actual),
    }
}
