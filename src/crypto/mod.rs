//! Cryptographic utilities: key material, signer identity and envelopes.

pub mod envelope;
pub mod identity;
pub mod key_material;

pub use envelope::{EncryptedEnvelope, NONCE_SIZE};
pub use identity::{derive_public_key, signing_seed_base58, SignerIdentity};
pub use key_material::{KeyMaterial, KEY_SIZE};
