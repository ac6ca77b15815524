//! Task evidence verification
//!
//! Reads a task from the ledger, resolves its evidence reference to a
//! content-addressed gateway URL, retrieves and decrypts the evidence
//! envelope, and has the evidence described.
//!
//! ## Module Structure
//!
//! - `config/`: Verifier configuration (TOML + environment)
//! - `crypto/`: Key material, signer identity, encrypted envelopes
//! - `ledger/`: Task records, NEAR RPC reader, account directory
//! - `evidence/`: Content locator and gateway fetcher
//! - `describe/`: Evidence description via a vision model
//! - `verifier/`: The verification pipeline

/// Configuration
pub mod config;

/// Key material, signer identity and envelope encryption
pub mod crypto;

/// Evidence description
pub mod describe;

/// Error types
pub mod error;

/// Evidence location and retrieval
pub mod evidence;

/// Ledger access
pub mod ledger;

/// Verification pipeline
pub mod verifier;

pub use config::{DescriberConfig, GatewayConfig, LedgerConfig, VerifierConfig};
pub use crypto::{EncryptedEnvelope, KeyMaterial, SignerIdentity};
pub use describe::{Describer, VisionDescriber};
pub use error::{ErrorKind, Result, VerifyError};
pub use evidence::{ContentLocator, EvidenceSource, FetchPolicy, GatewayFetcher};
pub use ledger::{AccountDirectory, LedgerReader, NearRpcLedger, Task, TaskStatus};
pub use verifier::{Stage, TaskVerifier, VerificationOutcome};
