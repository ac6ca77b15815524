//! Error types for the verification pipeline
//!
//! Each stage owns its error enum. `VerifyError` unifies them so the
//! verifier can report which stage failed without losing the detail.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, VerifyError>;

/// Errors while turning a configured secret into key material
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyFormatError {
    #[error("{0} is not configured")]
    Missing(&'static str),

    #[error("Invalid base64 key material: {0}")]
    InvalidBase64(String),

    #[error("Invalid base58 key material: {0}")]
    InvalidBase58(String),

    #[error("Unsupported key algorithm prefix (expected \"{expected}\")")]
    UnsupportedAlgorithm { expected: &'static str },

    #[error("Key material too short: {actual} bytes (need at least {required})")]
    TooShort { actual: usize, required: usize },
}

/// Evidence reference that cannot be turned into a gateway URL
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LocatorError {
    #[error("Evidence reference is empty")]
    Empty,

    #[error("Evidence reference {0:?} is not a valid content address")]
    InvalidShape(String),
}

/// Failures retrieving evidence bytes
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to retrieve file: {status} {reason}")]
    Retrieval { status: u16, reason: String },

    #[error("Transport error fetching {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

impl FetchError {
    /// HTTP status of a retrieval failure, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Retrieval { status, .. } => Some(*status),
            FetchError::Transport { .. } | FetchError::Client(_) => None,
        }
    }
}

/// Wire-format violations in an encrypted envelope
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("Invalid payload format - missing required fields for asymmetric decryption: {0}")]
    Malformed(String),

    #[error("Invalid {field}: {reason}")]
    Encoding { field: &'static str, reason: String },
}

/// Authentication failure opening a box.
///
/// Tamper, wrong key and nonce mismatch all look the same from here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Decryption failed: authentication rejected")]
pub struct DecryptionError;

/// Ledger read failures
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Ledger transport error: {0}")]
    Transport(String),

    #[error("Ledger RPC error: {0}")]
    Rpc(String),

    #[error("Invalid task record: {0}")]
    InvalidRecord(String),
}

/// Failures from the description collaborator
#[derive(Debug, Error)]
pub enum DescribeError {
    #[error("Description request failed: {0}")]
    Request(String),

    #[error("Description service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Description response had no content")]
    EmptyResponse,
}

/// Coarse classification of a verification failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Ledger,
    Locator,
    Retrieval,
    Transport,
    KeyFormat,
    MalformedEnvelope,
    Encoding,
    Decryption,
    Description,
}

/// Any failure the verification pipeline can report
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Locator(#[from] LocatorError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    KeyFormat(#[from] KeyFormatError),

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error(transparent)]
    Decryption(#[from] DecryptionError),

    #[error(transparent)]
    Describe(#[from] DescribeError),
}

impl VerifyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VerifyError::Ledger(_) => ErrorKind::Ledger,
            VerifyError::Locator(_) => ErrorKind::Locator,
            VerifyError::Fetch(FetchError::Retrieval { .. }) => ErrorKind::Retrieval,
            VerifyError::Fetch(FetchError::Transport { .. } | FetchError::Client(_)) => {
                ErrorKind::Transport
            }
            VerifyError::KeyFormat(_) => ErrorKind::KeyFormat,
            VerifyError::Envelope(EnvelopeError::Malformed(_)) => ErrorKind::MalformedEnvelope,
            VerifyError::Envelope(EnvelopeError::Encoding { .. }) => ErrorKind::Encoding,
            VerifyError::Decryption(_) => ErrorKind::Decryption,
            VerifyError::Describe(_) => ErrorKind::Description,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_kinds() {
        let err: VerifyError = FetchError::Retrieval {
            status: 404,
            reason: "Not Found".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Retrieval);
        assert_eq!(err.to_string(), "Failed to retrieve file: 404 Not Found");

        let err: VerifyError = FetchError::Transport {
            url: "https://x.example".to_string(),
            message: "timed out".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[test]
    fn test_envelope_error_kinds() {
        let err: VerifyError = EnvelopeError::Malformed("nonce".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::MalformedEnvelope);

        let err: VerifyError = EnvelopeError::Encoding {
            field: "encryptedData",
            reason: "bad padding".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Encoding);
        assert!(err.to_string().contains("encryptedData"));
    }

    #[test]
    fn test_fetch_error_status() {
        let err = FetchError::Retrieval {
            status: 503,
            reason: "Service Unavailable".to_string(),
        };
        assert_eq!(err.status(), Some(503));

        let err = FetchError::Transport {
            url: "https://x.example".to_string(),
            message: "refused".to_string(),
        };
        assert_eq!(err.status(), None);

        let err = FetchError::Client("no TLS backend".to_string());
        assert_eq!(err.status(), None);
        assert_eq!(err.to_string(), "Failed to create HTTP client: no TLS backend");
        assert_eq!(VerifyError::from(err).kind(), ErrorKind::Transport);
    }
}
