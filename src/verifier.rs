//! Task verification pipeline
//!
//! ```text
//! Lookup ──► ShortCircuit ──► Locate ──► Fetch ──► Decrypt ──► Describe
//!               │    │
//!               │    └─ already verified: stored result, no evidence work
//!               └────── not found
//! ```
//!
//! Every call re-reads the ledger and rebuilds its key material; the
//! verifier itself holds only immutable configuration and shared
//! collaborators, so concurrent verifications need no coordination.
//! Each stage's failure comes back as [`VerificationOutcome::Failed`];
//! nothing escapes `verify` unstructured.
//!
//! With `evidence_encrypted = false` the fetched bytes skip Decrypt and go
//! straight to the describer; retrieval is still a single bounded attempt.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::VerifierConfig;
use crate::crypto::envelope::decrypt_envelope;
use crate::crypto::KeyMaterial;
use crate::describe::Describer;
use crate::error::{ErrorKind, VerifyError};
use crate::evidence::{ContentLocator, EvidenceSource};
use crate::ledger::LedgerReader;

/// Pipeline stage, reported with failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Lookup,
    Locate,
    Fetch,
    Decrypt,
    Describe,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Lookup => "lookup",
            Stage::Locate => "locate",
            Stage::Fetch => "fetch",
            Stage::Decrypt => "decrypt",
            Stage::Describe => "describe",
        };
        f.write_str(name)
    }
}

/// Result of one verification call
#[derive(Debug)]
pub enum VerificationOutcome {
    /// The ledger has no task with this id
    NotFound { task_id: u64 },

    /// Task was verified earlier; evidence was not touched
    AlreadyVerified {
        task_id: u64,
        result: Option<serde_json::Value>,
    },

    /// Evidence retrieved and described
    Verified {
        task_id: u64,
        evidence_url: String,
        description: String,
    },

    /// A stage failed
    Failed {
        task_id: u64,
        stage: Stage,
        error: VerifyError,
    },
}

impl VerificationOutcome {
    pub fn task_id(&self) -> u64 {
        match self {
            VerificationOutcome::NotFound { task_id }
            | VerificationOutcome::AlreadyVerified { task_id, .. }
            | VerificationOutcome::Verified { task_id, .. }
            | VerificationOutcome::Failed { task_id, .. } => *task_id,
        }
    }

    /// Terminal success: freshly verified or already verified
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            VerificationOutcome::Verified { .. } | VerificationOutcome::AlreadyVerified { .. }
        )
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            VerificationOutcome::Failed { error, .. } => Some(error.kind()),
            _ => None,
        }
    }

    /// Short message suitable for an end user
    pub fn user_message(&self) -> String {
        match self {
            VerificationOutcome::NotFound { task_id } => {
                format!("Task with ID {} not found", task_id)
            }
            VerificationOutcome::AlreadyVerified { task_id, result } => {
                let result = match result {
                    Some(serde_json::Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => "none".to_string(),
                };
                format!("Task {} is already verified with result: {}", task_id, result)
            }
            VerificationOutcome::Verified {
                task_id,
                description,
                ..
            } => format!("Task {} evidence: {}", task_id, description),
            VerificationOutcome::Failed { task_id, error, .. } => {
                let what = match error.kind() {
                    ErrorKind::Ledger => "could not read the task from the ledger",
                    ErrorKind::Locator => "the evidence reference is not recognized",
                    ErrorKind::Retrieval => "the evidence could not be retrieved",
                    ErrorKind::Transport => "the evidence gateway could not be reached",
                    ErrorKind::KeyFormat => "the decryption key is missing or invalid",
                    ErrorKind::MalformedEnvelope => "the evidence is not a valid encrypted envelope",
                    ErrorKind::Encoding => "the evidence envelope is badly encoded",
                    ErrorKind::Decryption => "the evidence could not be decrypted",
                    ErrorKind::Description => "the evidence could not be described",
                };
                format!("Error verifying task {}: {} ({})", task_id, what, error)
            }
        }
    }
}

impl fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.user_message())
    }
}

struct StageFailure {
    stage: Stage,
    error: VerifyError,
}

fn failed(stage: Stage, error: impl Into<VerifyError>) -> StageFailure {
    StageFailure {
        stage,
        error: error.into(),
    }
}

/// Orchestrates ledger read, evidence retrieval, decryption and description
pub struct TaskVerifier {
    ledger: Arc<dyn LedgerReader>,
    source: Arc<dyn EvidenceSource>,
    describer: Arc<dyn Describer>,
    locator: ContentLocator,
    encryption_key: Option<String>,
    evidence_encrypted: bool,
}

impl TaskVerifier {
    pub fn new(
        config: &VerifierConfig,
        ledger: Arc<dyn LedgerReader>,
        source: Arc<dyn EvidenceSource>,
        describer: Arc<dyn Describer>,
    ) -> Self {
        Self {
            ledger,
            source,
            describer,
            locator: ContentLocator::from_config(&config.gateway),
            encryption_key: config.encryption_key.clone(),
            evidence_encrypted: config.evidence_encrypted,
        }
    }

    pub fn locator(&self) -> &ContentLocator {
        &self.locator
    }

    /// Verify one task
    pub async fn verify(&self, task_id: u64) -> VerificationOutcome {
        info!("Verifying task {}", task_id);

        match self.run(task_id).await {
            Ok(outcome) => {
                info!(task_id, success = outcome.is_success(), "Verification finished");
                outcome
            }
            Err(StageFailure { stage, error }) => {
                warn!(
                    task_id,
                    stage = %stage,
                    kind = ?error.kind(),
                    "Verification failed: {}",
                    error
                );
                VerificationOutcome::Failed {
                    task_id,
                    stage,
                    error,
                }
            }
        }
    }

    async fn run(&self, task_id: u64) -> Result<VerificationOutcome, StageFailure> {
        let task = match self
            .ledger
            .get_task(task_id)
            .await
            .map_err(|e| failed(Stage::Lookup, e))?
        {
            Some(task) => task,
            None => {
                debug!("Task {} not on ledger", task_id);
                return Ok(VerificationOutcome::NotFound { task_id });
            }
        };

        if task.is_verified() {
            debug!("Task {} already verified, skipping evidence", task_id);
            return Ok(VerificationOutcome::AlreadyVerified {
                task_id,
                result: task.result,
            });
        }

        let resolved = self
            .locator
            .resolve(&task.evidence)
            .map_err(|e| failed(Stage::Locate, e))?;
        debug!(task_id, cid = %resolved.cid, "Evidence resolved to {}", resolved.url);

        let payload = self
            .source
            .fetch(&resolved.url)
            .await
            .map_err(|e| failed(Stage::Fetch, e))?;

        let evidence = if self.evidence_encrypted {
            let plaintext = self.decrypt(&payload).map_err(|e| failed(Stage::Decrypt, e))?;
            debug!(task_id, "Decrypted {} bytes of evidence", plaintext.len());
            plaintext
        } else {
            payload
        };

        let description = self
            .describer
            .describe(&evidence)
            .await
            .map_err(|e| failed(Stage::Describe, e))?;

        Ok(VerificationOutcome::Verified {
            task_id,
            evidence_url: resolved.url,
            description,
        })
    }

    fn decrypt(&self, payload: &[u8]) -> Result<Vec<u8>, VerifyError> {
        decrypt_envelope(payload, || {
            KeyMaterial::from_config(self.encryption_key.as_deref())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DescribeError, FetchError, LedgerError};
    use crate::ledger::Task;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct OneTask(Option<Task>);

    #[async_trait]
    impl LedgerReader for OneTask {
        async fn get_task(&self, _task_id: u64) -> Result<Option<Task>, LedgerError> {
            Ok(self.0.clone())
        }
    }

    struct BrokenLedger;

    #[async_trait]
    impl LedgerReader for BrokenLedger {
        async fn get_task(&self, _task_id: u64) -> Result<Option<Task>, LedgerError> {
            Err(LedgerError::Transport("connection reset".to_string()))
        }
    }

    #[derive(Default)]
    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EvidenceSource for CountingSource {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(b"not an envelope".to_vec())
        }
    }

    struct EchoDescriber;

    #[async_trait]
    impl Describer for EchoDescriber {
        async fn describe(&self, payload: &[u8]) -> Result<String, DescribeError> {
            Ok(String::from_utf8_lossy(payload).into_owned())
        }
    }

    fn verifier(
        config: &VerifierConfig,
        ledger: impl LedgerReader + 'static,
        source: Arc<CountingSource>,
    ) -> TaskVerifier {
        TaskVerifier::new(config, Arc::new(ledger), source, Arc::new(EchoDescriber))
    }

    fn keyed_config() -> VerifierConfig {
        VerifierConfig {
            encryption_key: Some("correct horse battery staple".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_ledger_failure_is_lookup_stage() {
        let source = Arc::new(CountingSource::default());
        let outcome = verifier(&keyed_config(), BrokenLedger, source.clone())
            .verify(3)
            .await;

        match outcome {
            VerificationOutcome::Failed { stage, ref error, .. } => {
                assert_eq!(stage, Stage::Lookup);
                assert_eq!(error.kind(), ErrorKind::Ledger);
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_bad_reference_is_locate_stage() {
        let source = Arc::new(CountingSource::default());
        let ledger = OneTask(Some(Task::pending(5, "storj-")));
        let outcome = verifier(&keyed_config(), ledger, source.clone()).verify(5).await;

        assert!(matches!(
            outcome,
            VerificationOutcome::Failed {
                stage: Stage::Locate,
                ..
            }
        ));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_garbage_payload_is_decrypt_stage() {
        let source = Arc::new(CountingSource::default());
        let ledger = OneTask(Some(Task::pending(9, "storj-CID9")));
        let outcome = verifier(&keyed_config(), ledger, source.clone()).verify(9).await;

        assert_eq!(outcome.error_kind(), Some(ErrorKind::MalformedEnvelope));
        assert!(matches!(
            outcome,
            VerificationOutcome::Failed {
                stage: Stage::Decrypt,
                ..
            }
        ));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unset_key_does_not_mask_malformed_envelope() {
        let source = Arc::new(CountingSource::default());
        let ledger = OneTask(Some(Task::pending(9, "storj-CID9")));
        let outcome = verifier(&VerifierConfig::default(), ledger, source)
            .verify(9)
            .await;

        assert_eq!(outcome.error_kind(), Some(ErrorKind::MalformedEnvelope));
    }

    #[tokio::test]
    async fn test_plain_mode_describes_fetched_bytes() {
        let config = VerifierConfig {
            evidence_encrypted: false,
            ..Default::default()
        };
        let source = Arc::new(CountingSource::default());
        let ledger = OneTask(Some(Task::pending(11, "storj-CID11")));
        let outcome = verifier(&config, ledger, source.clone()).verify(11).await;

        match outcome {
            VerificationOutcome::Verified {
                evidence_url,
                description,
                ..
            } => {
                assert_eq!(evidence_url, "https://CID11.ipfs.w3s.link");
                assert_eq!(description, "not an envelope");
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            VerificationOutcome::NotFound { task_id: 4 }.user_message(),
            "Task with ID 4 not found"
        );

        let already = VerificationOutcome::AlreadyVerified {
            task_id: 7,
            result: Some(serde_json::json!("ok")),
        };
        assert_eq!(
            already.user_message(),
            "Task 7 is already verified with result: ok"
        );
        assert!(already.is_success());

        let failed = VerificationOutcome::Failed {
            task_id: 42,
            stage: Stage::Fetch,
            error: FetchError::Retrieval {
                status: 404,
                reason: "Not Found".to_string(),
            }
            .into(),
        };
        assert!(!failed.is_success());
        assert_eq!(failed.task_id(), 42);
        assert!(failed.user_message().contains("404 Not Found"));
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Decrypt.to_string(), "decrypt");
        assert_eq!(Stage::Lookup.to_string(), "lookup");
    }
}
