//! Verifier Configuration
//!
//! Defines the process configuration for evidence verification:
//! - Secrets (signer key, envelope decryption key)
//! - Ledger endpoint and task contract
//! - Content gateway and evidence prefix
//! - Description service
//!
//! Built once at startup and passed into every component that needs it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Complete verifier configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Signer key (`ed25519:<base58>`), identifies the local account
    pub signer_private_key: Option<String>,
    /// Envelope decryption key (plain text or `b64:<base64>`)
    pub encryption_key: Option<String>,
    /// Ledger configuration
    pub ledger: LedgerConfig,
    /// Content gateway configuration
    pub gateway: GatewayConfig,
    /// Description service configuration
    pub describer: DescriberConfig,
    /// Evidence is an encrypted envelope (false: describe the gateway URL directly)
    pub evidence_encrypted: bool,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            signer_private_key: None,
            encryption_key: None,
            ledger: LedgerConfig::default(),
            gateway: GatewayConfig::default(),
            describer: DescriberConfig::default(),
            evidence_encrypted: true,
        }
    }
}

impl fmt::Debug for VerifierConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifierConfig")
            .field("signer_private_key", &redacted(&self.signer_private_key))
            .field("encryption_key", &redacted(&self.encryption_key))
            .field("ledger", &self.ledger)
            .field("gateway", &self.gateway)
            .field("describer", &self.describer)
            .field("evidence_encrypted", &self.evidence_encrypted)
            .finish()
    }
}

fn redacted(secret: &Option<String>) -> &'static str {
    match secret {
        Some(_) => "<redacted>",
        None => "<unset>",
    }
}

/// Ledger (NEAR RPC) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint
    pub rpc_url: String,
    /// Contract holding the task registry
    pub contract_id: String,
    /// View method returning a task by id
    pub get_task_method: String,
    /// Account directory used to resolve a public key to account ids
    pub account_api: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://rpc.testnet.near.org".to_string(),
            contract_id: "commchain.testnet".to_string(),
            get_task_method: "get_task".to_string(),
            account_api: "https://api.fastnear.com".to_string(),
            timeout_secs: 10,
        }
    }
}

impl LedgerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Content gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Gateway domain; URLs take the form `https://{cid}.{domain}`
    pub domain: String,
    /// Producer prefix marking the storage backend
    pub evidence_prefix: String,
    /// Fetch timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            domain: "ipfs.w3s.link".to_string(),
            evidence_prefix: "storj-".to_string(),
            timeout_secs: 10, // fail fast rather than hang a conversational turn
        }
    }
}

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Description service (OpenAI-compatible vision endpoint)
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DescriberConfig {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for DescriberConfig {
    fn default() -> Self {
        Self {
            api_base: "https://openrouter.ai/api/v1".to_string(),
            api_key: String::new(),
            model: "phi-3-vision-128k-instruct".to_string(),
            max_tokens: 1024,
            timeout_secs: 60,
        }
    }
}

impl fmt::Debug for DescriberConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriberConfig")
            .field("api_base", &self.api_base)
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Errors loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

impl VerifierConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Overlay process environment variables
    pub fn with_env(self) -> Self {
        self.with_env_lookup(|name| std::env::var(name).ok())
    }

    /// Overlay values from an arbitrary variable lookup.
    ///
    /// Empty values are ignored.
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(v) = get("SIGNER_PRIVATE_KEY") {
            self.signer_private_key = Some(v);
        }
        if let Some(v) = get("ENCRYPTION_KEY") {
            self.encryption_key = Some(v);
        }
        if let Some(v) = get("NEAR_RPC_URL") {
            self.ledger.rpc_url = v;
        }
        if let Some(v) = get("TASK_CONTRACT_ID") {
            self.ledger.contract_id = v;
        }
        if let Some(v) = get("EVIDENCE_GATEWAY_DOMAIN") {
            self.gateway.domain = v;
        }
        if let Some(v) = get("LLM_API_BASE") {
            self.describer.api_base = v;
        }
        if let Some(v) = get("LLM_API_KEY") {
            self.describer.api_key = v;
        }
        if let Some(v) = get("LLM_VISION_MODEL") {
            self.describer.model = v;
        }
        self
    }
}
