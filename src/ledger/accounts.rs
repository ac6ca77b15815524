//! Account directory lookup (public key → account ids)
//!
//! Used once at startup to name the signer account in logs and CLI output.

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::LedgerConfig;
use crate::crypto::SignerIdentity;
use crate::error::LedgerError;

#[derive(Debug, Deserialize)]
struct PublicKeyAccounts {
    #[serde(default)]
    account_ids: Vec<String>,
}

pub struct AccountDirectory {
    base_url: String,
    client: Client,
}

impl AccountDirectory {
    pub fn new(config: &LedgerConfig) -> Result<Self, LedgerError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| LedgerError::Transport(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            base_url: config.account_api.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// First account id registered for a base58 `public_key`
    pub async fn account_for_key(&self, public_key: &str) -> Result<Option<String>, LedgerError> {
        let url = format!("{}/v0/public_key/{}", self.base_url, public_key);
        debug!("Resolving account for key via {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LedgerError::Transport(format!(
                "Account directory returned error: {}",
                response.status()
            )));
        }

        let accounts: PublicKeyAccounts = response
            .json()
            .await
            .map_err(|e| LedgerError::Rpc(format!("Failed to parse account list: {}", e)))?;

        Ok(accounts.account_ids.into_iter().next())
    }

    /// Fill in the identity's account id
    pub async fn resolve(&self, identity: SignerIdentity) -> Result<SignerIdentity, LedgerError> {
        let account_id = self.account_for_key(&identity.public_key).await?;
        Ok(identity.with_account_id(account_id))
    }
}
