//! Evidence retrieval from a content-addressed gateway
//!
//! Single attempt, bounded timeout. A failed fetch is returned to the
//! caller immediately; nothing here loops or caches.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::GatewayConfig;
use crate::error::FetchError;

/// Retrieval policy.
///
/// Always exactly one attempt; only the timeout is tunable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    pub timeout: Duration,
}

impl FetchPolicy {
    /// Attempts per fetch. There is no retry at this layer.
    pub const ATTEMPTS: u32 = 1;

    pub fn fail_fast(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn attempts(&self) -> u32 {
        Self::ATTEMPTS
    }
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self::fail_fast(Duration::from_secs(10))
    }
}

/// Anything that can hand back the bytes behind a resolved URL
#[async_trait]
pub trait EvidenceSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// HTTP(S) gateway client
pub struct GatewayFetcher {
    client: Client,
    policy: FetchPolicy,
}

impl GatewayFetcher {
    pub fn new(policy: FetchPolicy) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(policy.timeout)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { client, policy })
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self, FetchError> {
        Self::new(FetchPolicy::fail_fast(config.timeout()))
    }

    pub fn policy(&self) -> FetchPolicy {
        self.policy
    }
}

#[async_trait]
impl EvidenceSource for GatewayFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        debug!("Fetching evidence from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Gateway returned {} for {}", status, url);
            return Err(FetchError::Retrieval {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(url, e))?;

        debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body.to_vec())
    }
}

fn transport_error(url: &str, e: reqwest::Error) -> FetchError {
    let message = if e.is_timeout() {
        "request timed out".to_string()
    } else {
        e.to_string()
    };
    FetchError::Transport {
        url: url.to_string(),
        message,
    }
}
