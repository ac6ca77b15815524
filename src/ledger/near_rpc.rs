//! NEAR JSON-RPC ledger reader
//!
//! Tasks are read with a `call_function` view query against the task
//! contract. View calls need no signature, so the signer key never leaves
//! the process here.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use super::{LedgerReader, Task};
use crate::config::LedgerConfig;
use crate::error::LedgerError;

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'a str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    result: Option<serde_json::Value>,
    error: Option<serde_json::Value>,
}

/// Result of a `call_function` query
#[derive(Deserialize)]
struct CallFunctionResult {
    #[serde(default)]
    result: Option<Vec<u8>>,
    #[serde(default)]
    error: Option<String>,
}

pub struct NearRpcLedger {
    url: String,
    contract_id: String,
    method: String,
    client: Client,
    request_id: AtomicU64,
}

impl NearRpcLedger {
    pub fn new(config: &LedgerConfig) -> Result<Self, LedgerError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| LedgerError::Transport(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            url: config.rpc_url.clone(),
            contract_id: config.contract_id.clone(),
            method: config.get_task_method.clone(),
            client,
            request_id: AtomicU64::new(1),
        })
    }

    pub fn contract_id(&self) -> &str {
        &self.contract_id
    }

    async fn call(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value, LedgerError> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LedgerError::Transport(format!("RPC HTTP error: {}", status)));
        }

        let rpc_response: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::Rpc(format!("Failed to parse RPC response: {}", e)))?;

        if let Some(err) = rpc_response.error {
            return Err(LedgerError::Rpc(describe_rpc_error(&err)));
        }

        rpc_response
            .result
            .ok_or_else(|| LedgerError::Rpc("RPC response missing result".to_string()))
    }

    /// Run a view function and return the raw bytes it produced
    pub async fn view_function(
        &self,
        method_name: &str,
        args: &serde_json::Value,
    ) -> Result<Vec<u8>, LedgerError> {
        let params = serde_json::json!({
            "request_type": "call_function",
            "finality": "final",
            "account_id": self.contract_id,
            "method_name": method_name,
            "args_base64": STANDARD.encode(args.to_string()),
        });

        let result = self.call("query", params).await?;
        let call: CallFunctionResult = serde_json::from_value(result)
            .map_err(|e| LedgerError::Rpc(format!("Unexpected query result: {}", e)))?;

        if let Some(err) = call.error {
            return Err(LedgerError::Rpc(err));
        }
        call.result
            .ok_or_else(|| LedgerError::Rpc("query result missing return value".to_string()))
    }
}

#[async_trait]
impl LedgerReader for NearRpcLedger {
    async fn get_task(&self, task_id: u64) -> Result<Option<Task>, LedgerError> {
        debug!("Querying {}::{} id={}", self.contract_id, self.method, task_id);

        let bytes = self
            .view_function(&self.method, &serde_json::json!({ "id": task_id }))
            .await?;
        parse_task(&bytes)
    }
}

/// Decode a `get_task` return value. JSON `null` (or nothing) means not found.
pub fn parse_task(bytes: &[u8]) -> Result<Option<Task>, LedgerError> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(None);
    }
    serde_json::from_slice::<Option<Task>>(bytes)
        .map_err(|e| LedgerError::InvalidRecord(e.to_string()))
}

fn describe_rpc_error(err: &serde_json::Value) -> String {
    let cause = err
        .pointer("/cause/name")
        .and_then(|v| v.as_str());
    let message = err
        .get("data")
        .and_then(|v| v.as_str())
        .or_else(|| err.get("message").and_then(|v| v.as_str()));

    match (cause, message) {
        (Some(cause), Some(message)) => format!("{}: {}", cause, message),
        (Some(cause), None) => cause.to_string(),
        (None, Some(message)) => message.to_string(),
        (None, None) => err.to_string(),
    }
}
