//! Ledger integration: task records and the read-only query interface.
//!
//! The ledger is authoritative. Every verification re-reads it; nothing in
//! this module caches task state.

pub mod accounts;
pub mod near_rpc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

pub use accounts::AccountDirectory;
pub use near_rpc::NearRpcLedger;

/// Task lifecycle as recorded by the contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TaskStatus {
    Pending = 0,
    Verified = 1,
}

impl TryFrom<u8> for TaskStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TaskStatus::Pending),
            1 => Ok(TaskStatus::Verified),
            other => Err(format!("unknown task status {}", other)),
        }
    }
}

impl From<TaskStatus> for u8 {
    fn from(status: TaskStatus) -> Self {
        status as u8
    }
}

/// Snapshot of a task as returned by `get_task`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub status: TaskStatus,
    /// Stored verification result, present once verified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Producer-chosen evidence reference (e.g. `storj-<cid>`)
    #[serde(default)]
    pub evidence: String,
}

impl Task {
    pub fn pending(id: u64, evidence: impl Into<String>) -> Self {
        Self {
            id,
            status: TaskStatus::Pending,
            result: None,
            evidence: evidence.into(),
        }
    }

    pub fn verified(id: u64, result: serde_json::Value) -> Self {
        Self {
            id,
            status: TaskStatus::Verified,
            result: Some(result),
            evidence: String::new(),
        }
    }

    pub fn is_verified(&self) -> bool {
        self.status == TaskStatus::Verified
    }
}

/// Read-only ledger query by task id.
///
/// `Ok(None)` means the ledger has no such task.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    async fn get_task(&self, task_id: u64) -> Result<Option<Task>, LedgerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_deserialization() {
        let json = r#"{"id": 42, "status": 0, "result": null, "evidence": "storj-CIDXYZ"}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task, Task::pending(42, "storj-CIDXYZ"));
        assert!(!task.is_verified());

        let json = r#"{"id": 7, "status": 1, "result": "ok", "evidence": "storj-x"}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert!(task.is_verified());
        assert_eq!(task.result, Some(serde_json::json!("ok")));
    }

    #[test]
    fn test_missing_optional_fields() {
        let task: Task = serde_json::from_str(r#"{"id": 1, "status": 0}"#).unwrap();
        assert!(task.result.is_none());
        assert!(task.evidence.is_empty());
    }

    #[test]
    fn test_unknown_status_rejected() {
        let result: Result<Task, _> = serde_json::from_str(r#"{"id": 1, "status": 2}"#);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("unknown task status"));
    }

    #[test]
    fn test_status_serializes_as_number() {
        assert_eq!(serde_json::to_string(&TaskStatus::Verified).unwrap(), "1");
        assert_eq!(serde_json::to_string(&TaskStatus::Pending).unwrap(), "0");
    }
}
