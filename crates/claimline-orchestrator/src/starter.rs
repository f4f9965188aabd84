//! In-process workflow starter

use claimline_domain::traits::{StartOutcome, WorkflowStarter};
use claimline_domain::{now_millis, ClaimId, ServiceError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

/// A run handed to the worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    /// Claim to run
    pub claim_id: ClaimId,
    /// Identifier of this run
    pub execution_id: String,
    /// When the run was started (epoch millis); older extracts are ignored
    pub started_at: u64,
    /// Input supplied by the caller
    pub input: Value,
}

/// Bookkeeping for one started run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionInfo {
    /// Identifier of the run
    pub execution_id: String,
    /// When it was started (epoch millis)
    pub started_at: u64,
}

/// Starts at most one run per claim and queues it for the worker
///
/// The dedup key is the claim id. Once a run has been accepted for a claim,
/// later starts report [`StartOutcome::AlreadyRunning`] for the lifetime of
/// the starter.
pub struct LocalWorkflowStarter {
    executions: Mutex<HashMap<String, ExecutionInfo>>,
    sender: mpsc::Sender<RunRequest>,
}

impl LocalWorkflowStarter {
    /// Create a starter and the queue the worker reads from
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<RunRequest>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let starter = Self {
            executions: Mutex::new(HashMap::new()),
            sender,
        };
        (starter, receiver)
    }

    /// The run started for a claim, if any
    pub fn execution(&self, claim_id: &ClaimId) -> Option<ExecutionInfo> {
        self.executions
            .lock()
            .ok()
            .and_then(|map| map.get(&claim_id.to_string()).cloned())
    }
}

impl WorkflowStarter for LocalWorkflowStarter {
    fn start(&self, dedup_key: &str, input: Value) -> Result<StartOutcome, ServiceError> {
        let claim_id = ClaimId::from_string(dedup_key).map_err(ServiceError::Rejected)?;

        let mut executions = self
            .executions
            .lock()
            .map_err(|_| ServiceError::Unavailable("execution map lock poisoned".into()))?;
        if executions.contains_key(dedup_key) {
            debug!("Run for {} already started", dedup_key);
            return Ok(StartOutcome::AlreadyRunning);
        }

        let info = ExecutionInfo {
            execution_id: uuid::Uuid::new_v4().to_string(),
            started_at: now_millis(),
        };
        let request = RunRequest {
            claim_id,
            execution_id: info.execution_id.clone(),
            started_at: info.started_at,
            input,
        };

        self.sender.try_send(request).map_err(|e| match e {
            TrySendError::Full(_) => ServiceError::Throttled("run queue is full".into()),
            TrySendError::Closed(_) => ServiceError::Unavailable("worker has stopped".into()),
        })?;

        let execution_id = info.execution_id.clone();
        executions.insert(dedup_key.to_string(), info);
        Ok(StartOutcome::Accepted { execution_id })
    }
}
