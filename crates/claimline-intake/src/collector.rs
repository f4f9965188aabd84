//! Ingestion Collector: records received documents and starts runs

use crate::error::IntakeError;
use crate::policy::TriggerPolicy;
use claimline_domain::keys::claim_key;
use claimline_domain::traits::{FieldUpdate, KeyValueStore, StartOutcome, WorkflowStarter};
use claimline_domain::{fields, now_millis, ClaimId, ClaimStatus, DocumentRef};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

/// Result of a trigger check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The packet is not complete yet
    NotReady,
    /// A new run was started
    Started {
        /// Identifier of the new run
        execution_id: String,
    },
    /// A run already exists for this claim; nothing to do
    AlreadyRunning,
}

/// Tracks the documents of each claim and decides when to start a run
pub struct Collector {
    store: Arc<dyn KeyValueStore>,
    starter: Arc<dyn WorkflowStarter>,
    policy: TriggerPolicy,
}

impl Collector {
    /// Create a new collector
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        starter: Arc<dyn WorkflowStarter>,
        policy: TriggerPolicy,
    ) -> Self {
        Self {
            store,
            starter,
            policy,
        }
    }

    /// Get the trigger policy
    pub fn policy(&self) -> &TriggerPolicy {
        &self.policy
    }

    /// Record a document against its claim and return the received set
    ///
    /// A single atomic update: the claim is created in INTAKE on first
    /// sight, and the reference is added with set semantics so a duplicate
    /// delivery leaves the set unchanged.
    pub fn record_document(
        &self,
        claim_id: ClaimId,
        external_id: &str,
        document: &DocumentRef,
        channel: &str,
    ) -> Result<Vec<DocumentRef>, IntakeError> {
        let document = DocumentRef {
            channel: channel.to_string(),
            ..document.clone()
        };
        let now = now_millis();

        let updates = [
            FieldUpdate::set_if_absent(fields::CLAIM_ID, claim_id.to_string()),
            FieldUpdate::set_if_absent(fields::STATUS, ClaimStatus::Intake.as_str()),
            FieldUpdate::set_if_absent(fields::EXTERNAL_ID, external_id),
            FieldUpdate::set_if_absent(fields::CREATED_AT, now),
            FieldUpdate::set(fields::UPDATED_AT, now),
            FieldUpdate::add_to_set(fields::RECEIVED_DOCUMENTS, serde_json::to_value(&document)?),
        ];

        let stored = self.store.update(&claim_key(&claim_id), &updates)?;
        let received: Vec<DocumentRef> = match stored.get(fields::RECEIVED_DOCUMENTS) {
            Some(value) => serde_json::from_value(value.clone())?,
            None => Vec::new(),
        };

        debug!(
            "Claim {} now holds {} documents after {}",
            claim_id,
            received.len(),
            document.doc_id
        );
        Ok(received)
    }

    /// Start a run if the snapshot satisfies the trigger policy
    ///
    /// The claim id is the dedup key, so racing triggers start one run.
    pub fn maybe_trigger_pipeline(
        &self,
        claim_id: ClaimId,
        received: &[DocumentRef],
    ) -> Result<TriggerOutcome, IntakeError> {
        if !self.policy.is_satisfied(received) {
            debug!("Claim {} not ready ({} documents)", claim_id, received.len());
            return Ok(TriggerOutcome::NotReady);
        }

        let input = json!({
            "claim_id": claim_id.to_string(),
            "documents": received,
        });

        match self.starter.start(&claim_id.to_string(), input)? {
            StartOutcome::Accepted { execution_id } => {
                info!("Started run {} for claim {}", execution_id, claim_id);
                Ok(TriggerOutcome::Started { execution_id })
            }
            StartOutcome::AlreadyRunning => {
                debug!("Run for claim {} already exists", claim_id);
                Ok(TriggerOutcome::AlreadyRunning)
            }
        }
    }
}
