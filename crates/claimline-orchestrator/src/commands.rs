//! Line-oriented commands accepted by the worker binary

use crate::error::PipelineError;
use crate::metrics::PipelineMetrics;
use crate::starter::LocalWorkflowStarter;
use claimline_gatekeeper::{FinalizeOutcome, ReviewDesk, ReviewRequest};
use claimline_intake::{ClaimQueries, Intake, TriggerOutcome, UploadOutcome, UploadRequest};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// One JSON line of worker input, tagged by `type`
///
/// ```json
/// {"type": "upload", "external_id": "CLM-1", "path": "fnol.txt", "doc_type": "FNOL_FORM"}
/// {"type": "review", "claim_id": "...", "reviewer_id": "r1", "decision": "APPROVE", "justification": "..."}
/// {"type": "status", "external_id": "CLM-1"}
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerCommand {
    /// Upload a local file as a claim document
    Upload(UploadCommand),
    /// Submit a human decision
    Review(ReviewRequest),
    /// Look up a claim by its external number
    Status {
        /// External claim number
        external_id: String,
    },
}

/// A local file to upload
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadCommand {
    /// External claim number
    pub external_id: String,
    /// File to read
    pub path: PathBuf,
    /// Document type as supplied by the caller
    pub doc_type: String,
    /// MIME type; guessed from the file name when absent
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Intake channel
    #[serde(default)]
    pub channel: Option<String>,
}

/// Dispatches worker commands to intake, review and queries
pub struct CommandHandler {
    intake: Intake,
    desk: ReviewDesk,
    queries: ClaimQueries,
    starter: Arc<LocalWorkflowStarter>,
    metrics: Arc<PipelineMetrics>,
}

impl CommandHandler {
    /// Create a new handler
    pub fn new(
        intake: Intake,
        desk: ReviewDesk,
        queries: ClaimQueries,
        starter: Arc<LocalWorkflowStarter>,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            intake,
            desk,
            queries,
            starter,
            metrics,
        }
    }

    /// Handle one input line and produce one output line
    ///
    /// Failures are reported in the response as `{"ok": false, "error": ...}`
    /// so that one bad line never stops the worker.
    pub fn handle_line(&self, line: &str) -> Value {
        let command: WorkerCommand = match serde_json::from_str(line) {
            Ok(command) => command,
            Err(e) => {
                warn!("Ignoring malformed command: {}", e);
                return json!({ "ok": false, "error": format!("Malformed command: {}", e) });
            }
        };
        debug!("Command: {:?}", command);

        match self.handle(&command) {
            Ok(response) => response,
            Err(e) => {
                warn!("Command failed: {}", e);
                json!({ "ok": false, "error": e.to_string(), "retryable": e.is_retryable() })
            }
        }
    }

    /// Handle one parsed command
    pub fn handle(&self, command: &WorkerCommand) -> Result<Value, PipelineError> {
        match command {
            WorkerCommand::Upload(upload) => self.upload(upload),
            WorkerCommand::Review(request) => self.review(request),
            WorkerCommand::Status { external_id } => self.status(external_id),
        }
    }

    fn upload(&self, upload: &UploadCommand) -> Result<Value, PipelineError> {
        let body = std::fs::read(&upload.path).map_err(|e| {
            PipelineError::Worker(format!("Failed to read {}: {}", upload.path.display(), e))
        })?;
        let filename = upload
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let source_key = self.intake.stage_upload(&upload.external_id, &filename, &body)?;
        let outcome = self.intake.accept_upload(&UploadRequest {
            external_id: upload.external_id.clone(),
            source_key,
            doc_type: upload.doc_type.clone(),
            mime_type: upload.mime_type.clone(),
            channel: upload.channel.clone(),
        })?;

        Ok(match outcome {
            UploadOutcome::Accepted {
                claim_id,
                document,
                received,
                trigger,
            } => {
                let (trigger, execution_id) = match trigger {
                    TriggerOutcome::NotReady => ("not_ready", None),
                    TriggerOutcome::Started { execution_id } => ("started", Some(execution_id)),
                    TriggerOutcome::AlreadyRunning => ("already_running", None),
                };
                json!({
                    "ok": true,
                    "result": "accepted",
                    "claim_id": claim_id.to_string(),
                    "doc_id": document.doc_id,
                    "document_type": document.document_type.as_str(),
                    "received": received.len(),
                    "trigger": trigger,
                    "execution_id": execution_id,
                })
            }
            UploadOutcome::Quarantined {
                claim_id,
                quarantine_key,
                reason,
            } => {
                self.metrics.record_quarantine();
                json!({
                    "ok": true,
                    "result": "quarantined",
                    "claim_id": claim_id.to_string(),
                    "quarantine_key": quarantine_key,
                    "reason": reason,
                })
            }
        })
    }

    fn review(&self, request: &ReviewRequest) -> Result<Value, PipelineError> {
        let outcome = self.desk.submit_review(request)?;
        self.metrics.record_review_completed();

        let (finalize, amount) = match &outcome.finalize {
            FinalizeOutcome::Recorded(record) => ("recorded", Some(record.amount)),
            FinalizeOutcome::Skipped(_) => ("skipped", None),
        };
        Ok(json!({
            "ok": true,
            "claim_id": request.claim_id.to_string(),
            "ai_agreement": outcome.ai_agreement,
            "finalize": finalize,
            "amount": amount,
        }))
    }

    fn status(&self, external_id: &str) -> Result<Value, PipelineError> {
        let Some(claim) = self.queries.status_by_external_id(external_id)? else {
            return Ok(json!({ "ok": false, "error": format!("Unknown claim '{}'", external_id) }));
        };
        let execution_id = self
            .starter
            .execution(&claim.claim_id)
            .map(|info| info.execution_id);
        Ok(json!({
            "ok": true,
            "claim": claim,
            "execution_id": execution_id,
        }))
    }
}
