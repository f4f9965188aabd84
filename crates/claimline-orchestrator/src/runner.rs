//! Pipeline runner - drives one claim from extraction to a terminal state

use crate::config::OrchestratorConfig;
use crate::error::PipelineError;
use crate::metrics::PipelineMetrics;
use crate::starter::RunRequest;
use crate::state::RunState;
use claimline_agents::{DecisionOutcome, DecisionPipeline, Outcome};
use claimline_context::ContextAssembler;
use claimline_domain::events::{PIPELINE_FAILED, REVIEW_REQUESTED};
use claimline_domain::keys::claim_key;
use claimline_domain::traits::{EventBus, FieldUpdate, KeyValueStore, LlmProvider};
use claimline_domain::{fields, now_millis, ClaimId, ClaimRecord, ClaimStatus};
use claimline_gatekeeper::{FinalizeOutcome, PayoutGuard};
use claimline_intake::{DocumentProcessor, ProcessOutcome};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// How a run ended
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Claim that was run
    pub claim_id: ClaimId,
    /// Identifier of the run
    pub execution_id: String,
    /// Final state
    pub state: RunState,
    /// Every state the run passed through, in order
    pub history: Vec<RunState>,
    /// What the agents decided, if they ran
    pub decision: Option<DecisionOutcome>,
    /// Result of finalization, if the claim was finalized
    pub finalize: Option<FinalizeOutcome>,
    /// Why the run failed
    pub error: Option<String>,
}

impl RunReport {
    fn new(request: &RunRequest) -> Self {
        Self {
            claim_id: request.claim_id,
            execution_id: request.execution_id.clone(),
            state: RunState::Started,
            history: vec![RunState::Started],
            decision: None,
            finalize: None,
            error: None,
        }
    }

    fn advance(&mut self, next: RunState) -> Result<(), PipelineError> {
        if !self.state.can_transition_to(next) {
            return Err(PipelineError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        debug!("Claim {}: {} -> {}", self.claim_id, self.state, next);
        self.state = next;
        self.history.push(next);
        Ok(())
    }
}

/// Runs the pipeline steps for a claim in order
///
/// Transient step failures are retried with exponential backoff. A run that
/// still fails parks the claim in ERROR_REVIEW and publishes
/// `claimline.pipeline.failed`; nothing is left without a status.
pub struct PipelineRunner<L>
where
    L: LlmProvider,
{
    store: Arc<dyn KeyValueStore>,
    events: Arc<dyn EventBus>,
    processor: DocumentProcessor,
    assembler: ContextAssembler,
    decision: DecisionPipeline<L>,
    guard: PayoutGuard,
    config: OrchestratorConfig,
    metrics: Arc<PipelineMetrics>,
}

impl<L> PipelineRunner<L>
where
    L: LlmProvider + Send + Sync + 'static,
    L::Error: std::fmt::Display,
{
    /// Create a new runner
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        events: Arc<dyn EventBus>,
        processor: DocumentProcessor,
        assembler: ContextAssembler,
        decision: DecisionPipeline<L>,
        config: OrchestratorConfig,
        metrics: Arc<PipelineMetrics>,
    ) -> Result<Self, PipelineError> {
        config.validate().map_err(PipelineError::Config)?;
        Ok(Self {
            guard: PayoutGuard::new(store.clone(), events.clone()),
            store,
            events,
            processor,
            assembler,
            decision,
            config,
            metrics,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Shared metrics
    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }

    /// Run one claim to the end
    ///
    /// A failed run is reported as `Ok` with state [`RunState::Failed`] once
    /// the failure has been recorded on the claim. `Err` means even that
    /// could not be done.
    pub async fn run(&self, request: &RunRequest) -> Result<RunReport, PipelineError> {
        self.metrics.record_start();
        info!(
            "Run {} started for claim {}",
            request.execution_id, request.claim_id
        );

        let mut report = RunReport::new(request);
        match self.drive(request, &mut report).await {
            Ok(()) => {
                info!(
                    "Run {} for claim {} ended in {}",
                    request.execution_id, request.claim_id, report.state
                );
                Ok(report)
            }
            Err(err) => {
                self.fail(request, &mut report, &err).await?;
                Ok(report)
            }
        }
    }

    async fn drive(&self, request: &RunRequest, report: &mut RunReport) -> Result<(), PipelineError> {
        let claim_id = request.claim_id;
        let claim = self.load_claim(claim_id).await?;

        let processor = &self.processor;
        for document in &claim.received_documents {
            let outcome = self
                .with_retry(claim_id, "extract", || async move {
                    processor
                        .process_document(claim_id, document)
                        .map_err(PipelineError::from)
                })
                .await?;
            if let ProcessOutcome::Quarantined { doc_id, .. } = outcome {
                warn!("Document {} of claim {} was quarantined", doc_id, claim_id);
                self.metrics.record_quarantine();
            }
        }
        report.advance(RunState::Extracted)?;

        let assembler = &self.assembler;
        let started_at = request.started_at;
        let context = self
            .with_retry(claim_id, "assemble", || async move {
                assembler
                    .assemble(claim_id, started_at)
                    .map_err(PipelineError::from)
            })
            .await?;
        report.advance(RunState::ContextReady)?;

        self.update_claim(
            claim_id,
            vec![FieldUpdate::set(fields::STATUS, ClaimStatus::Processing.as_str())],
        )
        .await?;

        let decision = &self.decision;
        let bundle = &context.optimized;
        let outcome = self
            .with_retry(claim_id, "decide", || async move {
                decision
                    .run_decision(claim_id, bundle)
                    .await
                    .map_err(PipelineError::from)
            })
            .await?;
        self.metrics.record_fallbacks(outcome.fallbacks);
        report.advance(RunState::FraudScreened)?;
        if !outcome.adjudication_skipped {
            report.advance(RunState::Adjudicated)?;
        }

        self.update_claim(
            claim_id,
            vec![
                FieldUpdate::set(fields::RECOMMENDATION, outcome.outcome.as_str()),
                FieldUpdate::set(fields::DECISION_REASON, outcome.reason.clone()),
                FieldUpdate::set(fields::FRAUD_SCORE, outcome.fraud_score),
                FieldUpdate::set(
                    fields::RECOMMENDED_AMOUNT,
                    outcome.claimed_amount.unwrap_or(outcome.amount),
                ),
            ],
        )
        .await?;

        let needs_review = match outcome.outcome {
            Outcome::Review => true,
            Outcome::Approve => outcome.amount > self.config.hitl_amount_threshold,
            Outcome::Deny => false,
        };

        if needs_review {
            self.request_review(request, &outcome).await?;
            report.advance(RunState::AwaitingReview)?;
            self.metrics.record_review_requested();
        } else {
            let guard = &self.guard;
            let decided = outcome.outcome.as_str();
            let amount = outcome.amount;
            let finalize = self
                .with_retry(claim_id, "finalize", || async move {
                    guard
                        .finalize(claim_id, decided, amount)
                        .map_err(PipelineError::from)
                })
                .await?;
            if let FinalizeOutcome::Skipped(reason) = &finalize {
                info!("Finalization of claim {} skipped: {:?}", claim_id, reason);
            }
            report.finalize = Some(finalize);
            report.advance(RunState::Finalized)?;
            self.metrics.record_finalized();
        }

        report.decision = Some(outcome);
        Ok(())
    }

    async fn load_claim(&self, claim_id: ClaimId) -> Result<ClaimRecord, PipelineError> {
        let store = &self.store;
        let doc = self
            .with_retry(claim_id, "load", || async move {
                store.get(&claim_key(&claim_id)).map_err(PipelineError::from)
            })
            .await?
            .ok_or(PipelineError::ClaimNotFound(claim_id))?;
        Ok(ClaimRecord::from_document(&doc)?)
    }

    async fn update_claim(
        &self,
        claim_id: ClaimId,
        mut updates: Vec<FieldUpdate>,
    ) -> Result<(), PipelineError> {
        updates.push(FieldUpdate::set(fields::UPDATED_AT, now_millis()));
        let store = &self.store;
        let updates = &updates;
        self.with_retry(claim_id, "update", || async move {
            store
                .update(&claim_key(&claim_id), updates)
                .map(|_| ())
                .map_err(PipelineError::from)
        })
        .await
    }

    async fn request_review(
        &self,
        request: &RunRequest,
        outcome: &DecisionOutcome,
    ) -> Result<(), PipelineError> {
        let claim_id = request.claim_id;
        let reason = match outcome.outcome {
            Outcome::Approve => format!(
                "amount {:.2} exceeds review threshold {:.2}",
                outcome.amount, self.config.hitl_amount_threshold
            ),
            _ => outcome.reason.clone(),
        };

        self.update_claim(
            claim_id,
            vec![FieldUpdate::set(fields::STATUS, ClaimStatus::NeedsReview.as_str())],
        )
        .await?;

        info!("Claim {} needs review: {}", claim_id, reason);
        self.publish(
            REVIEW_REQUESTED,
            json!({
                "claim_id": claim_id.to_string(),
                "execution_id": request.execution_id,
                "recommendation": outcome.outcome.as_str(),
                "reason": reason,
                "amount": outcome.claimed_amount.unwrap_or(outcome.amount),
                "fraud_score": outcome.fraud_score,
            }),
        );
        Ok(())
    }

    async fn fail(
        &self,
        request: &RunRequest,
        report: &mut RunReport,
        err: &PipelineError,
    ) -> Result<(), PipelineError> {
        let claim_id = request.claim_id;
        let failed_in = report.state;
        if err.is_identity_corruption() {
            error!(
                "Identity corruption in run {} for claim {}: {}",
                request.execution_id, claim_id, err
            );
        } else {
            error!(
                "Run {} for claim {} failed after {}: {}",
                request.execution_id, claim_id, failed_in, err
            );
        }

        report.error = Some(err.to_string());
        if report.state.can_transition_to(RunState::Failed) {
            report.advance(RunState::Failed)?;
        } else {
            report.state = RunState::Failed;
            report.history.push(RunState::Failed);
        }
        self.metrics.record_failure();

        // A missing claim has no record to park
        if !matches!(err, PipelineError::ClaimNotFound(_)) {
            self.update_claim(
                claim_id,
                vec![
                    FieldUpdate::set(fields::STATUS, ClaimStatus::ErrorReview.as_str()),
                    FieldUpdate::set(fields::ERROR_REASON, err.to_string()),
                ],
            )
            .await?;
        }

        self.publish(
            PIPELINE_FAILED,
            json!({
                "claim_id": claim_id.to_string(),
                "execution_id": request.execution_id,
                "failed_after": failed_in.as_str(),
                "error": err.to_string(),
                "identity_corruption": err.is_identity_corruption(),
            }),
        );
        Ok(())
    }

    /// Notifications never fail a run
    fn publish(&self, topic: &str, payload: Value) {
        if let Err(e) = self.events.publish(topic, payload) {
            warn!("Failed to publish {}: {}", topic, e);
        }
    }

    async fn with_retry<T, F, Fut>(
        &self,
        claim_id: ClaimId,
        step: &str,
        mut op: F,
    ) -> Result<T, PipelineError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, PipelineError>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.config.max_step_attempts => {
                    let delay = self.config.step_backoff(attempt);
                    warn!(
                        "Step {} for claim {} failed (attempt {}/{}), retrying in {:?}: {}",
                        step, claim_id, attempt, self.config.max_step_attempts, delay, e
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
