//! Human review of claims the pipeline would not decide alone

use crate::error::GatekeeperError;
use crate::payout::{FinalizeOutcome, PayoutGuard};
use crate::terminal::map_decision;
use claimline_domain::events::REVIEW_COMPLETED;
use claimline_domain::keys::claim_key;
use claimline_domain::traits::{EventBus, FieldUpdate, KeyValueStore};
use claimline_domain::{fields, now_millis, ClaimId, ClaimRecord, ClaimStatus};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

/// Decisions a reviewer may submit
pub const REVIEW_DECISIONS: [&str; 3] = ["APPROVE", "DENY", "FLAGGED"];

/// Shortest accepted justification, in characters after trimming
pub const MIN_JUSTIFICATION_CHARS: usize = 10;

/// A human decision on a claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRequest {
    /// Claim being decided
    pub claim_id: ClaimId,
    /// Who decided it
    pub reviewer_id: String,
    /// APPROVE, DENY or FLAGGED
    pub decision: String,
    /// Why
    pub justification: String,
    /// Amount to pay on approval; the recommended amount when absent
    #[serde(default)]
    pub amount: Option<f64>,
}

/// What a review did
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewOutcome {
    /// Whether the reviewer agreed with the AI recommendation
    pub ai_agreement: bool,
    /// Result of finalizing the claim
    pub finalize: FinalizeOutcome,
}

/// Accepts human decisions for claims in NEEDS_REVIEW or ERROR_REVIEW
pub struct ReviewDesk {
    store: Arc<dyn KeyValueStore>,
    events: Arc<dyn EventBus>,
    guard: PayoutGuard,
}

impl ReviewDesk {
    /// Create a new review desk
    pub fn new(store: Arc<dyn KeyValueStore>, events: Arc<dyn EventBus>) -> Self {
        let guard = PayoutGuard::new(store.clone(), events.clone());
        Self { store, events, guard }
    }

    /// Record a human decision and close the claim with it
    ///
    /// Validation happens before any write. A claim that is already closed
    /// is passed straight to the payout guard, which skips it, so a
    /// redelivered review is harmless.
    pub fn submit_review(&self, request: &ReviewRequest) -> Result<ReviewOutcome, GatekeeperError> {
        let claim_id = request.claim_id;
        let decision = request.decision.trim().to_uppercase();
        if !REVIEW_DECISIONS.contains(&decision.as_str()) {
            return Err(GatekeeperError::InvalidReview(format!(
                "decision '{}' is not one of {}",
                request.decision,
                REVIEW_DECISIONS.join(", ")
            )));
        }
        if request.reviewer_id.trim().is_empty() {
            return Err(GatekeeperError::InvalidReview("reviewer_id is required".into()));
        }
        let justification = request.justification.trim();
        if justification.chars().count() < MIN_JUSTIFICATION_CHARS {
            return Err(GatekeeperError::InvalidReview(format!(
                "justification must be at least {} characters",
                MIN_JUSTIFICATION_CHARS
            )));
        }

        let doc = self
            .store
            .get(&claim_key(&claim_id))?
            .ok_or(GatekeeperError::ClaimNotFound(claim_id))?;
        let claim = ClaimRecord::from_document(&doc)?;

        let ai_agreement = agrees_with(claim.recommendation.as_deref(), &decision);

        match claim.status {
            ClaimStatus::NeedsReview | ClaimStatus::ErrorReview => {}
            status if status.is_terminal() => {
                info!("Claim {} is already {}, review ignored", claim_id, status);
                let finalize = self.guard.finalize(claim_id, &decision, 0.0)?;
                return Ok(ReviewOutcome { ai_agreement, finalize });
            }
            status => {
                return Err(GatekeeperError::InvalidReview(format!(
                    "claim {} is {}, not awaiting review",
                    claim_id, status
                )))
            }
        }

        self.store.update(
            &claim_key(&claim_id),
            &[
                FieldUpdate::set(fields::REVIEWER_ID, request.reviewer_id.trim()),
                FieldUpdate::set(fields::REVIEW_JUSTIFICATION, justification),
                FieldUpdate::set(fields::AI_AGREEMENT, ai_agreement),
                FieldUpdate::set(fields::UPDATED_AT, now_millis()),
            ],
        )?;

        let amount = request
            .amount
            .or(claim.recommended_amount)
            .unwrap_or(0.0);
        let finalize = self.guard.finalize(claim_id, &decision, amount)?;

        info!(
            "Review of claim {} by {}: {} (agrees with AI: {})",
            claim_id, request.reviewer_id, decision, ai_agreement
        );

        let payload = json!({
            "claim_id": claim_id.to_string(),
            "reviewer_id": request.reviewer_id.trim(),
            "decision": decision,
            "ai_agreement": ai_agreement,
        });
        if let Err(e) = self.events.publish(REVIEW_COMPLETED, payload) {
            warn!("Failed to publish {} for claim {}: {}", REVIEW_COMPLETED, claim_id, e);
        }

        Ok(ReviewOutcome { ai_agreement, finalize })
    }
}

/// Whether a human decision lands on the same terminal state as the AI's
fn agrees_with(recommendation: Option<&str>, decision: &str) -> bool {
    match (recommendation.map(map_decision), map_decision(decision)) {
        (Some(Ok(ai)), Ok(human)) => ai == human,
        _ => false,
    }
}
