//! Decision sequencing: summarize, screen for fraud, adjudicate

use crate::error::AgentError;
use crate::invoker::{AgentInvocation, AgentInvoker};
use crate::prompt::PromptFields;
use crate::validate::{EXTRACTED_FACTS_KEY, SUMMARY_KEY};
use claimline_domain::traits::LlmProvider;
use claimline_domain::{AgentKind, ClaimId, ContextBundle, Decision};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

/// Keys checked in the extracted facts for the claimed amount
const AMOUNT_KEYS: [&str; 2] = ["total_amount", "invoice_total"];

/// Final outcome of the decision agents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    /// Pay the claimed amount
    Approve,
    /// Close without payment
    Deny,
    /// Hand to a human reviewer
    Review,
}

impl Outcome {
    /// Decision string recorded as the AI recommendation
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Approve => "APPROVE",
            Outcome::Deny => "DENY",
            Outcome::Review => "REVIEW",
        }
    }
}

/// Everything the decision step learned about a claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionOutcome {
    /// Final outcome
    pub outcome: Outcome,
    /// Amount to pay; zero unless the outcome is `Approve`
    pub amount: f64,
    /// Amount found by the summarization agent, if any
    pub claimed_amount: Option<f64>,
    /// Fraud score from the screen
    pub fraud_score: f64,
    /// Decision of the fraud agent
    pub fraud_decision: Decision,
    /// Decision of the adjudication agent, if it ran
    pub adjudication_decision: Option<Decision>,
    /// Whether the fraud screen stopped adjudication
    pub adjudication_skipped: bool,
    /// Reason given by the deciding agent
    pub reason: String,
    /// Rationale given by the deciding agent
    pub rationale: Option<String>,
    /// Summary produced before screening
    pub summary: Option<String>,
    /// Invocations that ended in a fallback result
    pub fallbacks: u32,
}

/// Parse an amount such as `1250.5`, `"$1,250.50"` or `"£900"`
///
/// # Examples
///
/// ```
/// use claimline_agents::parse_amount;
/// use serde_json::json;
///
/// assert_eq!(parse_amount(&json!("$1,250.50")), Some(1250.5));
/// assert_eq!(parse_amount(&json!(900)), Some(900.0));
/// assert_eq!(parse_amount(&json!("unknown")), None);
/// ```
pub fn parse_amount(value: &Value) -> Option<f64> {
    let amount = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s
            .chars()
            .filter(|c| !matches!(c, '$' | '£' | '€' | ',') && !c.is_whitespace())
            .collect::<String>()
            .parse()
            .ok()?,
        _ => return None,
    };
    amount.is_finite().then_some(amount)
}

/// Runs the agents for one claim in order
pub struct DecisionPipeline<L>
where
    L: LlmProvider,
{
    invoker: AgentInvoker<L>,
}

impl<L> DecisionPipeline<L>
where
    L: LlmProvider + Send + Sync + 'static,
    L::Error: std::fmt::Display,
{
    /// Create a pipeline around an invoker
    pub fn new(invoker: AgentInvoker<L>) -> Self {
        Self { invoker }
    }

    /// The underlying invoker
    pub fn invoker(&self) -> &AgentInvoker<L> {
        &self.invoker
    }

    /// Decide a claim from its optimized bundle
    ///
    /// Fraud always runs. A score above the threshold or a stopping
    /// decision skips adjudication and withholds the payout.
    pub async fn run_decision(
        &self,
        claim_id: ClaimId,
        bundle: &ContextBundle,
    ) -> Result<DecisionOutcome, AgentError> {
        let config = self.invoker.config();
        let mut fields = PromptFields {
            claim_id: claim_id.to_string(),
            claim_documents: bundle.render_documents(),
            claim_metadata: serde_json::to_string(&bundle.metadata)?,
            claim_summary: String::new(),
        };
        let mut fallbacks = 0;

        let mut summary = None;
        let mut claimed_amount = None;
        if config.summarize {
            let invocation = self
                .invoker
                .invoke_agent(AgentKind::Summarization, claim_id, &fields)
                .await?;
            fallbacks += u32::from(invocation.fell_back);
            let (text, amount) = read_summary(&invocation);
            fields.claim_summary = text.clone();
            summary = Some(text);
            claimed_amount = amount;
        }

        let fraud = self
            .invoker
            .invoke_agent(AgentKind::Fraud, claim_id, &fields)
            .await?;
        fallbacks += u32::from(fraud.fell_back);
        let fraud_decision = fraud.result.decision;
        let fraud_score = fraud.result.fraud_score().unwrap_or(1.0);

        let stops = matches!(
            fraud_decision,
            Decision::Stop | Decision::Hitl | Decision::Deny | Decision::Blocked | Decision::Flagged
        );
        if fraud_score > config.fraud_threshold || stops {
            let outcome = if fraud_decision == Decision::Deny {
                Outcome::Deny
            } else {
                Outcome::Review
            };
            warn!(
                "Fraud screen stopped claim {}: decision {}, score {:.2}",
                claim_id, fraud_decision, fraud_score
            );
            return Ok(DecisionOutcome {
                outcome,
                amount: 0.0,
                claimed_amount,
                fraud_score,
                fraud_decision,
                adjudication_decision: None,
                adjudication_skipped: true,
                reason: fraud.result.reason,
                rationale: fraud.result.rationale,
                summary,
                fallbacks,
            });
        }

        let adjudication = self
            .invoker
            .invoke_agent(AgentKind::Adjudication, claim_id, &fields)
            .await?;
        fallbacks += u32::from(adjudication.fell_back);
        let decision = adjudication.result.decision;

        let mut reason = adjudication.result.reason;
        let (outcome, amount) = match (decision, claimed_amount) {
            (Decision::Approve, Some(amount)) => (Outcome::Approve, amount),
            (Decision::Approve, None) => {
                // Nothing to pay from, so a person sets the amount
                warn!(
                    "Claim {} approved without a claimed amount, sending to review",
                    claim_id
                );
                reason = format!("Approved without a claimed amount: {}", reason);
                (Outcome::Review, 0.0)
            }
            (Decision::Deny, _) => (Outcome::Deny, 0.0),
            _ => (Outcome::Review, 0.0),
        };

        info!(
            "Decision for claim {}: {} (fraud {:.2}, adjudication {}, amount {:.2})",
            claim_id,
            outcome.as_str(),
            fraud_score,
            decision,
            amount
        );

        Ok(DecisionOutcome {
            outcome,
            amount,
            claimed_amount,
            fraud_score,
            fraud_decision,
            adjudication_decision: Some(decision),
            adjudication_skipped: false,
            reason,
            rationale: adjudication.result.rationale,
            summary,
            fallbacks,
        })
    }
}

/// Summary text for later prompts and the claimed amount, if stated
fn read_summary(invocation: &AgentInvocation) -> (String, Option<f64>) {
    let findings = invocation.result.structured_findings.as_ref();

    let text = match invocation.result.finding_str(SUMMARY_KEY) {
        Some(summary) => summary.to_string(),
        None => findings
            .map(|f| Value::Object(f.clone()).to_string())
            .unwrap_or_default(),
    };

    let amount = findings
        .and_then(|f| f.get(EXTRACTED_FACTS_KEY))
        .and_then(|facts| {
            AMOUNT_KEYS
                .iter()
                .filter_map(|key| facts.get(*key))
                .find(|v| !v.is_null())
        })
        .and_then(parse_amount);

    (text, amount)
}
