//! Agent invocation with a retry budget and safe fallbacks

use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::parser::parse_agent_output;
use crate::prompt::{substitute, PromptFields, PromptLibrary};
use crate::validate::{validate_result, SUMMARY_KEY};
use claimline_domain::agent::FRAUD_SCORE_KEY;
use claimline_domain::keys::{audit_key, evaluation_key};
use claimline_domain::traits::{Document, KeyValueStore, LlmProvider};
use claimline_domain::{now_millis, AgentKind, AgentResult, ClaimId};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Outcome of one agent invocation
#[derive(Debug, Clone, PartialEq)]
pub struct AgentInvocation {
    /// Validated result, or the fallback
    pub result: AgentResult,
    /// Model calls made
    pub attempts: u32,
    /// Whether the retry budget ran out and the fallback was used
    pub fell_back: bool,
}

/// Result used when no attempt produced a valid answer
///
/// Screening fails open with a maximal fraud score so the claim still goes
/// to review; adjudication fails closed.
pub fn fallback_result(kind: AgentKind, attempts: u32) -> AgentResult {
    let mut result = AgentResult::new(
        kind.default_decision(),
        format!("No valid output after {} attempts", attempts),
    );
    let finding = match kind {
        AgentKind::Fraud => Some((FRAUD_SCORE_KEY, Value::from(1.0))),
        AgentKind::Adjudication => None,
        AgentKind::Summarization => Some((SUMMARY_KEY, Value::from(""))),
    };
    if let Some((key, value)) = finding {
        let mut findings = Map::new();
        findings.insert(key.to_string(), value);
        result.structured_findings = Some(findings);
    }
    result
}

/// First `max_len` characters with ASCII letters and digits masked
///
/// # Examples
///
/// ```
/// use claimline_agents::masked_snippet;
///
/// assert_eq!(masked_snippet("Jane owes $900!", 8), "xxxx xxx");
/// ```
pub fn masked_snippet(text: &str, max_len: usize) -> String {
    text.chars()
        .take(max_len)
        .map(|c| if c.is_ascii_alphanumeric() { 'x' } else { c })
        .collect()
}

/// Invokes agents through a language model
pub struct AgentInvoker<L>
where
    L: LlmProvider,
{
    llm: Arc<L>,
    prompts: PromptLibrary,
    store: Arc<dyn KeyValueStore>,
    config: AgentConfig,
}

impl<L> AgentInvoker<L>
where
    L: LlmProvider + Send + Sync + 'static,
    L::Error: std::fmt::Display,
{
    /// Create a new invoker
    pub fn new(
        llm: Arc<L>,
        prompts: PromptLibrary,
        store: Arc<dyn KeyValueStore>,
        config: AgentConfig,
    ) -> Result<Self, AgentError> {
        config.validate().map_err(AgentError::Config)?;
        Ok(Self {
            llm,
            prompts,
            store,
            config,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Invoke one agent for a claim
    ///
    /// Malformed output is retried up to `max_attempts` times and then
    /// replaced by [`fallback_result`]. Provider failures and timeouts are
    /// returned as errors for the caller to retry; a missing template is a
    /// configuration error.
    pub async fn invoke_agent(
        &self,
        kind: AgentKind,
        claim_id: ClaimId,
        fields: &PromptFields,
    ) -> Result<AgentInvocation, AgentError> {
        let template = self.prompts.load(kind)?;
        let prompt = substitute(&template, fields);
        let agent = kind.agent_name();

        self.audit(
            claim_id,
            &format!("agent_start_{}", agent),
            json!({ "agent": agent, "prompt_length": prompt.chars().count() }),
        );

        let mut last_output = String::new();
        for attempt in 1..=self.config.max_attempts {
            let output = self.call_llm(&prompt).await?;
            debug!("{} attempt {} returned {} chars", agent, attempt, output.len());

            match parse_agent_output(&output).and_then(|parsed| validate_result(kind, parsed)) {
                Ok(result) => {
                    self.audit(
                        claim_id,
                        &format!("agent_end_{}", agent),
                        json!({ "decision": result.decision.as_str(), "attempts": attempt }),
                    );
                    self.save_evaluation(claim_id, kind, &result);
                    info!(
                        "{} for claim {}: {} after {} attempt(s)",
                        agent, claim_id, result.decision, attempt
                    );
                    return Ok(AgentInvocation {
                        result,
                        attempts: attempt,
                        fell_back: false,
                    });
                }
                Err(e) => {
                    warn!(
                        "{} attempt {}/{} for claim {} unusable: {}",
                        agent, attempt, self.config.max_attempts, claim_id, e
                    );
                    last_output = output;
                }
            }
        }

        let attempts = self.config.max_attempts;
        let result = fallback_result(kind, attempts);
        warn!(
            "{} for claim {} fell back to {} after {} attempts; output length {}, snippet '{}'",
            agent,
            claim_id,
            result.decision,
            attempts,
            last_output.chars().count(),
            masked_snippet(&last_output, self.config.snippet_len)
        );
        self.audit(
            claim_id,
            &format!("agent_end_{}", agent),
            json!({ "decision": result.decision.as_str(), "attempts": attempts, "fallback": true }),
        );

        Ok(AgentInvocation {
            result,
            attempts,
            fell_back: true,
        })
    }

    /// Call the model on a blocking thread, bounded by the configured timeout
    async fn call_llm(&self, prompt: &str) -> Result<String, AgentError> {
        let llm = Arc::clone(&self.llm);
        let prompt = prompt.to_string();

        let task = tokio::task::spawn_blocking(move || {
            llm.generate(&prompt).map_err(|e| AgentError::Llm(e.to_string()))
        });

        timeout(self.config.timeout(), task)
            .await
            .map_err(|_| AgentError::Timeout)?
            .map_err(|e| AgentError::Llm(format!("Task join error: {}", e)))?
    }

    /// Audit writes never fail an invocation
    fn audit(&self, claim_id: ClaimId, step: &str, details: Value) {
        let mut doc = Document::new();
        doc.insert("claim_id".to_string(), Value::from(claim_id.to_string()));
        doc.insert("step".to_string(), Value::from(step));
        doc.insert("timestamp".to_string(), Value::from(now_millis()));
        doc.insert("details".to_string(), details);

        if let Err(e) = self.store.put(&audit_key(&claim_id, step), doc) {
            warn!("Failed to write audit entry {} for claim {}: {}", step, claim_id, e);
        }
    }

    fn save_evaluation(&self, claim_id: ClaimId, kind: AgentKind, result: &AgentResult) {
        let value = match serde_json::to_value(result) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to encode evaluation for claim {}: {}", claim_id, e);
                return;
            }
        };

        let mut doc = Document::new();
        doc.insert("claim_id".to_string(), Value::from(claim_id.to_string()));
        doc.insert("agent".to_string(), Value::from(kind.agent_name()));
        doc.insert("result".to_string(), value);
        doc.insert("timestamp".to_string(), Value::from(now_millis()));

        if let Err(e) = self.store.put(&evaluation_key(&claim_id, kind.agent_name()), doc) {
            warn!("Failed to save evaluation for claim {}: {}", claim_id, e);
        }
    }
}
