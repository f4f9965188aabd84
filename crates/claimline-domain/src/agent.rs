//! Decision agents and their validated results

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Which agent an invocation targets
///
/// The kind selects the prompt, the default decision used when the model
/// omits one, and the shape the findings must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentKind {
    /// Fraud screening; fails open to CONTINUE
    Fraud,
    /// Final adjudication; fails closed to BLOCKED
    Adjudication,
    /// Summary and fact extraction feeding the other two
    Summarization,
}

impl AgentKind {
    /// Name under which the agent's prompts are stored
    pub fn agent_name(&self) -> &'static str {
        match self {
            AgentKind::Fraud => "fraud_agent",
            AgentKind::Adjudication => "adjudication_agent",
            AgentKind::Summarization => "summarization_agent",
        }
    }

    /// Decision substituted when the model does not state one
    pub fn default_decision(&self) -> Decision {
        match self {
            AgentKind::Fraud => Decision::Continue,
            AgentKind::Adjudication => Decision::Blocked,
            AgentKind::Summarization => Decision::Continue,
        }
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.agent_name())
    }
}

/// Allow-listed decision values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    /// Proceed to the next stage
    Continue,
    /// Halt processing
    Stop,
    /// Hand to a human
    Hitl,
    /// Approve the claim
    Approve,
    /// Deny the claim
    Deny,
    /// Unable to decide safely
    Blocked,
    /// Suspicious; investigate
    Flagged,
}

impl Decision {
    /// Get the decision name
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Continue => "CONTINUE",
            Decision::Stop => "STOP",
            Decision::Hitl => "HITL",
            Decision::Approve => "APPROVE",
            Decision::Deny => "DENY",
            Decision::Blocked => "BLOCKED",
            Decision::Flagged => "FLAGGED",
        }
    }

    /// Parse an allow-listed decision; anything else is `None`
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "CONTINUE" => Some(Decision::Continue),
            "STOP" => Some(Decision::Stop),
            "HITL" => Some(Decision::Hitl),
            "APPROVE" => Some(Decision::Approve),
            "DENY" => Some(Decision::Deny),
            "BLOCKED" => Some(Decision::Blocked),
            "FLAGGED" => Some(Decision::Flagged),
            _ => None,
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key of the fraud score inside the findings object
pub const FRAUD_SCORE_KEY: &str = "fraud_score";

/// A validated agent result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    /// Allow-listed decision
    pub decision: Decision,

    /// Free-text reason
    pub reason: String,

    /// Structured findings (always an object when present)
    #[serde(default)]
    pub structured_findings: Option<Map<String, Value>>,

    /// Longer rationale, if the model gave one
    #[serde(default)]
    pub rationale: Option<String>,

    /// Model-reported confidence
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl AgentResult {
    /// Result carrying only a decision and reason
    pub fn new(decision: Decision, reason: impl Into<String>) -> Self {
        Self {
            decision,
            reason: reason.into(),
            structured_findings: None,
            rationale: None,
            confidence: None,
        }
    }

    /// Fraud score from the findings, if present
    pub fn fraud_score(&self) -> Option<f64> {
        self.structured_findings
            .as_ref()
            .and_then(|f| f.get(FRAUD_SCORE_KEY))
            .and_then(Value::as_f64)
    }

    /// A string field from the findings
    pub fn finding_str(&self, key: &str) -> Option<&str> {
        self.structured_findings
            .as_ref()
            .and_then(|f| f.get(key))
            .and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_per_kind() {
        assert_eq!(AgentKind::Fraud.default_decision(), Decision::Continue);
        assert_eq!(AgentKind::Adjudication.default_decision(), Decision::Blocked);
    }

    #[test]
    fn test_decision_parse_is_allow_list() {
        assert_eq!(Decision::parse(" approve "), Some(Decision::Approve));
        assert_eq!(Decision::parse("hitl"), Some(Decision::Hitl));
        assert_eq!(Decision::parse("APPROVED"), None);
        assert_eq!(Decision::parse("MAYBE"), None);
    }

    #[test]
    fn test_fraud_score_reads_findings() {
        let mut result = AgentResult::new(Decision::Continue, "ok");
        assert_eq!(result.fraud_score(), None);

        result.structured_findings = json!({ "fraud_score": 0.42 }).as_object().cloned();
        assert_eq!(result.fraud_score(), Some(0.42));
    }
}
