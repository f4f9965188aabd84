//! Schema validation of parsed agent output

use crate::error::AgentError;
use crate::parser::ParsedOutput;
use claimline_domain::agent::FRAUD_SCORE_KEY;
use claimline_domain::{AgentKind, AgentResult, Decision};
use serde_json::{Map, Value};

/// Findings key holding the summarization agent's summary
pub const SUMMARY_KEY: &str = "summary";

/// Findings key holding the summarization agent's extracted facts
pub const EXTRACTED_FACTS_KEY: &str = "extracted_facts";

/// Turn a parsed object into a trusted [`AgentResult`]
///
/// The decision (or its alias `recommendation`) must be on the allow-list;
/// a missing one becomes the kind's default. Fraud results always carry a
/// numeric `fraud_score` in [0, 1], backfilled from `confidence` or 0.0.
pub fn validate_result(kind: AgentKind, parsed: ParsedOutput) -> Result<AgentResult, AgentError> {
    let ParsedOutput { object, thinking } = parsed;

    let decision = match decision_field(&object)? {
        Some(raw) => Decision::parse(raw).ok_or_else(|| {
            AgentError::Validation(format!("decision '{}' is not allowed", raw))
        })?,
        None => kind.default_decision(),
    };

    let mut findings = match object.get("structured_findings") {
        None | Some(Value::Null) => None,
        Some(Value::Object(findings)) => Some(findings.clone()),
        Some(other) => {
            return Err(AgentError::Validation(format!(
                "structured_findings must be an object, got {}",
                type_name(other)
            )))
        }
    };

    let confidence = object.get("confidence").and_then(Value::as_f64);

    match kind {
        AgentKind::Fraud => {
            let findings = findings.get_or_insert_with(Map::new);
            let score = match findings.get(FRAUD_SCORE_KEY) {
                None | Some(Value::Null) => confidence.unwrap_or(0.0),
                Some(value) => value.as_f64().ok_or_else(|| {
                    AgentError::Validation(format!("fraud_score must be numeric, got {}", value))
                })?,
            };
            if !(0.0..=1.0).contains(&score) {
                return Err(AgentError::Validation(format!(
                    "fraud_score {} is outside [0, 1]",
                    score
                )));
            }
            findings.insert(FRAUD_SCORE_KEY.to_string(), Value::from(score));
        }
        AgentKind::Summarization => {
            for key in [SUMMARY_KEY, EXTRACTED_FACTS_KEY] {
                if let Some(value) = object.get(key) {
                    findings
                        .get_or_insert_with(Map::new)
                        .entry(key.to_string())
                        .or_insert_with(|| value.clone());
                }
            }
        }
        AgentKind::Adjudication => {}
    }

    let rationale = ["rationale", "_rationale"]
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .or(thinking);

    Ok(AgentResult {
        decision,
        reason: object
            .get("reason")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        structured_findings: findings,
        rationale,
        confidence,
    })
}

/// The raw decision string, `None` when missing, null or blank
fn decision_field(object: &Map<String, Value>) -> Result<Option<&str>, AgentError> {
    let value = match object.get("decision") {
        None | Some(Value::Null) => object.get("recommendation"),
        present => present,
    };
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(AgentError::Validation(format!(
            "decision must be a string, got {}",
            type_name(other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parsed(value: Value) -> ParsedOutput {
        ParsedOutput {
            object: value.as_object().cloned().unwrap(),
            thinking: None,
        }
    }

    #[test]
    fn test_decision_is_normalized() {
        let result = validate_result(
            AgentKind::Adjudication,
            parsed(json!({ "decision": " approve ", "reason": "covered" })),
        )
        .unwrap();
        assert_eq!(result.decision, Decision::Approve);
        assert_eq!(result.reason, "covered");
    }

    #[test]
    fn test_missing_decision_uses_kind_default() {
        let adj = validate_result(AgentKind::Adjudication, parsed(json!({ "decision": "" }))).unwrap();
        assert_eq!(adj.decision, Decision::Blocked);

        let fraud = validate_result(AgentKind::Fraud, parsed(json!({ "reason": "x" }))).unwrap();
        assert_eq!(fraud.decision, Decision::Continue);

        let summary = validate_result(AgentKind::Summarization, parsed(json!({ "decision": null }))).unwrap();
        assert_eq!(summary.decision, Decision::Continue);
    }

    #[test]
    fn test_recommendation_alias() {
        let result = validate_result(
            AgentKind::Fraud,
            parsed(json!({ "recommendation": "HITL", "structured_findings": { "fraud_score": 0.4 } })),
        )
        .unwrap();
        assert_eq!(result.decision, Decision::Hitl);
        assert_eq!(result.fraud_score(), Some(0.4));
    }

    #[test]
    fn test_unknown_decision_is_rejected() {
        let err = validate_result(AgentKind::Adjudication, parsed(json!({ "decision": "APPROVED" })))
            .unwrap_err();
        assert!(matches!(err, AgentError::Validation(_)));

        let err = validate_result(AgentKind::Adjudication, parsed(json!({ "decision": 1 })))
            .unwrap_err();
        assert!(matches!(err, AgentError::Validation(_)));
    }

    #[test]
    fn test_fraud_score_backfill() {
        let from_confidence =
            validate_result(AgentKind::Fraud, parsed(json!({ "decision": "CONTINUE", "confidence": 0.35 })))
                .unwrap();
        assert_eq!(from_confidence.fraud_score(), Some(0.35));

        let zero = validate_result(AgentKind::Fraud, parsed(json!({ "decision": "CONTINUE" }))).unwrap();
        assert_eq!(zero.fraud_score(), Some(0.0));
    }

    #[test]
    fn test_bad_findings_are_rejected() {
        for bad in [
            json!({ "structured_findings": "high risk" }),
            json!({ "structured_findings": { "fraud_score": "high" } }),
            json!({ "structured_findings": { "fraud_score": 3.0 } }),
        ] {
            let err = validate_result(AgentKind::Fraud, parsed(bad)).unwrap_err();
            assert!(matches!(err, AgentError::Validation(_)));
        }
    }

    #[test]
    fn test_summary_fields_move_into_findings() {
        let result = validate_result(
            AgentKind::Summarization,
            parsed(json!({
                "summary": "Rear-end collision",
                "extracted_facts": { "invoice_total": "$1,250.00" }
            })),
        )
        .unwrap();
        assert_eq!(result.finding_str(SUMMARY_KEY), Some("Rear-end collision"));
        assert!(result.structured_findings.unwrap().contains_key(EXTRACTED_FACTS_KEY));
    }

    #[test]
    fn test_rationale_falls_back_to_thinking() {
        let mut output = parsed(json!({ "decision": "DENY" }));
        output.thinking = Some("lapsed policy".into());
        let result = validate_result(AgentKind::Adjudication, output).unwrap();
        assert_eq!(result.rationale.as_deref(), Some("lapsed policy"));
    }
}
