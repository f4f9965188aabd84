//! Pull a JSON object out of a free-text completion

use crate::error::AgentError;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

static FENCED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json|JSON)?[ \t]*\r?\n?(.*?)```").expect("fence pattern is valid")
});

static JSON_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<json>(.*?)</json>").expect("json tag pattern is valid"));

static THINKING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<thinking>(.*?)</thinking>").expect("thinking tag pattern is valid")
});

/// A JSON object found in a completion
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedOutput {
    /// The first candidate that parsed to an object
    pub object: Map<String, Value>,
    /// Text of a `<thinking>` block, if the model wrote one
    pub thinking: Option<String>,
}

/// Find the first JSON object in a completion
///
/// Candidates are tried in order: fenced code blocks, `<json>` blocks, then
/// the span from the first `{` to the last `}`. Candidates that are not
/// valid JSON objects are skipped.
///
/// # Examples
///
/// ```
/// use claimline_agents::parse_agent_output;
///
/// let text = "Here you go:\n```json\n{\"decision\": \"APPROVE\"}\n```";
/// let parsed = parse_agent_output(text).unwrap();
/// assert_eq!(parsed.object["decision"], "APPROVE");
///
/// assert!(parse_agent_output("I cannot comply").is_err());
/// ```
pub fn parse_agent_output(text: &str) -> Result<ParsedOutput, AgentError> {
    let thinking = THINKING
        .captures(text)
        .map(|caps| caps[1].trim().to_string())
        .filter(|t| !t.is_empty());

    let object = candidates(text)
        .into_iter()
        .find_map(|candidate| match serde_json::from_str::<Value>(candidate.trim()) {
            Ok(Value::Object(object)) => Some(object),
            _ => None,
        })
        .ok_or_else(|| {
            AgentError::Parse(format!(
                "no JSON object in {} chars of output",
                text.chars().count()
            ))
        })?;

    Ok(ParsedOutput { object, thinking })
}

fn candidates(text: &str) -> Vec<&str> {
    let mut found: Vec<&str> = FENCED
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect();
    found.extend(
        JSON_TAG
            .captures_iter(text)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str())),
    );
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if end > start {
            found.push(&text[start..=end]);
        }
    }
    found
}
