//! Versioned prompt templates and placeholder substitution

use crate::error::AgentError;
use claimline_domain::traits::ParameterStore;
use claimline_domain::AgentKind;
use regex::{Captures, Regex};
use std::sync::{Arc, LazyLock};
use tracing::debug;

/// Version name that is resolved through a pointer parameter
pub const LATEST: &str = "latest";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_]+)\}").expect("placeholder pattern is valid"));

/// Values substituted into a prompt template
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptFields {
    /// Internal claim id
    pub claim_id: String,
    /// Rendered bundle documents
    pub claim_documents: String,
    /// Bundle metadata as JSON
    pub claim_metadata: String,
    /// Output of the summarization agent, if it ran
    pub claim_summary: String,
}

impl PromptFields {
    fn get(&self, name: &str) -> Option<&str> {
        match name {
            "claim_id" => Some(&self.claim_id),
            "claim_documents" => Some(&self.claim_documents),
            "claim_metadata" => Some(&self.claim_metadata),
            "claim_summary" => Some(&self.claim_summary),
            _ => None,
        }
    }
}

/// Replace known `{placeholders}` in one pass
///
/// Unknown placeholders stay as written and substituted values are never
/// scanned again, so braces inside documents are safe.
///
/// # Examples
///
/// ```
/// use claimline_agents::{substitute, PromptFields};
///
/// let fields = PromptFields {
///     claim_id: "c-1".into(),
///     claim_documents: "{claim_id}".into(),
///     ..PromptFields::default()
/// };
/// assert_eq!(
///     substitute("id={claim_id} docs={claim_documents} x={other}", &fields),
///     "id=c-1 docs={claim_id} x={other}"
/// );
/// ```
pub fn substitute(template: &str, fields: &PromptFields) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| match fields.get(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Convert `FraudAgent` or `fraud-agent` into `fraud_agent`
pub fn normalize_agent_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.trim().chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 && !out.ends_with('_') {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else if c == ' ' || c == '-' {
            out.push('_');
        } else {
            out.push(c);
        }
    }
    out
}

/// Loads prompt templates from a parameter store
///
/// Templates live at `<prefix>/<agent_name>/<version>`. The version
/// `latest` is a pointer parameter whose value names the real version.
#[derive(Clone)]
pub struct PromptLibrary {
    params: Arc<dyn ParameterStore>,
    prefix: String,
    version: String,
}

impl PromptLibrary {
    /// Create a library reading `version` under `prefix`
    pub fn new(
        params: Arc<dyn ParameterStore>,
        prefix: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            params,
            prefix: prefix.into().trim_end_matches('/').to_string(),
            version: version.into(),
        }
    }

    /// Template for an agent kind
    pub fn load(&self, kind: AgentKind) -> Result<String, AgentError> {
        self.load_by_name(kind.agent_name())
    }

    /// Template for an agent name, trying the name as given and normalized
    pub fn load_by_name(&self, agent_name: &str) -> Result<String, AgentError> {
        let normalized = normalize_agent_name(agent_name);
        let mut candidates = vec![agent_name.trim().to_string()];
        if normalized != candidates[0] {
            candidates.push(normalized);
        }

        for candidate in &candidates {
            if let Some(template) = self.load_candidate(candidate)? {
                return Ok(template);
            }
        }
        Err(AgentError::PromptNotFound(format!(
            "{}/{}/{}",
            self.prefix, agent_name, self.version
        )))
    }

    fn load_candidate(&self, agent_name: &str) -> Result<Option<String>, AgentError> {
        let version = if self.version == LATEST {
            let pointer = format!("{}/{}/{}", self.prefix, agent_name, LATEST);
            match self.params.get_parameter(&pointer)? {
                Some(v) => v.trim().to_string(),
                None => return Ok(None),
            }
        } else {
            self.version.clone()
        };

        let name = format!("{}/{}/{}", self.prefix, agent_name, version);
        debug!("Loading prompt template '{}'", name);
        Ok(self.params.get_parameter(&name)?)
    }
}
