//! Configuration for intake and document processing

use crate::policy::TriggerPolicy;
use serde::{Deserialize, Serialize};

/// What to do with text that holds high-confidence sensitive entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivePolicy {
    /// Redact the entities and carry on
    #[default]
    Redact,
    /// Quarantine the source for a privacy review; write no extract
    Quarantine,
}

/// Configuration for intake and document processing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntakeConfig {
    /// Accepted MIME types
    #[serde(default = "default_allowed_mime_types")]
    pub allowed_mime_types: Vec<String>,

    /// Mean OCR confidence (0-100) below which plain text detection is tried
    #[serde(default = "default_ocr_confidence_floor")]
    pub ocr_confidence_floor: f64,

    /// Handling of sensitive content
    #[serde(default)]
    pub sensitive_policy: SensitivePolicy,

    /// Channel recorded when an upload does not name one
    #[serde(default = "default_channel")]
    pub default_channel: String,

    /// When a packet is complete enough to start a run
    #[serde(default)]
    pub trigger_policy: TriggerPolicy,
}

fn default_allowed_mime_types() -> Vec<String> {
    ["application/pdf", "image/jpeg", "image/jpg", "audio/wav", "text/plain"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_ocr_confidence_floor() -> f64 {
    50.0
}

fn default_channel() -> String {
    "portal".to_string()
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            allowed_mime_types: default_allowed_mime_types(),
            ocr_confidence_floor: default_ocr_confidence_floor(),
            sensitive_policy: SensitivePolicy::default(),
            default_channel: default_channel(),
            trigger_policy: TriggerPolicy::default(),
        }
    }
}

impl IntakeConfig {
    /// Aggressive preset: quarantine sensitive documents, demand better OCR
    pub fn aggressive() -> Self {
        Self {
            ocr_confidence_floor: 70.0,
            sensitive_policy: SensitivePolicy::Quarantine,
            ..Self::default()
        }
    }

    /// Lenient preset: redact everything, accept weaker OCR
    pub fn lenient() -> Self {
        Self {
            ocr_confidence_floor: 30.0,
            sensitive_policy: SensitivePolicy::Redact,
            ..Self::default()
        }
    }

    /// Whether a MIME type is accepted (case-insensitive)
    pub fn accepts_mime(&self, mime_type: &str) -> bool {
        let wanted = mime_type.trim();
        self.allowed_mime_types
            .iter()
            .any(|m| m.eq_ignore_ascii_case(wanted))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        self.trigger_policy.validate()?;
        if self.allowed_mime_types.is_empty() {
            return Err("allowed_mime_types must not be empty".to_string());
        }
        if !(0.0..=100.0).contains(&self.ocr_confidence_floor) {
            return Err("ocr_confidence_floor must be between 0 and 100".to_string());
        }
        if self.default_channel.trim().is_empty() {
            return Err("default_channel must not be empty".to_string());
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

/// Guess a MIME type from a file name
pub fn guess_mime_type(filename: &str) -> &'static str {
    let lowered = filename.to_ascii_lowercase();
    match lowered.rsplit_once('.').map(|(_, ext)| ext) {
        Some("pdf") => "application/pdf",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("wav") => "audio/wav",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimline_domain::DocumentType;

    #[test]
    fn test_presets_are_valid() {
        assert!(IntakeConfig::default().validate().is_ok());
        assert!(IntakeConfig::aggressive().validate().is_ok());
        assert!(IntakeConfig::lenient().validate().is_ok());
    }

    #[test]
    fn test_mime_allow_list() {
        let config = IntakeConfig::default();
        assert!(config.accepts_mime("application/pdf"));
        assert!(config.accepts_mime("IMAGE/JPEG"));
        assert!(!config.accepts_mime("application/zip"));
        assert!(!config.accepts_mime(guess_mime_type("archive.zip")));
    }

    #[test]
    fn test_guess_mime_type() {
        assert_eq!(guess_mime_type("scan.PDF"), "application/pdf");
        assert_eq!(guess_mime_type("photo.jpeg"), "image/jpeg");
        assert_eq!(guess_mime_type("statement.wav"), "audio/wav");
        assert_eq!(guess_mime_type("notes.txt"), "text/plain");
        assert_eq!(guess_mime_type("README"), "application/octet-stream");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = IntakeConfig::from_toml(
            "sensitive_policy = \"quarantine\"\n\n[trigger_policy]\nkind = \"minimum_count\"\ncount = 3\n",
        )
        .unwrap();

        assert_eq!(config.sensitive_policy, SensitivePolicy::Quarantine);
        assert_eq!(config.trigger_policy, TriggerPolicy::MinimumCount { count: 3 });
        assert_eq!(config.ocr_confidence_floor, 50.0);
        assert_eq!(config.allowed_mime_types.len(), 5);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = IntakeConfig {
            trigger_policy: TriggerPolicy::AllOf {
                types: vec![DocumentType::FnolForm, DocumentType::Invoice],
                count: 2,
            },
            ..IntakeConfig::aggressive()
        };
        let parsed = IntakeConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_invalid_floor() {
        let config = IntakeConfig {
            ocr_confidence_floor: 120.0,
            ..IntakeConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
