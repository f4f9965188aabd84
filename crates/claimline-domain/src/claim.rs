//! Claim module - identifiers and the stored claim record

use crate::{ClaimStatus, ContextStatus, DocumentRef};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Internal, canonical identifier of a claim, based on UUIDv7
///
/// Minted once per external claim number by the identity resolver and never
/// reassigned. UUIDv7 keeps identifiers sortable by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClaimId(u128);

impl ClaimId {
    /// Generate a new UUIDv7-based ClaimId
    ///
    /// # Examples
    ///
    /// ```
    /// use claimline_domain::ClaimId;
    ///
    /// let id = ClaimId::new();
    /// assert!(id.value() > 0);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create a ClaimId from a raw u128 value
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse a ClaimId from its hyphenated string form
    ///
    /// # Examples
    ///
    /// ```
    /// use claimline_domain::ClaimId;
    ///
    /// let id = ClaimId::new();
    /// let parsed = ClaimId::from_string(&id.to_string()).unwrap();
    /// assert_eq!(id, parsed);
    /// ```
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid claim id '{}': {}", s, e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }

    /// Milliseconds since the Unix epoch at which the id was minted
    pub fn timestamp(&self) -> u64 {
        // UUIDv7: top 48 bits are Unix millisecond timestamp
        (self.0 >> 80) as u64
    }
}

impl Default for ClaimId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

impl Serialize for ClaimId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClaimId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ClaimId::from_string(&raw).map_err(serde::de::Error::custom)
    }
}

/// Field names of the stored claim record
///
/// Updates are field-level so that concurrent writers never clobber fields
/// they do not own; these constants keep the writers in agreement.
pub mod fields {
    /// Internal claim id
    pub const CLAIM_ID: &str = "claim_id";
    /// External claim number
    pub const EXTERNAL_ID: &str = "external_id";
    /// Lifecycle status
    pub const STATUS: &str = "status";
    /// Received document set
    pub const RECEIVED_DOCUMENTS: &str = "received_documents";
    /// Creation timestamp
    pub const CREATED_AT: &str = "created_at";
    /// Last update timestamp
    pub const UPDATED_AT: &str = "updated_at";
    /// Per-document extraction metadata
    pub const EXTRACTIONS: &str = "extractions";
    /// Location of the latest context bundle
    pub const CONTEXT_BUNDLE_KEY: &str = "context_bundle_key";
    /// Status of the latest context bundle
    pub const CONTEXT_STATUS: &str = "context_status";
    /// AI recommendation
    pub const RECOMMENDATION: &str = "recommendation";
    /// Reason attached to the AI recommendation
    pub const DECISION_REASON: &str = "decision_reason";
    /// Fraud score from the screening agent
    pub const FRAUD_SCORE: &str = "fraud_score";
    /// Amount the pipeline would pay if approved
    pub const RECOMMENDED_AMOUNT: &str = "recommended_amount";
    /// Human reviewer
    pub const REVIEWER_ID: &str = "reviewer_id";
    /// Human justification
    pub const REVIEW_JUSTIFICATION: &str = "review_justification";
    /// Whether the human agreed with the AI recommendation
    pub const AI_AGREEMENT: &str = "ai_agreement";
    /// Terminal state chosen at finalization
    pub const TERMINAL_STATE: &str = "terminal_state";
    /// Recorded payout amount
    pub const FINAL_PAYOUT: &str = "final_payout";
    /// Payout timestamp
    pub const PAYOUT_AT: &str = "payout_at";
    /// Why the claim was routed to error review
    pub const ERROR_REASON: &str = "error_reason";
}

/// How a single document was extracted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionMetadata {
    /// Document the metadata belongs to
    pub doc_id: String,

    /// Extraction mode that produced the text
    pub extractor: String,

    /// Mean OCR confidence (0-100)
    pub confidence: f64,

    /// Object key of the redacted extract
    pub extract_key: String,

    /// Object key of the redaction audit record
    pub audit_key: String,
}

/// Stored state of a claim
///
/// Records are written piecemeal by different stages, so every field other
/// than the id and status is optional on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimRecord {
    /// Internal identifier
    pub claim_id: ClaimId,

    /// Caller-facing claim number
    #[serde(default)]
    pub external_id: Option<String>,

    /// Lifecycle status
    pub status: ClaimStatus,

    /// Documents received so far (set semantics)
    #[serde(default)]
    pub received_documents: Vec<DocumentRef>,

    /// Creation time (epoch millis)
    #[serde(default)]
    pub created_at: u64,

    /// Last update time (epoch millis)
    #[serde(default)]
    pub updated_at: u64,

    /// Extraction metadata, one entry per extracted document
    #[serde(default)]
    pub extractions: Vec<ExtractionMetadata>,

    /// Where the latest context bundle lives
    #[serde(default)]
    pub context_bundle_key: Option<String>,

    /// Status of the latest context bundle
    #[serde(default)]
    pub context_status: Option<ContextStatus>,

    /// AI recommendation of record
    #[serde(default)]
    pub recommendation: Option<String>,

    /// Reason for the AI recommendation
    #[serde(default)]
    pub decision_reason: Option<String>,

    /// Fraud score of the screening agent
    #[serde(default)]
    pub fraud_score: Option<f64>,

    /// Amount the pipeline proposed to pay
    #[serde(default)]
    pub recommended_amount: Option<f64>,

    /// Human reviewer, if one decided the claim
    #[serde(default)]
    pub reviewer_id: Option<String>,

    /// Justification given by the human reviewer
    #[serde(default)]
    pub review_justification: Option<String>,

    /// Whether the reviewer agreed with the AI recommendation
    #[serde(default)]
    pub ai_agreement: Option<bool>,

    /// Terminal state chosen at finalization
    #[serde(default)]
    pub terminal_state: Option<ClaimStatus>,

    /// Amount actually recorded at finalization
    #[serde(default)]
    pub final_payout: Option<f64>,

    /// When the payout was recorded (epoch millis)
    #[serde(default)]
    pub payout_at: Option<u64>,

    /// Why the claim was moved to error review
    #[serde(default)]
    pub error_reason: Option<String>,
}

impl ClaimRecord {
    /// Decode a record from its stored JSON document
    pub fn from_document(doc: &Map<String, Value>) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(doc.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_claim_id_ordering() {
        let id1 = ClaimId::from_value(1000);
        let id2 = ClaimId::from_value(2000);

        assert!(id1 < id2);
    }

    #[test]
    fn test_claim_id_chronological() {
        let id1 = ClaimId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = ClaimId::new();

        assert!(id1 < id2, "Earlier UUIDv7 should sort first");
        assert!(id1.timestamp() <= id2.timestamp());
    }

    #[test]
    fn test_claim_id_invalid_string() {
        assert!(ClaimId::from_string("not-a-valid-uuid").is_err());
        assert!(ClaimId::from_string("").is_err());
    }

    #[test]
    fn test_claim_id_serializes_as_string() {
        let id = ClaimId::new();
        let value = serde_json::to_value(id).unwrap();
        assert_eq!(value, json!(id.to_string()));

        let back: ClaimId = serde_json::from_value(value).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_record_decodes_partial_document() {
        let id = ClaimId::new();
        let doc = json!({
            "claim_id": id.to_string(),
            "status": "INTAKE",
            "received_documents": [],
        });

        let record = ClaimRecord::from_document(doc.as_object().unwrap()).unwrap();
        assert_eq!(record.claim_id, id);
        assert_eq!(record.status, ClaimStatus::Intake);
        assert!(record.context_bundle_key.is_none());
        assert!(record.final_payout.is_none());
    }

    #[test]
    fn test_record_without_status_is_rejected() {
        let doc = json!({ "claim_id": ClaimId::new().to_string() });
        assert!(ClaimRecord::from_document(doc.as_object().unwrap()).is_err());
    }
}
