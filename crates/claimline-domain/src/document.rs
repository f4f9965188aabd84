//! Documents received for a claim and the text extracted from them

use crate::keys;
use crate::traits::{Metadata, StoredObject};
use crate::ClaimId;
use serde::{Deserialize, Serialize};

/// Canonical document types accepted at intake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    /// First notification of loss
    FnolForm,
    /// Photograph of the damage
    DamagePhoto,
    /// Official police report
    PoliceReport,
    /// Repair estimate
    Estimate,
    /// Invoice with a monetary total
    Invoice,
    /// Notes written by a loss adjuster
    AdjusterNotes,
    /// Recorded statement
    AudioStatement,
}

impl DocumentType {
    /// All accepted types
    pub const ALL: [DocumentType; 7] = [
        DocumentType::FnolForm,
        DocumentType::DamagePhoto,
        DocumentType::PoliceReport,
        DocumentType::Estimate,
        DocumentType::Invoice,
        DocumentType::AdjusterNotes,
        DocumentType::AudioStatement,
    ];

    /// Get the canonical name
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::FnolForm => "FNOL_FORM",
            DocumentType::DamagePhoto => "DAMAGE_PHOTO",
            DocumentType::PoliceReport => "POLICE_REPORT",
            DocumentType::Estimate => "ESTIMATE",
            DocumentType::Invoice => "INVOICE",
            DocumentType::AdjusterNotes => "ADJUSTER_NOTES",
            DocumentType::AudioStatement => "AUDIO_STATEMENT",
        }
    }

    /// Parse a caller-supplied type, tolerating case and separator variants
    ///
    /// # Examples
    ///
    /// ```
    /// use claimline_domain::DocumentType;
    ///
    /// assert_eq!(DocumentType::parse("fnol-form"), Some(DocumentType::FnolForm));
    /// assert_eq!(DocumentType::parse("Police Report"), Some(DocumentType::PoliceReport));
    /// assert_eq!(DocumentType::parse("selfie"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c.to_ascii_uppercase() })
            .collect();

        match normalized.as_str() {
            "FNOL_FORM" | "FNOL" => Some(DocumentType::FnolForm),
            "DAMAGE_PHOTO" => Some(DocumentType::DamagePhoto),
            "POLICE_REPORT" => Some(DocumentType::PoliceReport),
            "ESTIMATE" => Some(DocumentType::Estimate),
            "INVOICE" => Some(DocumentType::Invoice),
            "ADJUSTER_NOTES" | "ADJUSTER_NOTE" => Some(DocumentType::AdjusterNotes),
            "AUDIO_STATEMENT" => Some(DocumentType::AudioStatement),
            _ => None,
        }
    }

    /// Rank used when the evidence bundle must be cut down (lower first)
    pub fn priority(&self) -> u8 {
        match self {
            DocumentType::FnolForm => 0,
            DocumentType::Invoice | DocumentType::Estimate => 1,
            DocumentType::PoliceReport => 2,
            DocumentType::AdjusterNotes => 3,
            DocumentType::DamagePhoto | DocumentType::AudioStatement => 4,
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to a document recorded against a claim
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef {
    /// Document identifier
    pub doc_id: String,

    /// Canonical type
    pub document_type: DocumentType,

    /// Object key of the accepted source document
    pub key: String,

    /// Intake channel (portal, email, api, ...)
    pub channel: String,
}

/// Redacted text extracted from one document
///
/// Created once by the extraction step and never mutated; a corrected
/// document arrives under a new document identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentExtract {
    /// Owning claim
    pub claim_id: ClaimId,

    /// Source document
    pub doc_id: String,

    /// Redacted text
    pub text: String,

    /// Type of the source document, if known
    pub document_type: Option<DocumentType>,

    /// External claim number propagated from the upload
    pub external_id: Option<String>,

    /// Mean OCR confidence (0-100)
    pub confidence: f64,

    /// Extraction mode that produced the text
    pub extractor: String,
}

impl DocumentExtract {
    /// Object metadata written alongside the extract text
    pub fn object_metadata(&self) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert(
            keys::META_EXTERNAL_ID.to_string(),
            self.external_id
                .clone()
                .unwrap_or_else(|| keys::UNKNOWN_EXTERNAL_ID.to_string()),
        );
        if let Some(doc_type) = self.document_type {
            metadata.insert(keys::META_DOC_TYPE.to_string(), doc_type.as_str().to_string());
        }
        metadata.insert(keys::META_EXTRACTOR.to_string(), self.extractor.clone());
        metadata.insert(keys::META_CONFIDENCE.to_string(), format!("{:.2}", self.confidence));
        metadata
    }

    /// Rebuild an extract from its stored object
    ///
    /// The `UNKNOWN` external id sentinel reads back as `None`. Missing or
    /// unparsable metadata never fails; the text is decoded lossily.
    pub fn from_object(claim_id: ClaimId, doc_id: &str, object: &StoredObject) -> Self {
        let meta = |key: &str| metadata_value(object, key);

        Self {
            claim_id,
            doc_id: doc_id.to_string(),
            text: String::from_utf8_lossy(&object.body).into_owned(),
            document_type: meta(keys::META_DOC_TYPE).and_then(DocumentType::parse),
            external_id: meta(keys::META_EXTERNAL_ID)
                .filter(|v| *v != keys::UNKNOWN_EXTERNAL_ID)
                .map(str::to_string),
            confidence: meta(keys::META_CONFIDENCE)
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.0),
            extractor: meta(keys::META_EXTRACTOR).unwrap_or_default().to_string(),
        }
    }
}

fn metadata_value<'a>(object: &'a StoredObject, key: &str) -> Option<&'a str> {
    object
        .metadata
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}
