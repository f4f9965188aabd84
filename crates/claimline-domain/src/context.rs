//! Evidence bundle handed to the decision agents

use crate::{ClaimId, DocumentType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How complete the evidence for a claim looks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContextStatus {
    /// First notice and a monetary total are both present
    Complete,
    /// Two or more documents, but key evidence is missing
    PartialContext,
    /// Fewer than two documents
    Incomplete,
}

impl ContextStatus {
    /// Get the status name as stored
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextStatus::Complete => "COMPLETE",
            ContextStatus::PartialContext => "PARTIAL_CONTEXT",
            ContextStatus::Incomplete => "INCOMPLETE",
        }
    }
}

/// One entry of the claim timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// Inferred date, `YYYY-MM-DD`, or `9999-99-99` when unknown
    pub date: String,
    /// Human-readable label
    pub event: String,
    /// Document the date was taken from
    pub source_doc_id: String,
}

/// A document included in a bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleDocument {
    /// Document identifier
    pub doc_id: String,
    /// Object key of the extract
    pub key: String,
    /// Canonical type, if the extract carried one
    pub document_type: Option<DocumentType>,
    /// Redacted text
    pub text: String,
}

impl BundleDocument {
    /// Render the document as it appears in an agent prompt
    pub fn render(&self) -> String {
        format!("\n--- Document: {} ---\n{}\n", self.doc_id, self.text)
    }
}

/// Evidence bundle for one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextBundle {
    /// Claim the bundle belongs to
    pub claim_id: ClaimId,
    /// Completeness classification
    pub status: ContextStatus,
    /// Timeline sorted by inferred date
    pub timeline: Vec<TimelineEntry>,
    /// Included documents
    pub documents: Vec<BundleDocument>,
    /// Propagated metadata (external id, ...)
    pub metadata: BTreeMap<String, String>,
    /// Number of fresh documents found, included or not
    pub total_docs: usize,
    /// Creation time (epoch millis)
    pub created_at: u64,
}

impl ContextBundle {
    /// Concatenate the rendered documents
    pub fn render_documents(&self) -> String {
        self.documents.iter().map(BundleDocument::render).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_block_format() {
        let doc = BundleDocument {
            doc_id: "d1".into(),
            key: "k".into(),
            document_type: None,
            text: "hello".into(),
        };
        assert_eq!(doc.render(), "\n--- Document: d1 ---\nhello\n");
    }

    #[test]
    fn test_status_serializes_screaming_case() {
        let json = serde_json::to_value(ContextStatus::PartialContext).unwrap();
        assert_eq!(json, serde_json::json!("PARTIAL_CONTEXT"));
    }
}
