//! Key layout for the key-value store and the object store
//!
//! Every record is addressed by primary key; nothing in the hot path scans.

use crate::ClaimId;

/// Identity mapping for an external claim number
pub fn mapping_key(external_id: &str) -> String {
    format!("MAPPING#{}", external_id)
}

/// Claim record
pub fn claim_key(claim_id: &ClaimId) -> String {
    format!("CLAIM#{}", claim_id)
}

/// Payout record (at most one per claim)
pub fn payout_key(claim_id: &ClaimId) -> String {
    format!("PAYOUT#{}", claim_id)
}

/// Audit entry for one pipeline step
pub fn audit_key(claim_id: &ClaimId, step: &str) -> String {
    format!("AUDIT#{}#{}", claim_id, step)
}

/// Evaluation record of a validated agent result
pub fn evaluation_key(claim_id: &ClaimId, agent_name: &str) -> String {
    format!("EVAL#{}#{}", claim_id, agent_name)
}

/// Staging key of an upload that has not been accepted yet
pub fn incoming_key(external_id: &str, filename: &str) -> String {
    format!("incoming/{}/{}", external_id, filename)
}

/// Object key of an accepted source document
pub fn source_object_key(claim_id: &ClaimId, doc_id: &str, filename: &str) -> String {
    format!("{}/doc_id={}/{}", claim_id, doc_id, filename)
}

/// Prefix under which a claim's extracts are written
pub fn extracts_prefix(claim_id: &ClaimId) -> String {
    format!("{}/extracts/", claim_id)
}

/// Object key of a redacted extract
pub fn extract_object_key(claim_id: &ClaimId, doc_id: &str) -> String {
    format!("{}{}.txt", extracts_prefix(claim_id), doc_id)
}

/// Object key of the redaction audit record
pub fn redaction_audit_key(claim_id: &ClaimId, doc_id: &str) -> String {
    format!("phi-audit/{}/{}.json", claim_id, doc_id)
}

/// Object key of the full context bundle
pub fn context_bundle_key(claim_id: &ClaimId) -> String {
    format!("{}/context/context_bundle.json", claim_id)
}

/// Object key of the size-capped context bundle
pub fn optimized_bundle_key(claim_id: &ClaimId) -> String {
    format!("{}/context/context_bundle_optimized.json", claim_id)
}

/// Object key of a quarantined object
pub fn quarantine_key(reason: &str, key: &str) -> String {
    format!("quarantine/{}/{}", reason, key)
}

/// Object metadata carrying the external claim number
pub const META_EXTERNAL_ID: &str = "external-id";

/// Object metadata carrying the canonical document type
pub const META_DOC_TYPE: &str = "doc-type";

/// Object metadata carrying the extractor name
pub const META_EXTRACTOR: &str = "extractor";

/// Object metadata carrying the OCR confidence
pub const META_CONFIDENCE: &str = "confidence";

/// Placeholder written when the external id was not known at extraction time
pub const UNKNOWN_EXTERNAL_ID: &str = "UNKNOWN";
