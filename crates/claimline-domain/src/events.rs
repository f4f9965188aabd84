//! Notification topics and ingestion error codes

/// A document was rejected at intake or extraction
pub const INGESTION_FAILED: &str = "claimline.ingestion.failed";

/// A pipeline run ended in ERROR_REVIEW
pub const PIPELINE_FAILED: &str = "claimline.pipeline.failed";

/// A claim entered NEEDS_REVIEW
pub const REVIEW_REQUESTED: &str = "claimline.review.requested";

/// A reviewer decided a claim
pub const REVIEW_COMPLETED: &str = "claimline.review.completed";

/// A payout record was written
pub const CLAIM_FINALIZED: &str = "claimline.claim.finalized";

/// Unknown document type or MIME type
pub const SCHEMA_VIOLATION: &str = "SCHEMA_VIOLATION";

/// Sensitive content found under the quarantine policy
pub const PHI_DETECTED: &str = "PHI_DETECTED";

/// Quarantine folder for malformed uploads
pub const REASON_SCHEMA_ERROR: &str = "schema-error";

/// Quarantine folder for documents awaiting a privacy review
pub const REASON_PHI_REVIEW: &str = "phi-review";
