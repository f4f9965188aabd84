//! Claimline Domain Layer
//!
//! This crate contains the data model and collaborator contracts shared by
//! every stage of the claim pipeline. It holds no infrastructure code: stores,
//! detectors, OCR engines and model providers live in other crates and plug in
//! through the traits in [`traits`].
//!
//! ## Key Concepts
//!
//! - **Claim**: an insurance claim, keyed by an internal [`ClaimId`] that is
//!   minted exactly once per external claim number
//! - **Document**: an uploaded file, its canonical [`DocumentType`] and the
//!   redacted [`DocumentExtract`] produced from it
//! - **Context Bundle**: the evidence handed to the decision agents
//! - **Agent Result**: a validated [`Decision`] with reason and findings
//! - **Payout Record**: the single, final monetary outcome of a claim
//!
//! ## Architecture
//!
//! - Plain data types, serializable with serde
//! - Collaborator traits return [`ServiceError`], which classifies
//!   transient failures for the retry layers above
//! - Records are stored as JSON documents keyed by the helpers in [`keys`]

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod agent;
pub mod claim;
pub mod context;
pub mod document;
pub mod error;
pub mod events;
pub mod keys;
pub mod payout;
pub mod redaction;
pub mod status;
pub mod time;
pub mod traits;

// Re-exports for convenience
pub use agent::{AgentKind, AgentResult, Decision};
pub use claim::{fields, ClaimId, ClaimRecord, ExtractionMetadata};
pub use context::{BundleDocument, ContextBundle, ContextStatus, TimelineEntry};
pub use document::{DocumentExtract, DocumentRef, DocumentType};
pub use error::ServiceError;
pub use payout::PayoutRecord;
pub use redaction::{DetectedEntity, RedactionSpan};
pub use status::ClaimStatus;
pub use time::now_millis;
