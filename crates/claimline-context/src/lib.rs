//! Claimline Context
//!
//! Gathers the redacted extracts of a claim into the evidence bundle that
//! the decision agents read.
//!
//! # Overview
//!
//! - [`ContextAssembler`] lists the fresh extracts of a run, checks that
//!   their external ids still map to the claim, and writes two bundles
//! - [`build_timeline`] orders documents by the first date found in them
//! - [`assess_status`] classifies the evidence as complete, partial or
//!   incomplete
//! - [`optimize_bundle`] cuts the bundle down to a character budget,
//!   highest priority documents first
//!
//! # Example Usage
//!
//! ```
//! use claimline_context::build_timeline;
//! use claimline_domain::BundleDocument;
//!
//! let docs = vec![
//!     BundleDocument {
//!         doc_id: "invoice".into(),
//!         key: "c/extracts/invoice.txt".into(),
//!         document_type: None,
//!         text: "Invoice dated 2024-03-02".into(),
//!     },
//!     BundleDocument {
//!         doc_id: "fnol".into(),
//!         key: "c/extracts/fnol.txt".into(),
//!         document_type: None,
//!         text: "Loss reported 28/02/2024".into(),
//!     },
//! ];
//!
//! let timeline = build_timeline(&docs);
//! assert_eq!(timeline[0].source_doc_id, "fnol");
//! assert_eq!(timeline[0].date, "2024-02-28");
//! ```

#![warn(missing_docs)]

mod assembler;
mod config;
mod error;
mod optimize;
mod timeline;

pub use assembler::{AssembledContext, ContextAssembler, EXTERNAL_ID_KEY};
pub use config::ContextConfig;
pub use error::ContextError;
pub use optimize::optimize_bundle;
pub use timeline::{assess_status, build_timeline, infer_date, UNKNOWN_DATE};
