//! Claimline Intake
//!
//! Everything that happens to a document before the decision pipeline sees
//! it: identity resolution, upload validation, packet tracking, run
//! triggering and the extraction step.
//!
//! # Overview
//!
//! - [`IdentityResolver`] maps external claim numbers to internal ids with
//!   a conditional write, so concurrent first uploads agree on one id
//! - [`Intake`] validates staged uploads, quarantines malformed ones and
//!   records accepted documents through the [`Collector`]
//! - [`TriggerPolicy`] decides when a packet is complete; the collector then
//!   asks the workflow starter for a run, deduplicated by claim id
//! - [`DocumentProcessor`] OCRs, redacts and writes the extract that the
//!   context assembler later reads
//!
//! # Example Usage
//!
//! ```
//! use claimline_intake::IdentityResolver;
//! use claimline_store::SqliteKvStore;
//! use std::sync::Arc;
//!
//! let store = Arc::new(SqliteKvStore::in_memory().unwrap());
//! let resolver = IdentityResolver::new(store);
//!
//! let id = resolver.resolve_or_create("CLM-000001").unwrap();
//! assert_eq!(resolver.lookup("CLM-000001").unwrap(), Some(id));
//! ```

#![warn(missing_docs)]

mod collector;
mod config;
mod error;
mod identity;
mod intake;
mod ocr;
mod policy;
mod processor;
mod quarantine;
mod queries;

pub use collector::{Collector, TriggerOutcome};
pub use config::{guess_mime_type, IntakeConfig, SensitivePolicy};
pub use error::{IdentityError, IntakeError};
pub use identity::IdentityResolver;
pub use intake::{Intake, UploadOutcome, UploadRequest};
pub use ocr::TextLayerOcr;
pub use policy::TriggerPolicy;
pub use processor::{DocumentProcessor, ProcessOutcome, ANALYZE_DOCUMENT, DETECT_TEXT};
pub use queries::ClaimQueries;
