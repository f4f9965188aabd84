//! Claimline Redactor
//!
//! Removes sensitive entities (names, contact details, identifiers) from
//! extracted document text before anything downstream sees it.
//!
//! # Overview
//!
//! Entity detectors only accept bounded input, so long texts are split into
//! overlapping chunks. Spans found in each chunk are shifted back to absolute
//! offsets, merged so that no two overlap, and replaced from the end of the
//! text towards the start with `[REDACTED:<TYPE>]` placeholders.
//!
//! # Architecture
//!
//! ```text
//! text → TextChunker → EntityDetector (per chunk) → merge_spans → apply_redactions
//! ```
//!
//! A detector failure aborts the whole document: no partially redacted text
//! is ever returned.
//!
//! # Example Usage
//!
//! ```
//! use claimline_redactor::{PatternDetector, Redactor, RedactorConfig};
//! use std::sync::Arc;
//!
//! let redactor = Redactor::new(Arc::new(PatternDetector::new()), RedactorConfig::default());
//! let outcome = redactor.redact("Name: Jane Doe, Total: $900").unwrap();
//!
//! assert_eq!(outcome.text, "Name: [REDACTED:NAME], Total: $900");
//! ```

#![warn(missing_docs)]

mod chunking;
mod config;
mod engine;
mod error;
mod pattern;
mod spans;

pub use chunking::{TextChunk, TextChunker};
pub use config::RedactorConfig;
pub use engine::{RedactionOutcome, Redactor};
pub use error::RedactionError;
pub use pattern::PatternDetector;
pub use spans::{apply_redactions, merge_spans, placeholder};
