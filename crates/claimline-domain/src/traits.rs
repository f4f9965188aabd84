//! Trait definitions for external interactions
//!
//! These traits define the boundaries between pipeline logic and
//! infrastructure. Implementations live in other crates (claimline-store,
//! claimline-llm, ...). All of them take `&self` and are shared across
//! tasks, so implementations handle their own locking.

use crate::{DetectedEntity, ServiceError};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A stored JSON document
pub type Document = Map<String, Value>;

/// Object metadata (string key/value pairs)
pub type Metadata = BTreeMap<String, String>;

/// A stored object with its metadata
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    /// Object body
    pub body: Vec<u8>,
    /// Metadata written alongside the body
    pub metadata: Metadata,
    /// Last modification time (epoch millis)
    pub last_modified: u64,
}

/// An entry returned by a prefix listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    /// Full object key
    pub key: String,
    /// Last modification time (epoch millis)
    pub last_modified: u64,
}

/// Blob storage namespaced by key prefix
pub trait ObjectStore: Send + Sync {
    /// Write (or overwrite) an object
    fn put(&self, key: &str, body: &[u8], metadata: Metadata) -> Result<(), ServiceError>;

    /// Read an object; a missing key is `ServiceError::NotFound`
    fn get(&self, key: &str) -> Result<StoredObject, ServiceError>;

    /// List objects whose key starts with `prefix`, sorted by key
    fn list(&self, prefix: &str) -> Result<Vec<ObjectSummary>, ServiceError>;

    /// Copy an object, metadata included
    fn copy(&self, src: &str, dst: &str) -> Result<(), ServiceError>;

    /// Delete an object; deleting a missing key succeeds
    fn delete(&self, key: &str) -> Result<(), ServiceError>;
}

/// Outcome of a conditional create
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The document was written
    Created,
    /// A document already existed under the key; nothing was written
    Conflict,
}

/// A single field-level change applied by [`KeyValueStore::update`]
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    /// Overwrite the field
    Set(String, Value),
    /// Write the field only if it is absent
    SetIfAbsent(String, Value),
    /// Append to an array field unless an equal element is already there
    AddToSet(String, Value),
}

impl FieldUpdate {
    /// Overwrite `field` with `value`
    pub fn set(field: &str, value: impl Into<Value>) -> Self {
        FieldUpdate::Set(field.to_string(), value.into())
    }

    /// Write `field` only when absent
    pub fn set_if_absent(field: &str, value: impl Into<Value>) -> Self {
        FieldUpdate::SetIfAbsent(field.to_string(), value.into())
    }

    /// Add `value` to the set stored in `field`
    pub fn add_to_set(field: &str, value: impl Into<Value>) -> Self {
        FieldUpdate::AddToSet(field.to_string(), value.into())
    }
}

/// Document store addressed by primary key
pub trait KeyValueStore: Send + Sync {
    /// Create the document only if the key is unused
    fn put_if_absent(&self, key: &str, doc: Document) -> Result<PutOutcome, ServiceError>;

    /// Read a document
    fn get(&self, key: &str) -> Result<Option<Document>, ServiceError>;

    /// Write a document unconditionally
    fn put(&self, key: &str, doc: Document) -> Result<(), ServiceError>;

    /// Atomically apply field updates, creating the document if needed
    ///
    /// Fields not named in `updates` are left untouched. Returns the
    /// document as stored after the update.
    fn update(&self, key: &str, updates: &[FieldUpdate]) -> Result<Document, ServiceError>;
}

/// One line of recognized text
#[derive(Debug, Clone, PartialEq)]
pub struct OcrLine {
    /// Recognized text
    pub text: String,
    /// Recognition confidence (0-100)
    pub confidence: f64,
}

/// Output of an OCR pass
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OcrOutput {
    /// Recognized lines in reading order
    pub lines: Vec<OcrLine>,
    /// Number of pages seen
    pub pages: usize,
}

impl OcrOutput {
    /// Lines joined with newlines, trimmed
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }

    /// Mean line confidence, 0.0 when there are no lines
    pub fn mean_confidence(&self) -> f64 {
        if self.lines.is_empty() {
            return 0.0;
        }
        self.lines.iter().map(|l| l.confidence).sum::<f64>() / self.lines.len() as f64
    }
}

/// Text recognition over stored objects
pub trait OcrService: Send + Sync {
    /// Structured analysis (forms, tables)
    fn analyze(&self, object_key: &str) -> Result<OcrOutput, ServiceError>;

    /// Plain text detection, used as the fallback mode
    fn detect_text(&self, object_key: &str) -> Result<OcrOutput, ServiceError>;
}

/// Sensitive-entity detection over bounded chunks of text
pub trait EntityDetector: Send + Sync {
    /// Detect entities; offsets are chunk-relative character positions
    fn detect(&self, chunk: &str) -> Result<Vec<DetectedEntity>, ServiceError>;
}

/// Trait for LLM provider operations
///
/// Implemented by the infrastructure layer (claimline-llm)
pub trait LlmProvider {
    /// Error type for LLM operations
    type Error;

    /// Generate a free-text completion for the prompt
    fn generate(&self, prompt: &str) -> Result<String, Self::Error>;
}

/// Result of a workflow start request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new run was started
    Accepted {
        /// Identifier of the new run
        execution_id: String,
    },
    /// A run with the same dedup key already exists
    AlreadyRunning,
}

/// Starts pipeline runs, deduplicated by key
pub trait WorkflowStarter: Send + Sync {
    /// Start a run unless one already exists for `dedup_key`
    fn start(&self, dedup_key: &str, input: Value) -> Result<StartOutcome, ServiceError>;
}

/// Publish/subscribe notifications
pub trait EventBus: Send + Sync {
    /// Publish a payload to a topic
    fn publish(&self, topic: &str, payload: Value) -> Result<(), ServiceError>;
}

/// Named configuration values (prompt templates and version pointers)
pub trait ParameterStore: Send + Sync {
    /// Read a parameter; `None` when it does not exist
    fn get_parameter(&self, name: &str) -> Result<Option<String>, ServiceError>;
}
