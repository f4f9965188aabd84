//! Sensitive-entity spans

use serde::{Deserialize, Serialize};

/// A sensitive entity reported by a detector
///
/// Offsets are character positions, half-open, relative to the text that was
/// submitted for detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedEntity {
    /// First character of the entity
    pub begin: usize,
    /// One past the last character
    pub end: usize,
    /// Entity category (NAME, EMAIL, ...)
    pub entity_type: String,
    /// Detector confidence (0.0-1.0)
    pub score: f64,
}

/// A range of the original text that will be replaced by a placeholder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionSpan {
    /// First character (inclusive)
    pub begin: usize,
    /// One past the last character (exclusive)
    pub end: usize,
    /// Entity category
    pub entity_type: String,
}

impl RedactionSpan {
    /// Create a new span
    pub fn new(begin: usize, end: usize, entity_type: impl Into<String>) -> Self {
        Self {
            begin,
            end,
            entity_type: entity_type.into(),
        }
    }

    /// Number of characters covered
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.begin)
    }

    /// Whether the span covers nothing
    pub fn is_empty(&self) -> bool {
        self.end <= self.begin
    }
}
