//! Regex-based entity detector
//!
//! Stands in for a hosted detection service in local runs and tests. It only
//! finds what it has patterns for: labelled names, e-mail addresses, phone
//! numbers and social security numbers.

use claimline_domain::traits::EntityDetector;
use claimline_domain::{DetectedEntity, ServiceError};
use regex::Regex;
use std::sync::LazyLock;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("email pattern is valid")
});

static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+\d{1,3}[\s-]?)?(?:\(\d{3}\)\s?|\b\d{3}[-.\s])\d{3}[-.\s]\d{4}\b")
        .expect("phone pattern is valid")
});

static SSN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").expect("ssn pattern is valid"));

static NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:Name|NAME|Claimant|Policyholder|Insured):[ \t]*([A-Z][A-Za-z'-]+(?:[ \t]+[A-Z][A-Za-z'-]+)*)",
    )
    .expect("name pattern is valid")
});

/// Detects entities with fixed regular expressions
#[derive(Debug, Clone, Default)]
pub struct PatternDetector;

impl PatternDetector {
    /// Create a new detector
    pub fn new() -> Self {
        Self
    }
}

/// Converts byte offsets of `text` into character offsets
struct CharIndex {
    starts: Vec<usize>,
}

impl CharIndex {
    fn new(text: &str) -> Self {
        Self {
            starts: text.char_indices().map(|(i, _)| i).collect(),
        }
    }

    fn char_offset(&self, byte: usize) -> usize {
        self.starts.partition_point(|&b| b < byte)
    }
}

impl EntityDetector for PatternDetector {
    fn detect(&self, chunk: &str) -> Result<Vec<DetectedEntity>, ServiceError> {
        let index = CharIndex::new(chunk);
        let mut found = Vec::new();
        let mut push = |start: usize, end: usize, entity_type: &str, score: f64| {
            found.push(DetectedEntity {
                begin: index.char_offset(start),
                end: index.char_offset(end),
                entity_type: entity_type.to_string(),
                score,
            });
        };

        for m in EMAIL.find_iter(chunk) {
            push(m.start(), m.end(), "EMAIL", 0.99);
        }
        for m in PHONE.find_iter(chunk) {
            push(m.start(), m.end(), "PHONE", 0.9);
        }
        for m in SSN.find_iter(chunk) {
            push(m.start(), m.end(), "SSN", 0.99);
        }
        for caps in NAME.captures_iter(chunk) {
            if let Some(m) = caps.get(1) {
                push(m.start(), m.end(), "NAME", 0.95);
            }
        }

        found.sort_by_key(|e| (e.begin, e.end));
        Ok(found)
    }
}
