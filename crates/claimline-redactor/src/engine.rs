//! Core Redactor implementation

use crate::chunking::TextChunker;
use crate::config::RedactorConfig;
use crate::error::RedactionError;
use crate::spans::{apply_redactions, merge_spans, protect_placeholders};
use claimline_domain::traits::EntityDetector;
use claimline_domain::{ClaimId, RedactionSpan};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Result of redacting one text
#[derive(Debug, Clone, PartialEq)]
pub struct RedactionOutcome {
    /// Redacted text
    pub text: String,
    /// Merged spans, in original-text character offsets
    pub spans: Vec<RedactionSpan>,
    /// Number of chunks submitted to the detector
    pub chunk_count: usize,
    /// Redacted span count per entity type
    pub entity_counts: BTreeMap<String, usize>,
}

impl RedactionOutcome {
    /// Whether anything was redacted
    pub fn is_clean(&self) -> bool {
        self.spans.is_empty()
    }

    /// Audit record for this redaction
    ///
    /// Carries offsets and entity types only, never the redacted values.
    pub fn audit_record(&self, claim_id: ClaimId, doc_id: &str) -> Value {
        let spans: Vec<Value> = self
            .spans
            .iter()
            .map(|s| json!({ "begin": s.begin, "end": s.end, "type": s.entity_type }))
            .collect();

        json!({
            "claim_id": claim_id.to_string(),
            "doc_id": doc_id,
            "chunk_count": self.chunk_count,
            "redaction_count": self.spans.len(),
            "entity_counts": self.entity_counts,
            "spans": spans,
        })
    }
}

/// Removes sensitive entities from text
pub struct Redactor {
    detector: Arc<dyn EntityDetector>,
    config: RedactorConfig,
}

impl Redactor {
    /// Create a new Redactor
    pub fn new(detector: Arc<dyn EntityDetector>, config: RedactorConfig) -> Self {
        Self { detector, config }
    }

    /// Create a Redactor after validating the configuration
    pub fn try_new(
        detector: Arc<dyn EntityDetector>,
        config: RedactorConfig,
    ) -> Result<Self, RedactionError> {
        config.validate().map_err(RedactionError::Config)?;
        Ok(Self::new(detector, config))
    }

    /// Get the configuration
    pub fn config(&self) -> &RedactorConfig {
        &self.config
    }

    /// Redact every detected entity in `text`
    ///
    /// Fails as a whole if any chunk fails detection.
    pub fn redact(&self, text: &str) -> Result<RedactionOutcome, RedactionError> {
        if text.is_empty() {
            return Ok(RedactionOutcome {
                text: String::new(),
                spans: Vec::new(),
                chunk_count: 0,
                entity_counts: BTreeMap::new(),
            });
        }

        let chunker = TextChunker::new(self.config.chunk_size, self.config.chunk_overlap);
        let chunks = chunker.chunk(text);
        let mut raw = Vec::new();

        for chunk in &chunks {
            let chunk_len = chunk.text.chars().count();
            let entities = self.detector.detect(&chunk.text)?;
            debug!(
                "Chunk at {} ({} chars): {} entities",
                chunk.start,
                chunk_len,
                entities.len()
            );

            for entity in entities {
                if entity.score < self.config.min_score {
                    continue;
                }
                let begin = entity.begin.min(chunk_len);
                let end = entity.end.min(chunk_len);
                raw.push(RedactionSpan::new(
                    chunk.start + begin,
                    chunk.start + end,
                    entity.entity_type,
                ));
            }
        }

        let spans = merge_spans(protect_placeholders(text, raw));
        let mut entity_counts = BTreeMap::new();
        for span in &spans {
            *entity_counts.entry(span.entity_type.clone()).or_insert(0) += 1;
        }

        info!(
            "Redacted {} spans across {} chunks",
            spans.len(),
            chunks.len()
        );

        Ok(RedactionOutcome {
            text: apply_redactions(text, &spans),
            spans,
            chunk_count: chunks.len(),
            entity_counts,
        })
    }

    /// Whether any chunk holds an entity scoring at or above the threshold
    pub fn contains_sensitive(&self, text: &str) -> Result<bool, RedactionError> {
        if text.is_empty() {
            return Ok(false);
        }

        let chunker = TextChunker::new(self.config.chunk_size, self.config.chunk_overlap);
        for chunk in chunker.chunk(text) {
            let entities = self.detector.detect(&chunk.text)?;
            if entities
                .iter()
                .any(|e| e.score >= self.config.phi_threshold)
            {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
