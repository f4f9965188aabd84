//! Extraction step: OCR, redaction and extract persistence

use crate::config::{IntakeConfig, SensitivePolicy};
use crate::error::IntakeError;
use crate::quarantine::{publish_failure, quarantine_object};
use claimline_domain::events::{PHI_DETECTED, REASON_PHI_REVIEW};
use claimline_domain::keys::{self, claim_key, extract_object_key, redaction_audit_key};
use claimline_domain::traits::{
    EventBus, FieldUpdate, KeyValueStore, Metadata, ObjectStore, OcrOutput, OcrService,
};
use claimline_domain::{
    fields, now_millis, ClaimId, ClaimStatus, DocumentExtract, DocumentRef, ExtractionMetadata,
};
use claimline_redactor::Redactor;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Extractor name for structured analysis
pub const ANALYZE_DOCUMENT: &str = "ANALYZE_DOCUMENT";

/// Extractor name for the plain text fallback
pub const DETECT_TEXT: &str = "DETECT_TEXT";

/// Result of processing one document
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    /// A redacted extract was written
    Extracted(ExtractionMetadata),
    /// The document was quarantined for a privacy review
    Quarantined {
        /// Document that was quarantined
        doc_id: String,
        /// Where the source now lives
        quarantine_key: String,
    },
}

/// Turns accepted documents into redacted extracts
pub struct DocumentProcessor {
    objects: Arc<dyn ObjectStore>,
    store: Arc<dyn KeyValueStore>,
    ocr: Arc<dyn OcrService>,
    redactor: Arc<Redactor>,
    events: Arc<dyn EventBus>,
    config: IntakeConfig,
}

impl DocumentProcessor {
    /// Create a new processor
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        store: Arc<dyn KeyValueStore>,
        ocr: Arc<dyn OcrService>,
        redactor: Arc<Redactor>,
        events: Arc<dyn EventBus>,
        config: IntakeConfig,
    ) -> Self {
        Self {
            objects,
            store,
            ocr,
            redactor,
            events,
            config,
        }
    }

    /// Process one accepted document
    ///
    /// The extract is written only after redaction succeeded as a whole; a
    /// detector failure leaves nothing behind and can be retried.
    pub fn process_document(
        &self,
        claim_id: ClaimId,
        document: &DocumentRef,
    ) -> Result<ProcessOutcome, IntakeError> {
        let external_id = self.source_external_id(&document.key);
        let (output, extractor) = self.recognize(&document.key)?;
        let text = output.text();
        let confidence = output.mean_confidence();

        debug!(
            "OCR of {} via {}: {} chars, {} pages, confidence {:.1}",
            document.doc_id,
            extractor,
            text.chars().count(),
            output.pages,
            confidence
        );

        if self.config.sensitive_policy == SensitivePolicy::Quarantine
            && self.redactor.contains_sensitive(&text)?
        {
            let target = quarantine_object(self.objects.as_ref(), &document.key, REASON_PHI_REVIEW)?;
            publish_failure(self.events.as_ref(), Some(claim_id), PHI_DETECTED, &target);
            return Ok(ProcessOutcome::Quarantined {
                doc_id: document.doc_id.clone(),
                quarantine_key: target,
            });
        }

        let redaction = self.redactor.redact(&text)?;

        let audit_key = redaction_audit_key(&claim_id, &document.doc_id);
        let mut audit = redaction.audit_record(claim_id, &document.doc_id);
        audit["extractor"] = extractor.into();
        audit["confidence"] = confidence.into();
        audit["pages"] = output.pages.into();
        self.objects
            .put(&audit_key, audit.to_string().as_bytes(), Metadata::new())?;

        let extract = DocumentExtract {
            claim_id,
            doc_id: document.doc_id.clone(),
            text: redaction.text,
            document_type: Some(document.document_type),
            external_id,
            confidence,
            extractor: extractor.to_string(),
        };
        let extract_key = extract_object_key(&claim_id, &document.doc_id);
        self.objects
            .put(&extract_key, extract.text.as_bytes(), extract.object_metadata())?;

        let metadata = ExtractionMetadata {
            doc_id: document.doc_id.clone(),
            extractor: extractor.to_string(),
            confidence,
            extract_key,
            audit_key,
        };
        self.store.update(
            &claim_key(&claim_id),
            &[
                FieldUpdate::set(fields::STATUS, ClaimStatus::Extracted.as_str()),
                FieldUpdate::add_to_set(fields::EXTRACTIONS, serde_json::to_value(&metadata)?),
                FieldUpdate::set(fields::UPDATED_AT, now_millis()),
            ],
        )?;

        info!(
            "Extracted {} for claim {} ({} redactions)",
            document.doc_id,
            claim_id,
            redaction.spans.len()
        );
        Ok(ProcessOutcome::Extracted(metadata))
    }

    /// Structured analysis, falling back to plain detection on weak output
    fn recognize(&self, key: &str) -> Result<(OcrOutput, &'static str), IntakeError> {
        let analyzed = self.ocr.analyze(key)?;
        let confidence = analyzed.mean_confidence();
        if !analyzed.text().is_empty() && confidence >= self.config.ocr_confidence_floor {
            return Ok((analyzed, ANALYZE_DOCUMENT));
        }

        warn!(
            "Analysis of '{}' was weak (confidence {:.1}), falling back to text detection",
            key, confidence
        );
        Ok((self.ocr.detect_text(key)?, DETECT_TEXT))
    }

    /// External id propagated on the source object, if any
    fn source_external_id(&self, key: &str) -> Option<String> {
        match self.objects.get(key) {
            Ok(object) => object
                .metadata
                .get(keys::META_EXTERNAL_ID)
                .filter(|v| v.as_str() != keys::UNKNOWN_EXTERNAL_ID)
                .cloned(),
            Err(e) => {
                warn!("Could not read metadata of '{}': {}", key, e);
                None
            }
        }
    }
}
