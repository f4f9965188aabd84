//! Document intake: validation, acceptance and run triggering

use crate::collector::{Collector, TriggerOutcome};
use crate::config::{guess_mime_type, IntakeConfig};
use crate::error::IntakeError;
use crate::identity::IdentityResolver;
use crate::quarantine::{publish_failure, quarantine_object};
use claimline_domain::events::{REASON_SCHEMA_ERROR, SCHEMA_VIOLATION};
use claimline_domain::keys::{self, incoming_key, source_object_key};
use claimline_domain::traits::{EventBus, KeyValueStore, Metadata, ObjectStore, WorkflowStarter};
use claimline_domain::{ClaimId, DocumentRef, DocumentType};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// A staged upload waiting to be accepted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRequest {
    /// External claim number supplied by the caller
    pub external_id: String,
    /// Object key of the staged upload
    pub source_key: String,
    /// Caller-supplied document type
    pub doc_type: String,
    /// Caller-supplied MIME type; guessed from the file name when absent
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Intake channel; the configured default when absent
    #[serde(default)]
    pub channel: Option<String>,
}

/// Result of accepting an upload
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    /// The document was recorded against its claim
    Accepted {
        /// Canonical claim id
        claim_id: ClaimId,
        /// The recorded document
        document: DocumentRef,
        /// Every document the claim holds now
        received: Vec<DocumentRef>,
        /// Whether a run was started
        trigger: TriggerOutcome,
    },
    /// The upload failed validation and was quarantined
    Quarantined {
        /// Canonical claim id
        claim_id: ClaimId,
        /// Where the upload now lives
        quarantine_key: String,
        /// Why it was rejected
        reason: String,
    },
}

/// Entry point for uploaded documents
pub struct Intake {
    identity: IdentityResolver,
    collector: Collector,
    objects: Arc<dyn ObjectStore>,
    events: Arc<dyn EventBus>,
    config: IntakeConfig,
}

impl Intake {
    /// Create a new intake
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        objects: Arc<dyn ObjectStore>,
        starter: Arc<dyn WorkflowStarter>,
        events: Arc<dyn EventBus>,
        config: IntakeConfig,
    ) -> Result<Self, IntakeError> {
        config.validate().map_err(IntakeError::Config)?;
        Ok(Self {
            identity: IdentityResolver::new(store.clone()),
            collector: Collector::new(store, starter, config.trigger_policy.clone()),
            objects,
            events,
            config,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &IntakeConfig {
        &self.config
    }

    /// Write an upload body to the staging area and return its key
    pub fn stage_upload(
        &self,
        external_id: &str,
        filename: &str,
        body: &[u8],
    ) -> Result<String, IntakeError> {
        if external_id.trim().is_empty() {
            return Err(IntakeError::InvalidRequest("external_id is empty".to_string()));
        }
        let filename = file_name(filename);
        if filename.is_empty() {
            return Err(IntakeError::InvalidRequest("filename is empty".to_string()));
        }

        let key = incoming_key(external_id, filename);
        self.objects.put(&key, body, Metadata::new())?;
        Ok(key)
    }

    /// Accept a staged upload
    ///
    /// Resolves the claim, validates the document and MIME types, copies the
    /// upload to its canonical location and records it. Invalid uploads are
    /// quarantined and reported; the claim keeps its other documents.
    pub fn accept_upload(&self, request: &UploadRequest) -> Result<UploadOutcome, IntakeError> {
        if request.external_id.trim().is_empty() {
            return Err(IntakeError::InvalidRequest("external_id is empty".to_string()));
        }

        let claim_id = self.identity.resolve_or_create(&request.external_id)?;
        let filename = file_name(&request.source_key);
        let mime_type = request
            .mime_type
            .clone()
            .unwrap_or_else(|| guess_mime_type(filename).to_string());

        let document_type = match DocumentType::parse(&request.doc_type) {
            Some(t) if self.config.accepts_mime(&mime_type) => t,
            _ => {
                warn!(
                    "Rejecting '{}' for claim {}: doc type '{}', mime '{}'",
                    request.source_key, claim_id, request.doc_type, mime_type
                );
                let target =
                    quarantine_object(self.objects.as_ref(), &request.source_key, REASON_SCHEMA_ERROR)?;
                publish_failure(self.events.as_ref(), Some(claim_id), SCHEMA_VIOLATION, &target);
                return Ok(UploadOutcome::Quarantined {
                    claim_id,
                    quarantine_key: target,
                    reason: REASON_SCHEMA_ERROR.to_string(),
                });
            }
        };

        let doc_id = uuid::Uuid::new_v4().to_string();
        let key = source_object_key(&claim_id, &doc_id, filename);
        let source = self.objects.get(&request.source_key)?;

        let mut metadata = source.metadata;
        metadata.insert(keys::META_EXTERNAL_ID.to_string(), request.external_id.clone());
        metadata.insert(keys::META_DOC_TYPE.to_string(), document_type.as_str().to_string());
        self.objects.put(&key, &source.body, metadata)?;

        let channel = request
            .channel
            .as_deref()
            .unwrap_or(&self.config.default_channel);
        let document = DocumentRef {
            doc_id,
            document_type,
            key,
            channel: channel.to_string(),
        };

        let received =
            self.collector
                .record_document(claim_id, &request.external_id, &document, channel)?;
        let trigger = self.collector.maybe_trigger_pipeline(claim_id, &received)?;

        info!(
            "Accepted {} {} for claim {} ({} documents)",
            document.document_type,
            document.doc_id,
            claim_id,
            received.len()
        );

        Ok(UploadOutcome::Accepted {
            claim_id,
            document,
            received,
            trigger,
        })
    }
}

/// Last path segment of an object key
fn file_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimline_domain::events::INGESTION_FAILED;
    use claimline_domain::traits::StartOutcome;
    use claimline_domain::ServiceError;
    use claimline_store::{MemoryEventBus, MemoryObjectStore, SqliteKvStore};
    use serde_json::Value;

    struct AcceptAll;

    impl WorkflowStarter for AcceptAll {
        fn start(&self, dedup_key: &str, _input: Value) -> Result<StartOutcome, ServiceError> {
            Ok(StartOutcome::Accepted {
                execution_id: format!("exec-{}", dedup_key),
            })
        }
    }

    fn intake() -> (Intake, Arc<MemoryObjectStore>, MemoryEventBus) {
        let objects = Arc::new(MemoryObjectStore::new());
        let events = MemoryEventBus::new();
        let intake = Intake::new(
            Arc::new(SqliteKvStore::in_memory().unwrap()),
            objects.clone(),
            Arc::new(AcceptAll),
            Arc::new(events.clone()),
            IntakeConfig::default(),
        )
        .unwrap();
        (intake, objects, events)
    }

    fn request(source_key: String, doc_type: &str) -> UploadRequest {
        UploadRequest {
            external_id: "CLM-000123".to_string(),
            source_key,
            doc_type: doc_type.to_string(),
            mime_type: None,
            channel: None,
        }
    }

    #[test]
    fn test_accepted_upload_is_copied_with_metadata() {
        let (intake, objects, _) = intake();
        let staged = intake.stage_upload("CLM-000123", "fnol.txt", b"FNOL").unwrap();

        let outcome = intake.accept_upload(&request(staged, "fnol-form")).unwrap();
        let UploadOutcome::Accepted { claim_id, document, received, trigger } = outcome else {
            panic!("expected acceptance");
        };

        assert_eq!(document.document_type, DocumentType::FnolForm);
        assert_eq!(document.channel, "portal");
        assert!(document.key.starts_with(&format!("{}/doc_id=", claim_id)));
        assert!(document.key.ends_with("/fnol.txt"));
        assert_eq!(received.len(), 1);
        assert_eq!(trigger, TriggerOutcome::NotReady);

        let stored = objects.get(&document.key).unwrap();
        assert_eq!(stored.metadata.get(keys::META_EXTERNAL_ID).map(String::as_str), Some("CLM-000123"));
        assert_eq!(stored.metadata.get(keys::META_DOC_TYPE).map(String::as_str), Some("FNOL_FORM"));
    }

    #[test]
    fn test_complete_packet_triggers_run() {
        let (intake, _, _) = intake();
        let fnol = intake.stage_upload("CLM-000123", "fnol.txt", b"FNOL").unwrap();
        let estimate = intake.stage_upload("CLM-000123", "estimate.pdf", b"%PDF").unwrap();

        intake.accept_upload(&request(fnol, "FNOL_FORM")).unwrap();
        let outcome = intake.accept_upload(&request(estimate, "ESTIMATE")).unwrap();

        assert!(matches!(
            outcome,
            UploadOutcome::Accepted { trigger: TriggerOutcome::Started { .. }, .. }
        ));
    }

    #[test]
    fn test_unknown_doc_type_is_quarantined() {
        let (intake, objects, events) = intake();
        let staged = intake.stage_upload("CLM-000123", "selfie.jpg", b"jpeg").unwrap();

        let outcome = intake.accept_upload(&request(staged.clone(), "SELFIE")).unwrap();
        let UploadOutcome::Quarantined { quarantine_key, reason, .. } = outcome else {
            panic!("expected quarantine");
        };

        assert_eq!(reason, "schema-error");
        assert_eq!(quarantine_key, format!("quarantine/schema-error/{}", staged));
        assert!(objects.get(&staged).is_err());
        assert!(objects.get(&quarantine_key).is_ok());

        let failures = events.events_for(INGESTION_FAILED);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].payload["error_code"], "SCHEMA_VIOLATION");
    }

    #[test]
    fn test_unsupported_mime_is_quarantined() {
        let (intake, _, _) = intake();
        let staged = intake.stage_upload("CLM-000123", "estimate.zip", b"PK").unwrap();

        let outcome = intake.accept_upload(&request(staged, "ESTIMATE")).unwrap();
        assert!(matches!(outcome, UploadOutcome::Quarantined { .. }));
    }

    #[test]
    fn test_explicit_mime_and_channel_win() {
        let (intake, _, _) = intake();
        let staged = intake.stage_upload("CLM-000123", "scan", b"%PDF").unwrap();
        let mut req = request(staged, "POLICE_REPORT");
        req.mime_type = Some("application/pdf".to_string());
        req.channel = Some("email".to_string());

        let outcome = intake.accept_upload(&req).unwrap();
        let UploadOutcome::Accepted { document, .. } = outcome else {
            panic!("expected acceptance");
        };
        assert_eq!(document.channel, "email");
    }

    #[test]
    fn test_empty_external_id_is_rejected() {
        let (intake, _, _) = intake();
        let mut req = request("incoming/x/a.pdf".to_string(), "ESTIMATE");
        req.external_id = "  ".to_string();
        assert!(matches!(
            intake.accept_upload(&req),
            Err(IntakeError::InvalidRequest(_))
        ));
    }
}
