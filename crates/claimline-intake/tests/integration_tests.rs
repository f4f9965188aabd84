//! Integration tests for claimline-intake

use claimline_domain::traits::{StartOutcome, WorkflowStarter};
use claimline_domain::{ClaimId, ServiceError};
use claimline_intake::{
    ClaimQueries, IdentityResolver, Intake, IntakeConfig, TriggerOutcome, UploadOutcome,
    UploadRequest,
};
use claimline_store::{MemoryEventBus, MemoryObjectStore, SqliteKvStore};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Starter that accepts each dedup key once
#[derive(Default)]
struct DedupStarter {
    keys: Mutex<HashSet<String>>,
}

impl WorkflowStarter for DedupStarter {
    fn start(&self, dedup_key: &str, _input: Value) -> Result<StartOutcome, ServiceError> {
        if self.keys.lock().unwrap().insert(dedup_key.to_string()) {
            Ok(StartOutcome::Accepted {
                execution_id: uuid::Uuid::new_v4().to_string(),
            })
        } else {
            Ok(StartOutcome::AlreadyRunning)
        }
    }
}

#[test]
fn test_concurrent_resolution_yields_one_claim() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(SqliteKvStore::new(dir.path().join("claims.db")).unwrap());

    let ids: Vec<ClaimId> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let resolver = IdentityResolver::new(store.clone());
                scope.spawn(move || resolver.resolve_or_create("CLM-1").unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let distinct: HashSet<ClaimId> = ids.into_iter().collect();
    assert_eq!(distinct.len(), 1);
    assert_eq!(store.count_prefix("MAPPING#").unwrap(), 1);
}

#[test]
fn test_concurrent_uploads_share_one_claim_and_one_run() {
    let store = Arc::new(SqliteKvStore::in_memory().unwrap());
    let objects = Arc::new(MemoryObjectStore::new());
    let starter = Arc::new(DedupStarter::default());
    let intake = Intake::new(
        store.clone(),
        objects,
        starter.clone(),
        Arc::new(MemoryEventBus::new()),
        IntakeConfig::default(),
    )
    .unwrap();

    let uploads = [
        ("fnol.txt", "FNOL_FORM"),
        ("estimate.txt", "ESTIMATE"),
        ("photo.jpg", "DAMAGE_PHOTO"),
        ("police.pdf", "POLICE_REPORT"),
    ];

    let outcomes: Vec<UploadOutcome> = std::thread::scope(|scope| {
        let handles: Vec<_> = uploads
            .iter()
            .map(|(name, doc_type)| {
                let intake = &intake;
                scope.spawn(move || {
                    let key = intake.stage_upload("CLM-77", name, b"body").unwrap();
                    intake
                        .accept_upload(&UploadRequest {
                            external_id: "CLM-77".to_string(),
                            source_key: key,
                            doc_type: doc_type.to_string(),
                            mime_type: None,
                            channel: None,
                        })
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut claim_ids = HashSet::new();
    let mut started = 0;
    for outcome in outcomes {
        let UploadOutcome::Accepted { claim_id, trigger, .. } = outcome else {
            panic!("every upload is valid");
        };
        claim_ids.insert(claim_id);
        if matches!(trigger, TriggerOutcome::Started { .. }) {
            started += 1;
        }
    }
    assert_eq!(claim_ids.len(), 1);
    assert_eq!(started, 1);
    assert_eq!(starter.keys.lock().unwrap().len(), 1);

    let record = ClaimQueries::new(store)
        .status_by_external_id("CLM-77")
        .unwrap()
        .unwrap();
    assert_eq!(record.received_documents.len(), 4);
}
