//! Integration tests for claimline-gatekeeper on a file-backed store

use claimline_domain::events::{CLAIM_FINALIZED, REVIEW_COMPLETED};
use claimline_domain::keys::{claim_key, payout_key};
use claimline_domain::traits::KeyValueStore;
use claimline_domain::{ClaimId, ClaimRecord, ClaimStatus};
use claimline_gatekeeper::{FinalizeOutcome, PayoutGuard, ReviewDesk, ReviewRequest};
use claimline_store::{MemoryEventBus, SqliteKvStore};
use serde_json::json;
use std::sync::Arc;
use std::thread;

fn seed(store: &SqliteKvStore, claim_id: ClaimId, status: &str) {
    let doc = json!({
        "claim_id": claim_id.to_string(),
        "external_id": "CLM-42",
        "status": status,
        "recommendation": "APPROVE",
        "recommended_amount": 12000.0,
        "context_bundle_key": format!("{}/context/context_bundle.json", claim_id),
    });
    store
        .put(&claim_key(&claim_id), doc.as_object().cloned().unwrap())
        .unwrap();
}

#[test]
fn test_racing_finalize_records_one_payout() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteKvStore::new(dir.path().join("claims.db")).unwrap());
    let events = MemoryEventBus::new();
    let guard = Arc::new(PayoutGuard::new(store.clone(), Arc::new(events.clone())));
    let id = ClaimId::new();
    seed(&store, id, "PROCESSING");

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let guard = guard.clone();
            thread::spawn(move || guard.finalize(id, "APPROVE", 640.0).unwrap())
        })
        .collect();
    let outcomes: Vec<FinalizeOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let recorded = outcomes
        .iter()
        .filter(|o| matches!(o, FinalizeOutcome::Recorded(_)))
        .count();
    assert_eq!(recorded, 1);
    assert_eq!(store.count_prefix("PAYOUT#").unwrap(), 1);
    assert!(store.get(&payout_key(&id)).unwrap().is_some());
    assert_eq!(events.events_for(CLAIM_FINALIZED).len(), 1);
}

#[test]
fn test_review_of_held_claim_closes_it() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteKvStore::new(dir.path().join("claims.db")).unwrap());
    let events = MemoryEventBus::new();
    let desk = ReviewDesk::new(store.clone(), Arc::new(events.clone()));
    let id = ClaimId::new();
    seed(&store, id, "NEEDS_REVIEW");

    let outcome = desk
        .submit_review(&ReviewRequest {
            claim_id: id,
            reviewer_id: "senior-adjuster".into(),
            decision: "APPROVE".into(),
            justification: "High value but fully documented".into(),
            amount: None,
        })
        .unwrap();
    assert!(outcome.ai_agreement);

    let record =
        ClaimRecord::from_document(&store.get(&claim_key(&id)).unwrap().unwrap()).unwrap();
    assert_eq!(record.status, ClaimStatus::ClosedPaid);
    assert_eq!(record.final_payout, Some(12000.0));
    assert_eq!(record.external_id.as_deref(), Some("CLM-42"));
    assert!(record.context_bundle_key.is_some());
    assert_eq!(events.events_for(REVIEW_COMPLETED).len(), 1);
}
