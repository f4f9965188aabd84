//! Payout guard - the single write that closes a claim

use crate::error::GatekeeperError;
use crate::terminal::map_decision;
use claimline_domain::events::CLAIM_FINALIZED;
use claimline_domain::keys::{claim_key, payout_key};
use claimline_domain::traits::{Document, EventBus, FieldUpdate, KeyValueStore, PutOutcome};
use claimline_domain::{
    fields, now_millis, ClaimId, ClaimRecord, ClaimStatus, PayoutRecord, ServiceError,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Why a finalize call wrote nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The claim was already CLOSED_PAID
    AlreadyClosed,
    /// A payout record already exists; a racing duplicate got there first
    AlreadyRecorded,
}

/// Result of [`PayoutGuard::finalize`]
#[derive(Debug, Clone, PartialEq)]
pub enum FinalizeOutcome {
    /// The payout record was created and the claim closed
    Recorded(PayoutRecord),
    /// Nothing was written
    Skipped(SkipReason),
}

/// Amount that may be recorded for a terminal state
///
/// Only an approval pays, and only a finite, non-negative amount.
pub fn guarded_amount(state: ClaimStatus, amount: f64) -> f64 {
    if state == ClaimStatus::Approved && amount.is_finite() && amount >= 0.0 {
        amount
    } else {
        0.0
    }
}

/// Records the final outcome of a claim at most once
pub struct PayoutGuard {
    store: Arc<dyn KeyValueStore>,
    events: Arc<dyn EventBus>,
}

impl PayoutGuard {
    /// Create a new guard
    pub fn new(store: Arc<dyn KeyValueStore>, events: Arc<dyn EventBus>) -> Self {
        Self { store, events }
    }

    /// Close a claim with the given decision
    ///
    /// The payout record is created with a conditional write, so duplicate
    /// triggers for the same claim record one payout between them. The claim
    /// record is updated field by field; evidence links such as the context
    /// bundle key are left as they are. A call that finds the record but a
    /// claim without a terminal state finishes the close from the record, so
    /// retrying after a failed claim update is safe.
    pub fn finalize(
        &self,
        claim_id: ClaimId,
        decision: &str,
        amount: f64,
    ) -> Result<FinalizeOutcome, GatekeeperError> {
        let state = map_decision(decision)?;

        let doc = self
            .store
            .get(&claim_key(&claim_id))?
            .ok_or(GatekeeperError::ClaimNotFound(claim_id))?;
        let claim = ClaimRecord::from_document(&doc)?;
        if claim.status == ClaimStatus::ClosedPaid {
            info!("Claim {} is already CLOSED_PAID, skipping payout", claim_id);
            return Ok(FinalizeOutcome::Skipped(SkipReason::AlreadyClosed));
        }
        if claim.context_bundle_key.is_none() {
            warn!("Claim {} has no context bundle link at finalization", claim_id);
        }

        let recorded = guarded_amount(state, amount);
        if recorded != amount {
            warn!(
                "Recording {:.2} instead of {} for claim {} ({})",
                recorded, amount, claim_id, state
            );
        }

        let record = PayoutRecord {
            claim_id,
            amount: recorded,
            paid_at: now_millis(),
            terminal_state: state,
            decision: decision.trim().to_uppercase(),
        };

        match self.store.put_if_absent(&payout_key(&claim_id), to_document(&record)?)? {
            PutOutcome::Created => {}
            PutOutcome::Conflict => return self.resume(&claim),
        }

        self.close_claim(&record)?;
        Ok(FinalizeOutcome::Recorded(record))
    }

    /// Handle a payout record that already exists
    ///
    /// A claim with a terminal state was closed by whoever wrote the record.
    /// Without one, the earlier call stopped between the two writes, so the
    /// stored record is applied to the claim now.
    fn resume(&self, claim: &ClaimRecord) -> Result<FinalizeOutcome, GatekeeperError> {
        let claim_id = claim.claim_id;
        if claim.terminal_state.is_some() {
            debug!("Payout for claim {} already recorded", claim_id);
            return Ok(FinalizeOutcome::Skipped(SkipReason::AlreadyRecorded));
        }

        let key = payout_key(&claim_id);
        let stored = self
            .store
            .get(&key)?
            .ok_or(GatekeeperError::Service(ServiceError::NotFound(key)))?;
        let record: PayoutRecord = serde_json::from_value(Value::Object(stored))?;
        warn!(
            "Claim {} has a payout record but no terminal state, completing it",
            claim_id
        );
        self.close_claim(&record)?;
        Ok(FinalizeOutcome::Recorded(record))
    }

    /// Write the terminal fields from a payout record and announce it
    fn close_claim(&self, record: &PayoutRecord) -> Result<(), GatekeeperError> {
        let claim_id = record.claim_id;
        let state = record.terminal_state;
        let status = match state {
            ClaimStatus::Approved => ClaimStatus::ClosedPaid,
            other => other,
        };
        self.store.update(
            &claim_key(&claim_id),
            &[
                FieldUpdate::set(fields::STATUS, status.as_str()),
                FieldUpdate::set(fields::TERMINAL_STATE, state.as_str()),
                FieldUpdate::set(fields::FINAL_PAYOUT, record.amount),
                FieldUpdate::set(fields::PAYOUT_AT, record.paid_at),
                FieldUpdate::set(fields::UPDATED_AT, record.paid_at),
            ],
        )?;

        info!(
            "Finalized claim {} as {} with payout {:.2}",
            claim_id, status, record.amount
        );

        let payload = json!({
            "claim_id": claim_id.to_string(),
            "status": status.as_str(),
            "terminal_state": state.as_str(),
            "amount": record.amount,
        });
        if let Err(e) = self.events.publish(CLAIM_FINALIZED, payload) {
            warn!("Failed to publish {} for claim {}: {}", CLAIM_FINALIZED, claim_id, e);
        }
        Ok(())
    }
}

fn to_document(record: &PayoutRecord) -> Result<Document, GatekeeperError> {
    match serde_json::to_value(record)? {
        Value::Object(doc) => Ok(doc),
        other => Err(GatekeeperError::Serialization(format!(
            "payout record encoded as {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimline_store::{MemoryEventBus, SqliteKvStore};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixture {
        store: Arc<SqliteKvStore>,
        events: MemoryEventBus,
        guard: PayoutGuard,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(SqliteKvStore::in_memory().unwrap());
        let events = MemoryEventBus::new();
        let guard = PayoutGuard::new(store.clone(), Arc::new(events.clone()));
        Fixture { store, events, guard }
    }

    fn seed(store: &SqliteKvStore, claim_id: ClaimId, status: ClaimStatus) {
        let doc = json!({
            "claim_id": claim_id.to_string(),
            "external_id": "CLM-9",
            "status": status.as_str(),
            "context_bundle_key": format!("{}/context/context_bundle.json", claim_id),
        });
        store
            .put(&claim_key(&claim_id), doc.as_object().cloned().unwrap())
            .unwrap();
    }

    fn claim(store: &SqliteKvStore, claim_id: ClaimId) -> ClaimRecord {
        ClaimRecord::from_document(&store.get(&claim_key(&claim_id)).unwrap().unwrap()).unwrap()
    }

    #[test]
    fn test_approval_closes_and_pays() {
        let f = fixture();
        let id = ClaimId::new();
        seed(&f.store, id, ClaimStatus::Processing);

        let outcome = f.guard.finalize(id, "approve", 640.0).unwrap();
        let FinalizeOutcome::Recorded(record) = outcome else {
            panic!("expected a payout record");
        };
        assert_eq!(record.amount, 640.0);
        assert_eq!(record.terminal_state, ClaimStatus::Approved);
        assert_eq!(record.decision, "APPROVE");

        let stored = claim(&f.store, id);
        assert_eq!(stored.status, ClaimStatus::ClosedPaid);
        assert_eq!(stored.terminal_state, Some(ClaimStatus::Approved));
        assert_eq!(stored.final_payout, Some(640.0));
        assert_eq!(stored.payout_at, Some(record.paid_at));
        assert_eq!(f.events.events_for(CLAIM_FINALIZED).len(), 1);
    }

    #[test]
    fn test_denied_records_zero_and_keeps_evidence_link() {
        let f = fixture();
        let id = ClaimId::new();
        seed(&f.store, id, ClaimStatus::Processing);
        let before = claim(&f.store, id).context_bundle_key;

        let outcome = f.guard.finalize(id, "DENIED", 999.99).unwrap();
        assert!(matches!(outcome, FinalizeOutcome::Recorded(ref r) if r.amount == 0.0));

        let stored = claim(&f.store, id);
        assert_eq!(stored.status, ClaimStatus::Denied);
        assert_eq!(stored.final_payout, Some(0.0));
        assert_eq!(stored.context_bundle_key, before);
        assert_eq!(stored.external_id.as_deref(), Some("CLM-9"));

        let payout: PayoutRecord = serde_json::from_value(Value::Object(
            f.store.get(&payout_key(&id)).unwrap().unwrap(),
        ))
        .unwrap();
        assert_eq!(payout.amount, 0.0);
        assert_eq!(payout.terminal_state, ClaimStatus::Denied);
    }

    #[test]
    fn test_flag_keeps_flagged_status() {
        let f = fixture();
        let id = ClaimId::new();
        seed(&f.store, id, ClaimStatus::NeedsReview);

        f.guard.finalize(id, "FLAG", 120.0).unwrap();
        assert_eq!(claim(&f.store, id).status, ClaimStatus::Flagged);
    }

    #[test]
    fn test_repeat_on_closed_claim_is_skipped() {
        let f = fixture();
        let id = ClaimId::new();
        seed(&f.store, id, ClaimStatus::Processing);

        f.guard.finalize(id, "APPROVE", 100.0).unwrap();
        let again = f.guard.finalize(id, "APPROVE", 100.0).unwrap();
        assert_eq!(again, FinalizeOutcome::Skipped(SkipReason::AlreadyClosed));
        assert_eq!(f.store.count_prefix("PAYOUT#").unwrap(), 1);
        assert_eq!(f.events.events_for(CLAIM_FINALIZED).len(), 1);
    }

    #[test]
    fn test_existing_payout_wins() {
        let f = fixture();
        let id = ClaimId::new();
        seed(&f.store, id, ClaimStatus::Processing);

        f.guard.finalize(id, "DENY", 0.0).unwrap();
        // Status is DENIED, not CLOSED_PAID, so the payout record decides
        let again = f.guard.finalize(id, "APPROVE", 500.0).unwrap();
        assert_eq!(again, FinalizeOutcome::Skipped(SkipReason::AlreadyRecorded));
        assert_eq!(claim(&f.store, id).status, ClaimStatus::Denied);
    }

    /// Store whose first claim update fails with a transient error
    struct FlakyUpdates {
        inner: SqliteKvStore,
        failures: AtomicUsize,
    }

    impl KeyValueStore for FlakyUpdates {
        fn put_if_absent(&self, key: &str, doc: Document) -> Result<PutOutcome, ServiceError> {
            self.inner.put_if_absent(key, doc)
        }

        fn get(&self, key: &str) -> Result<Option<Document>, ServiceError> {
            self.inner.get(key)
        }

        fn put(&self, key: &str, doc: Document) -> Result<(), ServiceError> {
            self.inner.put(key, doc)
        }

        fn update(&self, key: &str, updates: &[FieldUpdate]) -> Result<Document, ServiceError> {
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err(ServiceError::Throttled("update rejected".into()));
            }
            self.inner.update(key, updates)
        }
    }

    #[test]
    fn test_retry_after_failed_update_closes_claim() {
        let store = Arc::new(FlakyUpdates {
            inner: SqliteKvStore::in_memory().unwrap(),
            failures: AtomicUsize::new(1),
        });
        let events = MemoryEventBus::new();
        let guard = PayoutGuard::new(store.clone(), Arc::new(events.clone()));
        let id = ClaimId::new();
        seed(&store.inner, id, ClaimStatus::Processing);

        let err = guard.finalize(id, "APPROVE", 500.0).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(claim(&store.inner, id).status, ClaimStatus::Processing);

        // The retry carries a different amount; the stored record still wins
        let retried = guard.finalize(id, "APPROVE", 750.0).unwrap();
        let FinalizeOutcome::Recorded(record) = retried else {
            panic!("expected the stored record to be applied");
        };
        assert_eq!(record.amount, 500.0);

        let stored = claim(&store.inner, id);
        assert_eq!(stored.status, ClaimStatus::ClosedPaid);
        assert_eq!(stored.terminal_state, Some(ClaimStatus::Approved));
        assert_eq!(stored.final_payout, Some(500.0));
        assert_eq!(stored.payout_at, Some(record.paid_at));
        assert_eq!(store.inner.count_prefix("PAYOUT#").unwrap(), 1);
        assert_eq!(events.events_for(CLAIM_FINALIZED).len(), 1);

        let again = guard.finalize(id, "APPROVE", 500.0).unwrap();
        assert_eq!(again, FinalizeOutcome::Skipped(SkipReason::AlreadyClosed));
    }

    #[test]
    fn test_retry_after_failed_denial_update() {
        let store = Arc::new(FlakyUpdates {
            inner: SqliteKvStore::in_memory().unwrap(),
            failures: AtomicUsize::new(1),
        });
        let guard = PayoutGuard::new(store.clone(), Arc::new(MemoryEventBus::new()));
        let id = ClaimId::new();
        seed(&store.inner, id, ClaimStatus::Processing);

        assert!(guard.finalize(id, "DENY", 0.0).is_err());
        guard.finalize(id, "DENY", 0.0).unwrap();
        let stored = claim(&store.inner, id);
        assert_eq!(stored.status, ClaimStatus::Denied);
        assert_eq!(stored.final_payout, Some(0.0));

        let again = guard.finalize(id, "DENY", 0.0).unwrap();
        assert_eq!(again, FinalizeOutcome::Skipped(SkipReason::AlreadyRecorded));
    }

    #[test]
    fn test_unmapped_decision_writes_nothing() {
        let f = fixture();
        let id = ClaimId::new();
        seed(&f.store, id, ClaimStatus::Processing);

        let err = f.guard.finalize(id, "REVIEW", 10.0).unwrap_err();
        assert!(matches!(err, GatekeeperError::UnmappedDecision(_)));
        assert_eq!(f.store.count_prefix("PAYOUT#").unwrap(), 0);
        assert_eq!(claim(&f.store, id).status, ClaimStatus::Processing);
    }

    #[test]
    fn test_missing_claim() {
        let f = fixture();
        let err = f.guard.finalize(ClaimId::new(), "APPROVE", 10.0).unwrap_err();
        assert!(matches!(err, GatekeeperError::ClaimNotFound(_)));
    }

    #[test]
    fn test_guarded_amount() {
        assert_eq!(guarded_amount(ClaimStatus::Approved, 12.5), 12.5);
        assert_eq!(guarded_amount(ClaimStatus::Approved, -1.0), 0.0);
        assert_eq!(guarded_amount(ClaimStatus::Approved, f64::NAN), 0.0);
        assert_eq!(guarded_amount(ClaimStatus::Approved, f64::INFINITY), 0.0);
        assert_eq!(guarded_amount(ClaimStatus::Flagged, 12.5), 0.0);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use claimline_store::{MemoryEventBus, SqliteKvStore};
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn non_approval_records_zero(
            amount in prop_oneof![any::<f64>(), 0.0f64..1_000_000.0],
            decision in prop::sample::select(vec!["DENY", "denied", "Reject", "REJECTED", "flag", "FLAGGED"]),
        ) {
            let store = Arc::new(SqliteKvStore::in_memory().unwrap());
            let guard = PayoutGuard::new(store.clone(), Arc::new(MemoryEventBus::new()));
            let id = ClaimId::new();
            let doc = json!({ "claim_id": id.to_string(), "status": "PROCESSING" });
            store.put(&claim_key(&id), doc.as_object().cloned().unwrap()).unwrap();

            let outcome = guard.finalize(id, decision, amount).unwrap();
            match outcome {
                FinalizeOutcome::Recorded(record) => prop_assert_eq!(record.amount, 0.0),
                other => prop_assert!(false, "unexpected {:?}", other),
            }
        }

        #[test]
        fn approval_never_records_negative(amount in any::<f64>()) {
            let recorded = guarded_amount(ClaimStatus::Approved, amount);
            prop_assert!(recorded.is_finite());
            prop_assert!(recorded >= 0.0);
        }
    }
}
