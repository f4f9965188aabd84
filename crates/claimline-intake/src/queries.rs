//! Read-only claim lookups

use crate::error::IntakeError;
use crate::identity::IdentityResolver;
use claimline_domain::keys::claim_key;
use claimline_domain::traits::KeyValueStore;
use claimline_domain::{ClaimId, ClaimRecord};
use std::sync::Arc;

/// Read-only access to claim records
#[derive(Clone)]
pub struct ClaimQueries {
    identity: IdentityResolver,
    store: Arc<dyn KeyValueStore>,
}

impl ClaimQueries {
    /// Create a new query handle
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            identity: IdentityResolver::new(store.clone()),
            store,
        }
    }

    /// Claim record by internal id
    pub fn claim(&self, claim_id: &ClaimId) -> Result<Option<ClaimRecord>, IntakeError> {
        match self.store.get(&claim_key(claim_id))? {
            Some(doc) => Ok(Some(ClaimRecord::from_document(&doc)?)),
            None => Ok(None),
        }
    }

    /// Claim record by external claim number
    ///
    /// `None` when the number was never seen, or when it was resolved but no
    /// document has been recorded yet.
    pub fn status_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<ClaimRecord>, IntakeError> {
        match self.identity.lookup(external_id)? {
            Some(claim_id) => self.claim(&claim_id),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimline_domain::traits::FieldUpdate;
    use claimline_domain::{fields, ClaimStatus};
    use claimline_store::SqliteKvStore;

    #[test]
    fn test_status_by_external_id() {
        let store = Arc::new(SqliteKvStore::in_memory().unwrap());
        let queries = ClaimQueries::new(store.clone());
        assert!(queries.status_by_external_id("CLM-5").unwrap().is_none());

        let claim_id = IdentityResolver::new(store.clone())
            .resolve_or_create("CLM-5")
            .unwrap();
        assert!(queries.status_by_external_id("CLM-5").unwrap().is_none());

        store
            .update(
                &claim_key(&claim_id),
                &[
                    FieldUpdate::set(fields::CLAIM_ID, claim_id.to_string()),
                    FieldUpdate::set(fields::STATUS, "NEEDS_REVIEW"),
                ],
            )
            .unwrap();

        let record = queries.status_by_external_id("CLM-5").unwrap().unwrap();
        assert_eq!(record.claim_id, claim_id);
        assert_eq!(record.status, ClaimStatus::NeedsReview);
    }
}
