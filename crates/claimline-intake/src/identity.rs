//! Identity resolution: one canonical claim id per external claim number

use crate::error::IdentityError;
use claimline_domain::keys::mapping_key;
use claimline_domain::traits::{Document, KeyValueStore, PutOutcome};
use claimline_domain::{fields, now_millis, ClaimId};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Maps external claim numbers to internal claim ids
///
/// The mapping is created with a conditional write; callers that lose the
/// race read the winner's id back. A mapping is never rewritten.
#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn KeyValueStore>,
}

impl IdentityResolver {
    /// Create a new resolver
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Return the canonical claim id, minting it on first sight
    ///
    /// Safe under concurrent invocation: every caller for the same external
    /// id receives the same claim id.
    pub fn resolve_or_create(&self, external_id: &str) -> Result<ClaimId, IdentityError> {
        let candidate = ClaimId::new();
        let mut mapping = Document::new();
        mapping.insert(fields::CLAIM_ID.to_string(), Value::from(candidate.to_string()));
        mapping.insert(fields::EXTERNAL_ID.to_string(), Value::from(external_id));
        mapping.insert(fields::CREATED_AT.to_string(), Value::from(now_millis()));

        match self.store.put_if_absent(&mapping_key(external_id), mapping)? {
            PutOutcome::Created => {
                info!("Created claim {} for external id '{}'", candidate, external_id);
                Ok(candidate)
            }
            PutOutcome::Conflict => {
                debug!("Mapping for '{}' already exists, reading it back", external_id);
                self.lookup(external_id)?
                    .ok_or_else(|| IdentityError::CorruptMapping {
                        external_id: external_id.to_string(),
                        detail: "mapping vanished after a conflicting create".to_string(),
                    })
            }
        }
    }

    /// Read the canonical claim id without creating one
    pub fn lookup(&self, external_id: &str) -> Result<Option<ClaimId>, IdentityError> {
        match self.store.get(&mapping_key(external_id))? {
            Some(mapping) => parse_mapping(external_id, &mapping).map(Some),
            None => Ok(None),
        }
    }
}

fn parse_mapping(external_id: &str, mapping: &Document) -> Result<ClaimId, IdentityError> {
    let raw = mapping
        .get(fields::CLAIM_ID)
        .and_then(Value::as_str)
        .ok_or_else(|| IdentityError::CorruptMapping {
            external_id: external_id.to_string(),
            detail: "missing claim_id".to_string(),
        })?;

    ClaimId::from_string(raw).map_err(|detail| IdentityError::CorruptMapping {
        external_id: external_id.to_string(),
        detail,
    })
}
