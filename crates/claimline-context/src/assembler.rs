//! Context assembly: fresh extracts in, evidence bundles out

use crate::config::ContextConfig;
use crate::error::ContextError;
use crate::optimize::optimize_bundle;
use crate::timeline::{assess_status, build_timeline};
use claimline_domain::keys::{
    claim_key, context_bundle_key, extracts_prefix, optimized_bundle_key,
};
use claimline_domain::traits::{FieldUpdate, KeyValueStore, Metadata, ObjectStore};
use claimline_domain::{
    fields, now_millis, BundleDocument, ClaimId, ClaimStatus, ContextBundle, DocumentExtract,
};
use claimline_intake::IdentityResolver;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Metadata key under which the external claim number is propagated
pub const EXTERNAL_ID_KEY: &str = "external_id";

/// Both bundles of one run and where they were written
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledContext {
    /// Every fresh document
    pub bundle: ContextBundle,
    /// Documents that fit the character budget
    pub optimized: ContextBundle,
    /// Object key of the full bundle
    pub bundle_key: String,
    /// Object key of the optimized bundle
    pub optimized_key: String,
}

/// Builds the evidence bundle for a pipeline run
pub struct ContextAssembler {
    objects: Arc<dyn ObjectStore>,
    store: Arc<dyn KeyValueStore>,
    identity: IdentityResolver,
    config: ContextConfig,
}

impl ContextAssembler {
    /// Create a new assembler
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        store: Arc<dyn KeyValueStore>,
        config: ContextConfig,
    ) -> Self {
        Self {
            objects,
            identity: IdentityResolver::new(store.clone()),
            store,
            config,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Assemble and persist the bundles for `claim_id`
    ///
    /// Extracts modified before `workflow_started_at` belong to an earlier
    /// run and are skipped. An empty extracts prefix is
    /// [`ContextError::NotReady`], which callers may retry.
    pub fn assemble(
        &self,
        claim_id: ClaimId,
        workflow_started_at: u64,
    ) -> Result<AssembledContext, ContextError> {
        let prefix = extracts_prefix(&claim_id);
        let listing = self.objects.list(&prefix)?;
        if listing.is_empty() {
            return Err(ContextError::NotReady(prefix));
        }

        let mut documents = Vec::new();
        let mut external_ids = BTreeSet::new();
        for summary in &listing {
            if summary.last_modified < workflow_started_at {
                debug!(
                    "Skipping stale extract '{}' ({} < {})",
                    summary.key, summary.last_modified, workflow_started_at
                );
                continue;
            }

            let object = self.objects.get(&summary.key)?;
            let extract = DocumentExtract::from_object(claim_id, doc_id_from_key(&summary.key), &object);
            if let Some(external_id) = &extract.external_id {
                external_ids.insert(external_id.clone());
            }
            documents.push(BundleDocument {
                doc_id: extract.doc_id,
                key: summary.key.clone(),
                document_type: extract.document_type,
                text: extract.text,
            });
        }

        self.check_identity(claim_id, &external_ids)?;

        let mut metadata = BTreeMap::new();
        if let Some(external_id) = external_ids.iter().next() {
            metadata.insert(EXTERNAL_ID_KEY.to_string(), external_id.clone());
        }

        let bundle = ContextBundle {
            claim_id,
            status: assess_status(&documents, self.config.min_documents),
            timeline: build_timeline(&documents),
            total_docs: documents.len(),
            documents,
            metadata,
            created_at: now_millis(),
        };
        let optimized = optimize_bundle(&bundle, self.config.char_budget);

        let bundle_key = context_bundle_key(&claim_id);
        let optimized_key = optimized_bundle_key(&claim_id);
        self.objects
            .put(&bundle_key, &serde_json::to_vec_pretty(&bundle)?, Metadata::new())?;
        self.objects
            .put(&optimized_key, &serde_json::to_vec_pretty(&optimized)?, Metadata::new())?;

        self.store.update(
            &claim_key(&claim_id),
            &[
                FieldUpdate::set(fields::CONTEXT_BUNDLE_KEY, bundle_key.as_str()),
                FieldUpdate::set(fields::CONTEXT_STATUS, bundle.status.as_str()),
                FieldUpdate::set(fields::STATUS, ClaimStatus::ContextReady.as_str()),
                FieldUpdate::set(fields::UPDATED_AT, now_millis()),
            ],
        )?;

        info!(
            "Context for claim {}: {} of {} documents, status {}",
            claim_id,
            optimized.documents.len(),
            bundle.total_docs,
            bundle.status.as_str()
        );

        Ok(AssembledContext {
            bundle,
            optimized,
            bundle_key,
            optimized_key,
        })
    }

    /// Every external id on the extracts must map back to this claim
    fn check_identity(
        &self,
        claim_id: ClaimId,
        external_ids: &BTreeSet<String>,
    ) -> Result<(), ContextError> {
        for external_id in external_ids {
            match self.identity.lookup(external_id)? {
                Some(canonical) if canonical != claim_id => {
                    error!(
                        "Split-brain: claim {} carries '{}', which maps to {}",
                        claim_id, external_id, canonical
                    );
                    return Err(ContextError::SplitBrain {
                        claim_id,
                        external_id: external_id.clone(),
                        canonical,
                    });
                }
                Some(_) => {}
                None => warn!(
                    "No identity mapping for '{}' on claim {}",
                    external_id, claim_id
                ),
            }
        }
        Ok(())
    }
}

fn doc_id_from_key(key: &str) -> &str {
    let name = key.rsplit('/').next().unwrap_or(key);
    name.strip_suffix(".txt").unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimline_domain::keys::{extract_object_key, META_DOC_TYPE, META_EXTERNAL_ID};
    use claimline_domain::{ClaimRecord, ContextStatus};
    use claimline_store::{MemoryObjectStore, SqliteKvStore};

    struct Fixture {
        objects: Arc<MemoryObjectStore>,
        store: Arc<SqliteKvStore>,
        assembler: ContextAssembler,
    }

    fn fixture() -> Fixture {
        let objects = Arc::new(MemoryObjectStore::new());
        let store = Arc::new(SqliteKvStore::in_memory().unwrap());
        let assembler = ContextAssembler::new(objects.clone(), store.clone(), ContextConfig::default());
        Fixture {
            objects,
            store,
            assembler,
        }
    }

    fn put_extract(
        objects: &MemoryObjectStore,
        claim_id: &ClaimId,
        doc_id: &str,
        text: &str,
        doc_type: &str,
        external_id: &str,
        last_modified: u64,
    ) {
        let mut metadata = Metadata::new();
        metadata.insert(META_EXTERNAL_ID.to_string(), external_id.to_string());
        metadata.insert(META_DOC_TYPE.to_string(), doc_type.to_string());
        objects
            .put_with_timestamp(
                &extract_object_key(claim_id, doc_id),
                text.as_bytes(),
                metadata,
                last_modified,
            )
            .unwrap();
    }

    fn record(store: &SqliteKvStore, claim_id: &ClaimId) -> ClaimRecord {
        let doc = store.get(&claim_key(claim_id)).unwrap().unwrap();
        ClaimRecord::from_document(&doc).unwrap()
    }

    #[test]
    fn test_doc_id_from_key() {
        assert_eq!(doc_id_from_key("c/extracts/doc-1.txt"), "doc-1");
        assert_eq!(doc_id_from_key("plain"), "plain");
    }

    #[test]
    fn test_empty_prefix_is_not_ready() {
        let f = fixture();
        let err = f.assembler.assemble(ClaimId::new(), 0).unwrap_err();
        assert!(matches!(err, ContextError::NotReady(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_assembles_complete_bundle() {
        let f = fixture();
        let identity = IdentityResolver::new(f.store.clone());
        let claim_id = identity.resolve_or_create("CLM-1").unwrap();

        put_extract(&f.objects, &claim_id, "a", "Invoice total 1200 on 2024-02-01", "INVOICE", "CLM-1", 100);
        put_extract(&f.objects, &claim_id, "b", "FNOL filed 2024-01-15", "FNOL_FORM", "CLM-1", 100);

        let ctx = f.assembler.assemble(claim_id, 50).unwrap();
        assert_eq!(ctx.bundle.status, ContextStatus::Complete);
        assert_eq!(ctx.bundle.total_docs, 2);
        assert_eq!(ctx.bundle.timeline[0].source_doc_id, "b");
        assert_eq!(ctx.bundle.metadata.get(EXTERNAL_ID_KEY).map(String::as_str), Some("CLM-1"));
        assert_eq!(ctx.optimized.documents[0].doc_id, "b");

        let stored = f.objects.get(&ctx.optimized_key).unwrap();
        let decoded: ContextBundle = serde_json::from_slice(&stored.body).unwrap();
        assert_eq!(decoded, ctx.optimized);

        let claim = record(&f.store, &claim_id);
        assert_eq!(claim.status, ClaimStatus::ContextReady);
        assert_eq!(claim.context_status, Some(ContextStatus::Complete));
        assert_eq!(claim.context_bundle_key, Some(ctx.bundle_key));
    }

    #[test]
    fn test_stale_extracts_are_skipped() {
        let f = fixture();
        let claim_id = ClaimId::new();
        put_extract(&f.objects, &claim_id, "old", "FNOL total", "FNOL_FORM", "UNKNOWN", 10);
        put_extract(&f.objects, &claim_id, "new", "Invoice", "INVOICE", "UNKNOWN", 1000);

        let ctx = f.assembler.assemble(claim_id, 500).unwrap();
        assert_eq!(ctx.bundle.total_docs, 1);
        assert_eq!(ctx.bundle.documents[0].doc_id, "new");
        assert_eq!(ctx.bundle.status, ContextStatus::Incomplete);
        assert!(ctx.bundle.metadata.is_empty());
    }

    #[test]
    fn test_split_brain_is_fatal() {
        let f = fixture();
        let identity = IdentityResolver::new(f.store.clone());
        let canonical = identity.resolve_or_create("CLM-2").unwrap();
        let rogue = ClaimId::new();
        put_extract(&f.objects, &rogue, "a", "FNOL", "FNOL_FORM", "CLM-2", 100);

        let err = f.assembler.assemble(rogue, 0).unwrap_err();
        match &err {
            ContextError::SplitBrain {
                claim_id,
                canonical: found,
                ..
            } => {
                assert_eq!(*claim_id, rogue);
                assert_eq!(*found, canonical);
            }
            other => panic!("expected split-brain, got {:?}", other),
        }
        assert!(!err.is_retryable());
        assert!(err.is_identity_corruption());
        assert!(f.objects.get(&context_bundle_key(&rogue)).is_err());
    }

    #[test]
    fn test_missing_mapping_only_warns() {
        let f = fixture();
        let claim_id = ClaimId::new();
        put_extract(&f.objects, &claim_id, "a", "FNOL", "FNOL_FORM", "CLM-unmapped", 100);
        put_extract(&f.objects, &claim_id, "b", "photo", "DAMAGE_PHOTO", "CLM-unmapped", 100);

        let ctx = f.assembler.assemble(claim_id, 0).unwrap();
        assert_eq!(ctx.bundle.status, ContextStatus::PartialContext);
    }
}
