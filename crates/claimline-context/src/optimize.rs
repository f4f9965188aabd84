//! Size-capped bundle for agent prompts

use claimline_domain::{BundleDocument, ContextBundle};

/// Rank of documents without a known type, after every known one
const UNTYPED_PRIORITY: u8 = u8::MAX;

/// Cut a bundle down to `char_budget` rendered characters
///
/// Documents are ordered by type priority (listing order within a rank) and
/// taken whole while the running total fits. The first document that does
/// not fit ends the bundle. Timeline, status and metadata are carried over.
pub fn optimize_bundle(full: &ContextBundle, char_budget: usize) -> ContextBundle {
    let mut ranked: Vec<&BundleDocument> = full.documents.iter().collect();
    ranked.sort_by_key(|doc| {
        doc.document_type
            .map(|t| t.priority())
            .unwrap_or(UNTYPED_PRIORITY)
    });

    let mut used = 0;
    let mut documents = Vec::new();
    for doc in ranked {
        let cost = doc.render().chars().count();
        if used + cost > char_budget {
            break;
        }
        used += cost;
        documents.push(doc.clone());
    }

    ContextBundle {
        documents,
        ..full.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimline_domain::{ClaimId, ContextStatus, DocumentType};
    use std::collections::BTreeMap;

    fn doc(id: &str, document_type: Option<DocumentType>, len: usize) -> BundleDocument {
        BundleDocument {
            doc_id: id.to_string(),
            key: format!("c/extracts/{}.txt", id),
            document_type,
            text: "x".repeat(len),
        }
    }

    fn bundle(documents: Vec<BundleDocument>) -> ContextBundle {
        ContextBundle {
            claim_id: ClaimId::new(),
            status: ContextStatus::Complete,
            timeline: Vec::new(),
            total_docs: documents.len(),
            documents,
            metadata: BTreeMap::new(),
            created_at: 0,
        }
    }

    fn ids(bundle: &ContextBundle) -> Vec<&str> {
        bundle.documents.iter().map(|d| d.doc_id.as_str()).collect()
    }

    #[test]
    fn test_priority_order() {
        let full = bundle(vec![
            doc("photo", Some(DocumentType::DamagePhoto), 5),
            doc("notes", Some(DocumentType::AdjusterNotes), 5),
            doc("police", Some(DocumentType::PoliceReport), 5),
            doc("estimate", Some(DocumentType::Estimate), 5),
            doc("untyped", None, 5),
            doc("invoice", Some(DocumentType::Invoice), 5),
            doc("fnol", Some(DocumentType::FnolForm), 5),
        ]);

        let optimized = optimize_bundle(&full, 10_000);
        assert_eq!(
            ids(&optimized),
            vec!["fnol", "estimate", "invoice", "police", "notes", "photo", "untyped"]
        );
        assert_eq!(optimized.total_docs, 7);
    }

    #[test]
    fn test_first_overflow_drops_the_rest() {
        // Rendered cost is len + 23 for two-character ids
        let full = bundle(vec![
            doc("d1", Some(DocumentType::FnolForm), 30),
            doc("d2", Some(DocumentType::Invoice), 100),
            doc("d3", Some(DocumentType::PoliceReport), 5),
        ]);
        assert_eq!(doc("d1", None, 30).render().chars().count(), 53);

        let optimized = optimize_bundle(&full, 100);
        assert_eq!(ids(&optimized), vec!["d1"]);
    }

    #[test]
    fn test_exact_fit_is_kept() {
        let full = bundle(vec![doc("d1", None, 30), doc("d2", None, 30)]);
        assert_eq!(ids(&optimize_bundle(&full, 106)), vec!["d1", "d2"]);
        assert_eq!(ids(&optimize_bundle(&full, 105)), vec!["d1"]);
    }

    #[test]
    fn test_metadata_and_status_carried_over() {
        let mut full = bundle(vec![doc("d1", None, 10)]);
        full.metadata.insert("external_id".into(), "CLM-1".into());
        let optimized = optimize_bundle(&full, 1);

        assert!(optimized.documents.is_empty());
        assert_eq!(optimized.metadata, full.metadata);
        assert_eq!(optimized.status, full.status);
    }
}
