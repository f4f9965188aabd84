//! When is a document packet complete enough to start a pipeline run

use claimline_domain::{DocumentRef, DocumentType};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Completeness rule evaluated after every recorded document
///
/// A pure function of the received-document snapshot, so a duplicate or
/// reordered delivery cannot change the answer for the same snapshot.
///
/// # Examples
///
/// ```
/// use claimline_domain::{DocumentRef, DocumentType};
/// use claimline_intake::TriggerPolicy;
///
/// let doc = |id: &str, t| DocumentRef {
///     doc_id: id.into(),
///     document_type: t,
///     key: format!("k/{}", id),
///     channel: "portal".into(),
/// };
///
/// let policy = TriggerPolicy::default();
/// assert!(!policy.is_satisfied(&[doc("a", DocumentType::FnolForm)]));
/// assert!(policy.is_satisfied(&[
///     doc("a", DocumentType::FnolForm),
///     doc("b", DocumentType::Estimate),
/// ]));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerPolicy {
    /// Every listed type has been received
    RequiredTypes {
        /// Types that must all be present
        types: Vec<DocumentType>,
    },
    /// At least `count` distinct documents have been received
    MinimumCount {
        /// Minimum number of distinct documents
        count: usize,
    },
    /// Both of the above
    AllOf {
        /// Types that must all be present
        types: Vec<DocumentType>,
        /// Minimum number of distinct documents
        count: usize,
    },
}

impl Default for TriggerPolicy {
    fn default() -> Self {
        TriggerPolicy::RequiredTypes {
            types: vec![DocumentType::FnolForm, DocumentType::Estimate],
        }
    }
}

impl TriggerPolicy {
    /// Whether the snapshot satisfies the policy
    pub fn is_satisfied(&self, received: &[DocumentRef]) -> bool {
        match self {
            TriggerPolicy::RequiredTypes { types } => has_types(received, types),
            TriggerPolicy::MinimumCount { count } => distinct_docs(received) >= *count,
            TriggerPolicy::AllOf { types, count } => {
                has_types(received, types) && distinct_docs(received) >= *count
            }
        }
    }

    /// Validate the policy
    pub fn validate(&self) -> Result<(), String> {
        match self {
            TriggerPolicy::RequiredTypes { types } if types.is_empty() => {
                Err("required types must not be empty".to_string())
            }
            TriggerPolicy::MinimumCount { count: 0 } | TriggerPolicy::AllOf { count: 0, .. } => {
                Err("minimum document count must be greater than 0".to_string())
            }
            _ => Ok(()),
        }
    }
}

fn has_types(received: &[DocumentRef], types: &[DocumentType]) -> bool {
    let present: HashSet<DocumentType> = received.iter().map(|d| d.document_type).collect();
    types.iter().all(|t| present.contains(t))
}

fn distinct_docs(received: &[DocumentRef]) -> usize {
    received
        .iter()
        .map(|d| d.doc_id.as_str())
        .collect::<HashSet<_>>()
        .len()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Order and duplicates in the snapshot never change the answer
        #[test]
        fn test_snapshot_order_is_irrelevant(
            picks in prop::collection::vec(0usize..7, 0..10),
            count in 1usize..5,
        ) {
            let docs: Vec<DocumentRef> = picks
                .iter()
                .enumerate()
                .map(|(i, p)| DocumentRef {
                    doc_id: format!("d{}", i % 4),
                    document_type: DocumentType::ALL[*p],
                    key: format!("k{}", i),
                    channel: "api".into(),
                })
                .collect();
            let mut reversed = docs.clone();
            reversed.reverse();
            let mut doubled = docs.clone();
            doubled.extend(docs.iter().cloned());

            for policy in [
                TriggerPolicy::default(),
                TriggerPolicy::MinimumCount { count },
            ] {
                prop_assert_eq!(policy.is_satisfied(&docs), policy.is_satisfied(&reversed));
                prop_assert_eq!(policy.is_satisfied(&docs), policy.is_satisfied(&doubled));
            }
        }
    }
}
