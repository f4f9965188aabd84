//! Timeline inference and completeness classification

use claimline_domain::{BundleDocument, ContextStatus, TimelineEntry};
use regex::Regex;
use std::sync::LazyLock;

/// Sort key for documents without a recognizable date
pub const UNKNOWN_DATE: &str = "9999-99-99";

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}").expect("iso date pattern is valid"));

static DMY_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{2})/(\d{2})/(\d{4})").expect("day-first date pattern is valid")
});

/// First date in the text as `YYYY-MM-DD`
///
/// ISO dates win over day-first dates anywhere in the text. Dates are not
/// validated; they only need to sort.
///
/// # Examples
///
/// ```
/// use claimline_context::infer_date;
///
/// assert_eq!(infer_date("Loss on 15/01/2024, filed 2024-01-20"), "2024-01-20");
/// assert_eq!(infer_date("Loss on 15/01/2024"), "2024-01-15");
/// assert_eq!(infer_date("no date"), "9999-99-99");
/// ```
pub fn infer_date(text: &str) -> String {
    if let Some(m) = ISO_DATE.find(text) {
        return m.as_str().to_string();
    }
    if let Some(caps) = DMY_DATE.captures(text) {
        return format!("{}-{}-{}", &caps[3], &caps[2], &caps[1]);
    }
    UNKNOWN_DATE.to_string()
}

/// Timeline with one entry per document, sorted by inferred date
///
/// The sort is stable, so documents with the same date keep listing order.
pub fn build_timeline(documents: &[BundleDocument]) -> Vec<TimelineEntry> {
    let mut timeline: Vec<TimelineEntry> = documents
        .iter()
        .map(|doc| TimelineEntry {
            date: infer_date(&doc.text),
            event: format!("Document: {}", doc.doc_id),
            source_doc_id: doc.doc_id.clone(),
        })
        .collect();
    timeline.sort_by(|a, b| a.date.cmp(&b.date));
    timeline
}

/// Classify how complete the evidence is
pub fn assess_status(documents: &[BundleDocument], min_documents: usize) -> ContextStatus {
    if documents.len() < min_documents {
        return ContextStatus::Incomplete;
    }

    let blob = documents
        .iter()
        .map(|d| d.text.to_uppercase())
        .collect::<Vec<_>>()
        .join(" ");
    let has_first_notice = blob.contains("FNOL") || blob.contains("FIRST NOTIFICATION");
    let has_amount = blob.contains("INVOICE") || blob.contains("TOTAL");

    if has_first_notice && has_amount {
        ContextStatus::Complete
    } else {
        ContextStatus::PartialContext
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Fewer documents than the minimum is always INCOMPLETE
        #[test]
        fn test_single_document_is_incomplete(text in ".{0,200}") {
            let docs = vec![BundleDocument {
                doc_id: "only".into(),
                key: "k".into(),
                document_type: None,
                text: format!("FNOL INVOICE TOTAL {}", text),
            }];
            prop_assert_eq!(assess_status(&docs, 2), ContextStatus::Incomplete);
        }

        /// Timeline dates never decrease
        #[test]
        fn test_timeline_is_sorted(
            dates in prop::collection::vec((2000u32..2030, 1u32..13, 1u32..29, any::<bool>()), 0..12)
        ) {
            let docs: Vec<BundleDocument> = dates
                .iter()
                .enumerate()
                .map(|(i, (y, m, d, iso))| BundleDocument {
                    doc_id: format!("d{}", i),
                    key: String::new(),
                    document_type: None,
                    text: if *iso {
                        format!("on {:04}-{:02}-{:02}", y, m, d)
                    } else {
                        format!("on {:02}/{:02}/{:04}", d, m, y)
                    },
                })
                .collect();
            let timeline = build_timeline(&docs);
            prop_assert_eq!(timeline.len(), docs.len());
            for pair in timeline.windows(2) {
                prop_assert!(pair[0].date <= pair[1].date);
            }
        }
    }
}
