//! Span merging and placeholder substitution

use claimline_domain::RedactionSpan;
use regex::Regex;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[REDACTED:[A-Z0-9_]+\]").expect("placeholder pattern is valid"));

/// Placeholder that replaces a span of the given entity type
///
/// # Examples
///
/// ```
/// use claimline_redactor::placeholder;
///
/// assert_eq!(placeholder("name"), "[REDACTED:NAME]");
/// assert_eq!(placeholder("date-time"), "[REDACTED:DATE_TIME]");
/// ```
pub fn placeholder(entity_type: &str) -> String {
    let tag: String = entity_type
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    format!("[REDACTED:{}]", tag)
}

/// Merge overlapping spans into a sorted, non-overlapping list
///
/// Spans are sorted by start (longest first on ties), then swept left to
/// right: a span starting before the current span's end is folded into it
/// and the end becomes the larger of the two. The merged span keeps the type
/// of the first span in its group. Empty spans are dropped.
///
/// # Examples
///
/// ```
/// use claimline_domain::RedactionSpan;
/// use claimline_redactor::merge_spans;
///
/// let merged = merge_spans(vec![
///     RedactionSpan::new(6, 15, "NAME"),
///     RedactionSpan::new(0, 20, "NAME"),
/// ]);
/// assert_eq!(merged, vec![RedactionSpan::new(0, 20, "NAME")]);
/// ```
pub fn merge_spans(mut spans: Vec<RedactionSpan>) -> Vec<RedactionSpan> {
    spans.retain(|s| !s.is_empty());
    spans.sort_by(|a, b| a.begin.cmp(&b.begin).then(b.end.cmp(&a.end)));

    let mut merged: Vec<RedactionSpan> = Vec::with_capacity(spans.len());
    for span in spans {
        match merged.last_mut() {
            Some(current) if span.begin < current.end => {
                current.end = current.end.max(span.end);
            }
            _ => merged.push(span),
        }
    }
    merged
}

/// Replace each span with its placeholder
///
/// `spans` must be the output of [`merge_spans`]. Replacement runs from the
/// highest offset down so that earlier replacements never shift the offsets
/// of spans still waiting. Offsets past the end of the text are clamped.
pub fn apply_redactions(text: &str, spans: &[RedactionSpan]) -> String {
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let total = boundaries.len() - 1;

    let mut redacted = text.to_string();
    for span in spans.iter().rev() {
        let end = span.end.min(total);
        if span.begin >= end {
            continue;
        }
        redacted.replace_range(
            boundaries[span.begin]..boundaries[end],
            &placeholder(&span.entity_type),
        );
    }
    redacted
}

/// Character ranges of placeholders already present in `text`
pub(crate) fn placeholder_ranges(text: &str) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut chars_before = 0;
    let mut last_byte = 0;

    for m in PLACEHOLDER.find_iter(text) {
        chars_before += text[last_byte..m.start()].chars().count();
        let len = m.as_str().chars().count();
        ranges.push((chars_before, chars_before + len));
        chars_before += len;
        last_byte = m.end();
    }
    ranges
}

/// Keep existing placeholders intact
///
/// Spans lying entirely inside a placeholder are dropped; spans that cut
/// through one are widened to cover it whole. Re-redacting redacted text is
/// then a no-op.
pub(crate) fn protect_placeholders(
    text: &str,
    spans: Vec<RedactionSpan>,
) -> Vec<RedactionSpan> {
    let ranges = placeholder_ranges(text);
    if ranges.is_empty() {
        return spans;
    }

    spans
        .into_iter()
        .filter(|s| !ranges.iter().any(|&(b, e)| s.begin >= b && s.end <= e))
        .map(|mut s| {
            for &(b, e) in &ranges {
                if s.begin < e && b < s.end {
                    s.begin = s.begin.min(b);
                    s.end = s.end.max(e);
                }
            }
            s
        })
        .collect()
}
