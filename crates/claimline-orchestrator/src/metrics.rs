//! Metrics collection for pipeline runs

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by every run of a worker
///
/// Runs execute on separate tasks, so the counters are atomics and the
/// struct is shared behind an `Arc`.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    runs_started: AtomicU64,
    runs_finalized: AtomicU64,
    runs_reviewed: AtomicU64,
    runs_failed: AtomicU64,
    agent_fallbacks: AtomicU64,
    documents_quarantined: AtomicU64,
    reviews_completed: AtomicU64,
}

impl PipelineMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a run start
    pub fn record_start(&self) {
        self.runs_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a run that ended with a payout decision
    pub fn record_finalized(&self) {
        self.runs_finalized.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a run that handed its claim to a human
    pub fn record_review_requested(&self) {
        self.runs_reviewed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a run that ended in error review
    pub fn record_failure(&self) {
        self.runs_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record agent invocations that used the fallback result
    pub fn record_fallbacks(&self, count: u32) {
        self.agent_fallbacks.fetch_add(u64::from(count), Ordering::Relaxed);
    }

    /// Record a quarantined document
    pub fn record_quarantine(&self) {
        self.documents_quarantined.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a submitted human review
    pub fn record_review_completed(&self) {
        self.reviews_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Runs started
    pub fn runs_started(&self) -> u64 {
        self.runs_started.load(Ordering::Relaxed)
    }

    /// Runs finalized
    pub fn runs_finalized(&self) -> u64 {
        self.runs_finalized.load(Ordering::Relaxed)
    }

    /// Runs sent to review
    pub fn runs_reviewed(&self) -> u64 {
        self.runs_reviewed.load(Ordering::Relaxed)
    }

    /// Runs failed
    pub fn runs_failed(&self) -> u64 {
        self.runs_failed.load(Ordering::Relaxed)
    }

    /// Agent fallbacks
    pub fn agent_fallbacks(&self) -> u64 {
        self.agent_fallbacks.load(Ordering::Relaxed)
    }

    /// Documents quarantined
    pub fn documents_quarantined(&self) -> u64 {
        self.documents_quarantined.load(Ordering::Relaxed)
    }

    /// Human reviews completed
    pub fn reviews_completed(&self) -> u64 {
        self.reviews_completed.load(Ordering::Relaxed)
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        [
            "Pipeline Metrics Summary".to_string(),
            "========================".to_string(),
            format!("Runs started: {}", self.runs_started()),
            format!("Runs finalized: {}", self.runs_finalized()),
            format!("Runs sent to review: {}", self.runs_reviewed()),
            format!("Runs failed: {}", self.runs_failed()),
            format!("Reviews completed: {}", self.reviews_completed()),
            format!("Agent fallbacks: {}", self.agent_fallbacks()),
            format!("Documents quarantined: {}", self.documents_quarantined()),
        ]
        .join("\n")
    }
}
