//! Run state machine

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a pipeline run is
///
/// Steps are strictly sequential. `Finalized` and `AwaitingReview` end a
/// successful run; `Failed` is the single failure state and any state that
/// has not ended may move to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    /// The run was accepted
    Started,
    /// Every received document was extracted or quarantined
    Extracted,
    /// A context bundle was written
    ContextReady,
    /// The fraud screen ran
    FraudScreened,
    /// The adjudication agent ran
    Adjudicated,
    /// The claim was handed to a human
    AwaitingReview,
    /// A payout decision was recorded
    Finalized,
    /// The run failed and the claim went to error review
    Failed,
}

impl RunState {
    /// Whether the run is over
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            RunState::AwaitingReview | RunState::Finalized | RunState::Failed
        )
    }

    /// Whether `next` may follow `self`
    ///
    /// # Examples
    ///
    /// ```
    /// use claimline_orchestrator::RunState;
    ///
    /// assert!(RunState::Started.can_transition_to(RunState::Extracted));
    /// assert!(RunState::ContextReady.can_transition_to(RunState::Failed));
    /// assert!(!RunState::Started.can_transition_to(RunState::Finalized));
    /// assert!(!RunState::Finalized.can_transition_to(RunState::Failed));
    /// ```
    pub fn can_transition_to(&self, next: RunState) -> bool {
        use RunState::*;

        if next == Failed {
            return !self.is_final();
        }
        matches!(
            (self, next),
            (Started, Extracted)
                | (Extracted, ContextReady)
                | (ContextReady, FraudScreened)
                | (FraudScreened, Adjudicated)
                | (FraudScreened, AwaitingReview)
                | (FraudScreened, Finalized)
                | (Adjudicated, AwaitingReview)
                | (Adjudicated, Finalized)
        )
    }

    /// Get the state name
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Started => "STARTED",
            RunState::Extracted => "EXTRACTED",
            RunState::ContextReady => "CONTEXT_READY",
            RunState::FraudScreened => "FRAUD_SCREENED",
            RunState::Adjudicated => "ADJUDICATED",
            RunState::AwaitingReview => "AWAITING_REVIEW",
            RunState::Finalized => "FINALIZED",
            RunState::Failed => "FAILED",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [RunState; 8] = [
        RunState::Started,
        RunState::Extracted,
        RunState::ContextReady,
        RunState::FraudScreened,
        RunState::Adjudicated,
        RunState::AwaitingReview,
        RunState::Finalized,
        RunState::Failed,
    ];

    #[test]
    fn test_happy_path_is_allowed() {
        let path = [
            RunState::Started,
            RunState::Extracted,
            RunState::ContextReady,
            RunState::FraudScreened,
            RunState::Adjudicated,
            RunState::Finalized,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_final_states_have_no_exits() {
        for from in ALL.iter().filter(|s| s.is_final()) {
            for to in ALL {
                assert!(!from.can_transition_to(to), "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn test_every_running_state_can_fail() {
        for from in ALL.iter().filter(|s| !s.is_final()) {
            assert!(from.can_transition_to(RunState::Failed));
        }
    }

    #[test]
    fn test_no_skipping_steps() {
        assert!(!RunState::Started.can_transition_to(RunState::ContextReady));
        assert!(!RunState::Extracted.can_transition_to(RunState::FraudScreened));
        assert!(!RunState::ContextReady.can_transition_to(RunState::Adjudicated));
        assert!(!RunState::Adjudicated.can_transition_to(RunState::FraudScreened));
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_value(RunState::AwaitingReview).unwrap();
        assert_eq!(json.as_str(), Some("AWAITING_REVIEW"));
    }
}
