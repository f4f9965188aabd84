//! Status module - lifecycle stages of a claim

use serde::{Deserialize, Serialize};

/// Lifecycle status of a claim
///
/// Claims move forward through the pipeline stages and end in one of the
/// terminal states. `ErrorReview` is where any failed run parks a claim so
/// that it never silently disappears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimStatus {
    /// Documents are being collected
    Intake,

    /// At least one document has been extracted and redacted
    Extracted,

    /// A context bundle is available
    ContextReady,

    /// Decision agents are running
    Processing,

    /// Waiting for a human decision
    NeedsReview,

    /// Approved (payout pending or in progress)
    Approved,

    /// Denied; no payout
    Denied,

    /// Flagged for investigation; no payout
    Flagged,

    /// Payout recorded; the claim is closed
    ClosedPaid,

    /// A run failed; a human must look at the claim
    ErrorReview,
}

impl ClaimStatus {
    /// Get the status name as stored
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Intake => "INTAKE",
            ClaimStatus::Extracted => "EXTRACTED",
            ClaimStatus::ContextReady => "CONTEXT_READY",
            ClaimStatus::Processing => "PROCESSING",
            ClaimStatus::NeedsReview => "NEEDS_REVIEW",
            ClaimStatus::Approved => "APPROVED",
            ClaimStatus::Denied => "DENIED",
            ClaimStatus::Flagged => "FLAGGED",
            ClaimStatus::ClosedPaid => "CLOSED_PAID",
            ClaimStatus::ErrorReview => "ERROR_REVIEW",
        }
    }

    /// Parse a status from its stored name
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "INTAKE" => Some(ClaimStatus::Intake),
            "EXTRACTED" => Some(ClaimStatus::Extracted),
            "CONTEXT_READY" => Some(ClaimStatus::ContextReady),
            "PROCESSING" => Some(ClaimStatus::Processing),
            "NEEDS_REVIEW" => Some(ClaimStatus::NeedsReview),
            "APPROVED" => Some(ClaimStatus::Approved),
            "DENIED" => Some(ClaimStatus::Denied),
            "FLAGGED" => Some(ClaimStatus::Flagged),
            "CLOSED_PAID" => Some(ClaimStatus::ClosedPaid),
            "ERROR_REVIEW" => Some(ClaimStatus::ErrorReview),
            _ => None,
        }
    }

    /// Whether automation will not move the claim any further
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ClaimStatus::Denied
                | ClaimStatus::Flagged
                | ClaimStatus::ClosedPaid
                | ClaimStatus::ErrorReview
        )
    }
}

impl std::fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ClaimStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid claim status: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_names_match_serde() {
        for status in [
            ClaimStatus::Intake,
            ClaimStatus::ContextReady,
            ClaimStatus::NeedsReview,
            ClaimStatus::ClosedPaid,
            ClaimStatus::ErrorReview,
        ] {
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json.as_str(), Some(status.as_str()));
            assert_eq!(ClaimStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(ClaimStatus::ClosedPaid.is_terminal());
        assert!(ClaimStatus::ErrorReview.is_terminal());
        assert!(!ClaimStatus::NeedsReview.is_terminal());
        assert!(!ClaimStatus::Intake.is_terminal());
    }

    #[test]
    fn test_from_str_rejects_unknown() {
        assert!("closed_paid".parse::<ClaimStatus>().is_ok());
        assert!("PAID".parse::<ClaimStatus>().is_err());
    }
}
