//! Decision to terminal-state mapping

use crate::error::GatekeeperError;
use claimline_domain::ClaimStatus;

/// Map a decision string onto the terminal state it closes a claim in
///
/// Matching is case-insensitive and ignores surrounding whitespace. Only the
/// fixed table below is accepted; anything else is an error so that an
/// unexpected value can never default to an approval.
///
/// | Decision                        | State      |
/// |---------------------------------|------------|
/// | APPROVE, APPROVED               | `Approved` |
/// | DENY, DENIED, REJECT, REJECTED  | `Denied`   |
/// | FLAG, FLAGGED                   | `Flagged`  |
///
/// # Examples
///
/// ```
/// use claimline_gatekeeper::map_decision;
/// use claimline_domain::ClaimStatus;
///
/// assert_eq!(map_decision(" rejected ").unwrap(), ClaimStatus::Denied);
/// assert!(map_decision("MAYBE").is_err());
/// ```
pub fn map_decision(decision: &str) -> Result<ClaimStatus, GatekeeperError> {
    match decision.trim().to_uppercase().as_str() {
        "APPROVE" | "APPROVED" => Ok(ClaimStatus::Approved),
        "DENY" | "DENIED" | "REJECT" | "REJECTED" => Ok(ClaimStatus::Denied),
        "FLAG" | "FLAGGED" => Ok(ClaimStatus::Flagged),
        _ => Err(GatekeeperError::UnmappedDecision(decision.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table() {
        for (raw, expected) in [
            ("APPROVE", ClaimStatus::Approved),
            ("approved", ClaimStatus::Approved),
            ("Deny", ClaimStatus::Denied),
            ("DENIED", ClaimStatus::Denied),
            ("reject", ClaimStatus::Denied),
            ("REJECTED", ClaimStatus::Denied),
            ("flag", ClaimStatus::Flagged),
            ("  FLAGGED\n", ClaimStatus::Flagged),
        ] {
            assert_eq!(map_decision(raw).unwrap(), expected, "{}", raw);
        }
    }

    #[test]
    fn test_unknown_values_are_errors() {
        for raw in ["", "REVIEW", "HITL", "CONTINUE", "APPROVE!"] {
            assert!(matches!(
                map_decision(raw),
                Err(GatekeeperError::UnmappedDecision(_))
            ));
        }
    }
}
