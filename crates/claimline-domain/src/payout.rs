//! Payout record - the single monetary outcome of a claim

use crate::{ClaimId, ClaimStatus};
use serde::{Deserialize, Serialize};

/// Recorded payout
///
/// Created at most once per claim. `amount` is zero unless the terminal state
/// is `Approved`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutRecord {
    /// Claim the payout belongs to
    pub claim_id: ClaimId,
    /// Amount actually recorded
    pub amount: f64,
    /// When the payout was recorded (epoch millis)
    pub paid_at: u64,
    /// Terminal state the decision mapped to
    pub terminal_state: ClaimStatus,
    /// Decision value that triggered finalization
    pub decision: String,
}
