//! Claimline Gatekeeper
//!
//! The last step of every claim: turning a decision into a terminal state
//! and recording at most one payout.
//!
//! The Gatekeeper provides:
//! - [`map_decision`], the fixed decision to terminal-state table
//! - [`PayoutGuard`], which writes the payout record once and closes the claim
//! - [`ReviewDesk`], the human-decision path for claims held for review
//!
//! Only an approval ever records a non-zero amount.
//!
//! # Examples
//!
//! ```
//! use claimline_gatekeeper::{FinalizeOutcome, PayoutGuard};
//! use claimline_domain::keys::claim_key;
//! use claimline_domain::traits::KeyValueStore;
//! use claimline_domain::ClaimId;
//! use claimline_store::{MemoryEventBus, SqliteKvStore};
//! use std::sync::Arc;
//!
//! let store = Arc::new(SqliteKvStore::in_memory().unwrap());
//! let guard = PayoutGuard::new(store.clone(), Arc::new(MemoryEventBus::new()));
//!
//! let id = ClaimId::new();
//! let doc = serde_json::json!({ "claim_id": id.to_string(), "status": "PROCESSING" });
//! store.put(&claim_key(&id), doc.as_object().cloned().unwrap()).unwrap();
//!
//! // A denial never pays, whatever amount was proposed
//! let outcome = guard.finalize(id, "DENIED", 999.99).unwrap();
//! assert!(matches!(outcome, FinalizeOutcome::Recorded(r) if r.amount == 0.0));
//! ```

#![warn(missing_docs)]

mod error;
mod payout;
mod review;
mod terminal;

pub use error::GatekeeperError;
pub use payout::{guarded_amount, FinalizeOutcome, PayoutGuard, SkipReason};
pub use review::{ReviewDesk, ReviewOutcome, ReviewRequest, MIN_JUSTIFICATION_CHARS, REVIEW_DECISIONS};
pub use terminal::map_decision;
