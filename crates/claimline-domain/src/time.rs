//! Wall-clock helpers

use std::time::{SystemTime, UNIX_EPOCH};

/// Current time in milliseconds since the Unix epoch
///
/// A clock set before 1970 reports 0 rather than failing.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
