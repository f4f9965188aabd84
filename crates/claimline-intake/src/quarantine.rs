//! Quarantine moves and ingestion failure events

use claimline_domain::events::INGESTION_FAILED;
use claimline_domain::keys::quarantine_key;
use claimline_domain::traits::{EventBus, ObjectStore};
use claimline_domain::{ClaimId, ServiceError};
use serde_json::json;
use tracing::warn;

/// Move an object under `quarantine/<reason>/` and return the new key
pub(crate) fn quarantine_object(
    objects: &dyn ObjectStore,
    key: &str,
    reason: &str,
) -> Result<String, ServiceError> {
    let target = quarantine_key(reason, key);
    objects.copy(key, &target)?;
    objects.delete(key)?;
    warn!("Quarantined '{}' as '{}'", key, target);
    Ok(target)
}

/// Publish an ingestion failure
///
/// Notifications are best effort: a bus failure is logged, not raised.
pub(crate) fn publish_failure(
    events: &dyn EventBus,
    claim_id: Option<ClaimId>,
    error_code: &str,
    object_key: &str,
) {
    let payload = json!({
        "error_code": error_code,
        "object_key": object_key,
        "claim_id": claim_id.map(|id| id.to_string()),
    });
    if let Err(e) = events.publish(INGESTION_FAILED, payload) {
        warn!("Failed to publish {} for '{}': {}", error_code, object_key, e);
    }
}
