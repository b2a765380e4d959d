//! Mapping of the gateway's per-recipient results onto outcome categories.

use super::types::{BatchOutcome, MulticastResponse, UpdatedId};

/// Error code for a registration the device has dropped.
pub const NOT_REGISTERED: &str = "NotRegistered";

/// Walk the request recipients and the result array side by side.
///
/// Result `i` belongs to recipient `i`. Every entry is inspected even when
/// the summary counters say nothing is left; a disagreement between the
/// counters and the entries is logged.
pub fn reconcile(clients: &[String], response: &MulticastResponse) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();
    let mut failures = 0u32;
    let mut canonical = 0u32;

    if response.results.len() != clients.len() {
        tracing::warn!(
            recipients = clients.len(),
            results = response.results.len(),
            "Gateway result count differs from batch size"
        );
    }

    for (client, result) in clients.iter().zip(&response.results) {
        if let Some(error) = result.error.as_deref() {
            failures += 1;
            if error == NOT_REGISTERED {
                outcome.removed.push(client.clone());
            } else {
                outcome.invalid.push(client.clone());
            }
            continue;
        }

        if let Some(new_id) = &result.registration_id {
            canonical += 1;
            outcome.updated.push(UpdatedId {
                old_id: client.clone(),
                new_id: new_id.clone(),
            });
        }
    }

    if failures != response.failure || canonical != response.canonical_ids {
        tracing::warn!(
            reported_failure = response.failure,
            observed_failure = failures,
            reported_canonical_ids = response.canonical_ids,
            observed_canonical_ids = canonical,
            "Gateway summary counters disagree with per-recipient results"
        );
    }

    outcome
}
