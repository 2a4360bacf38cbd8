//! Validation for the `[sync]` section.

use crate::schema::{DosplayConfig, MIN_PRUNE_INTERVAL_MS};

use super::helpers::{validate_nonzero, validate_range};

/// Validate protocol timing and capacities.
pub(crate) fn validate_sync(errors: &mut Vec<String>, config: &DosplayConfig) {
    let sync = &config.sync;

    if sync.protocol_id.trim().is_empty() {
        errors.push("sync.protocol_id must not be empty".into());
    }

    validate_range(
        errors,
        "sync.heartbeat_interval_ms",
        sync.heartbeat_interval_ms,
        100,
        60_000,
    );

    // One missed heartbeat must never evict a live peer.
    let min_timeout = sync.heartbeat_interval_ms.saturating_mul(2);
    if sync.peer_timeout_ms < min_timeout {
        errors.push(format!(
            "sync.peer_timeout_ms = {} must be at least twice sync.heartbeat_interval_ms ({min_timeout})",
            sync.peer_timeout_ms
        ));
    }

    validate_range(
        errors,
        "sync.prune_interval_ms",
        sync.prune_interval_ms,
        MIN_PRUNE_INTERVAL_MS,
        sync.peer_timeout_ms.max(MIN_PRUNE_INTERVAL_MS),
    );

    validate_nonzero(errors, "sync.dedup_capacity", sync.dedup_capacity);
    validate_nonzero(errors, "sync.input_buffer_capacity", sync.input_buffer_capacity);
    validate_nonzero(errors, "sync.max_pending", sync.max_pending);
    validate_nonzero(errors, "sync.event_channel_capacity", sync.event_channel_capacity);
}
