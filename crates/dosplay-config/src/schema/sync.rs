//! Sync protocol timing and capacity settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Lower bound for the prune period; shorter periods just busy-poll.
pub const MIN_PRUNE_INTERVAL_MS: u64 = 1_000;

/// Protocol dispatcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Identifier the host transport uses to route our payloads.
    pub protocol_id: String,
    /// Period of the `hello` heartbeat broadcast.
    pub heartbeat_interval_ms: u64,
    /// A peer not heard from for this long is evicted. Must be at least
    /// twice the heartbeat interval.
    pub peer_timeout_ms: u64,
    /// Period of the peer-pruning pass.
    pub prune_interval_ms: u64,
    /// Per-sender sequence numbers remembered before the set is cleared.
    pub dedup_capacity: usize,
    /// Local key events held before the session is initialized.
    pub input_buffer_capacity: usize,
    /// Unacknowledged sends remembered before the oldest is dropped.
    pub max_pending: usize,
    /// Capacity of the `SyncEvent` channel handed to the UI.
    pub event_channel_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            protocol_id: "dosplay".into(),
            heartbeat_interval_ms: 5_000,
            peer_timeout_ms: 15_000,
            prune_interval_ms: 7_500,
            dedup_capacity: 256,
            input_buffer_capacity: 128,
            max_pending: 1_024,
            event_channel_capacity: 256,
        }
    }
}

impl SyncConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn prune_interval(&self) -> Duration {
        Duration::from_millis(self.prune_interval_ms.max(MIN_PRUNE_INTERVAL_MS))
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_millis(self.peer_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_timing() {
        let config = SyncConfig::default();
        assert_eq!(config.heartbeat_interval(), Duration::from_secs(5));
        assert_eq!(config.peer_timeout(), Duration::from_secs(15));
        assert_eq!(config.prune_interval(), Duration::from_millis(7_500));
    }

    #[test]
    fn prune_interval_is_floored() {
        let config = SyncConfig {
            prune_interval_ms: 10,
            ..SyncConfig::default()
        };
        assert_eq!(config.prune_interval(), Duration::from_millis(MIN_PRUNE_INTERVAL_MS));
    }
}
