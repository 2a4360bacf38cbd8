//! Registry of peers heard from recently.

use std::collections::HashMap;
use std::time::Duration;

use dosplay_common::PeerId;

/// Peer id → last time (epoch ms) any envelope arrived from it.
///
/// A peer in the registry has been heard from within the timeout window as
/// of the last prune. Never-seen and timed-out peers look the same.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    last_seen: HashMap<PeerId, u64>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or refresh. Returns `true` when the peer was not present.
    pub fn mark_seen(&mut self, peer: &PeerId, now_ms: u64) -> bool {
        self.last_seen.insert(peer.clone(), now_ms).is_none()
    }

    /// Remove every peer silent for longer than `timeout`. Returns the
    /// removed ids, sorted.
    pub fn prune(&mut self, now_ms: u64, timeout: Duration) -> Vec<PeerId> {
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        let mut removed = Vec::new();
        self.last_seen.retain(|peer, last| {
            let stale = now_ms.saturating_sub(*last) > timeout_ms;
            if stale {
                removed.push(peer.clone());
            }
            !stale
        });
        removed.sort();
        removed
    }

    pub fn count(&self) -> usize {
        self.last_seen.len()
    }

    pub fn contains(&self, peer: &PeerId) -> bool {
        self.last_seen.contains_key(peer)
    }

    pub fn last_seen(&self, peer: &PeerId) -> Option<u64> {
        self.last_seen.get(peer).copied()
    }

    /// Sorted snapshot of current peers.
    pub fn peers(&self) -> Vec<PeerId> {
        let mut peers: Vec<PeerId> = self.last_seen.keys().cloned().collect();
        peers.sort();
        peers
    }
}

/// Connectivity summary shown by the UI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeerStatus {
    pub peer_count: usize,
    /// Whether the host has started the session yet.
    pub active: bool,
}

impl PeerStatus {
    pub fn is_connected(&self) -> bool {
        self.peer_count > 0
    }

    pub fn status_text(&self) -> String {
        match (self.active, self.peer_count) {
            (false, _) => "Waiting for session".to_string(),
            (true, 0) => "No peers".to_string(),
            (true, 1) => "1 peer connected".to_string(),
            (true, n) => format!("{n} peers connected"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(15);

    #[test]
    fn first_sighting_reports_new() {
        let mut reg = PeerRegistry::new();
        let alice = PeerId::from("alice");
        assert!(reg.mark_seen(&alice, 0));
        assert!(!reg.mark_seen(&alice, 1_000));
        assert_eq!(reg.count(), 1);
        assert_eq!(reg.last_seen(&alice), Some(1_000));
    }

    #[test]
    fn regular_heartbeats_keep_peer() {
        let mut reg = PeerRegistry::new();
        let alice = PeerId::from("alice");
        for tick in 0..10u64 {
            let now = tick * 5_000;
            reg.mark_seen(&alice, now);
            assert!(reg.prune(now + 4_000, TIMEOUT).is_empty());
        }
        assert!(reg.contains(&alice));
    }

    #[test]
    fn gap_beyond_timeout_evicts() {
        let mut reg = PeerRegistry::new();
        let alice = PeerId::from("alice");
        reg.mark_seen(&alice, 1_000);

        // Exactly at the timeout is still alive.
        assert!(reg.prune(16_000, TIMEOUT).is_empty());
        assert_eq!(reg.prune(16_001, TIMEOUT), vec![alice.clone()]);
        assert!(!reg.contains(&alice));
        assert_eq!(reg.count(), 0);
    }

    #[test]
    fn prune_returns_sorted_ids() {
        let mut reg = PeerRegistry::new();
        reg.mark_seen(&PeerId::from("carol"), 0);
        reg.mark_seen(&PeerId::from("alice"), 0);
        reg.mark_seen(&PeerId::from("bob"), 20_000);
        let removed = reg.prune(20_000, TIMEOUT);
        assert_eq!(removed, vec![PeerId::from("alice"), PeerId::from("carol")]);
        assert_eq!(reg.peers(), vec![PeerId::from("bob")]);
    }

    #[test]
    fn clock_going_backwards_does_not_evict() {
        let mut reg = PeerRegistry::new();
        reg.mark_seen(&PeerId::from("alice"), 50_000);
        assert!(reg.prune(10_000, TIMEOUT).is_empty());
    }

    #[test]
    fn status_text() {
        let waiting = PeerStatus::default();
        assert_eq!(waiting.status_text(), "Waiting for session");
        assert!(!waiting.is_connected());

        let alone = PeerStatus { peer_count: 0, active: true };
        assert_eq!(alone.status_text(), "No peers");

        let one = PeerStatus { peer_count: 1, active: true };
        assert_eq!(one.status_text(), "1 peer connected");
        assert!(one.is_connected());

        let three = PeerStatus { peer_count: 3, active: true };
        assert_eq!(three.status_text(), "3 peers connected");
    }
}
