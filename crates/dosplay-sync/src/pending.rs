//! Outbound reliable envelopes waiting for an ack.
//!
//! Records are dropped when acked and never re-sent. When the ledger is
//! full the oldest record is evicted, so a participant that never hears
//! acks (alone in a session, or on a lossy channel) stays bounded.

use std::collections::BTreeMap;

use tracing::debug;

use crate::protocol::Envelope;

pub const DEFAULT_MAX_PENDING: usize = 1_024;

#[derive(Debug, Clone, PartialEq)]
pub struct PendingSend {
    pub seq: u64,
    pub envelope: Envelope,
    pub sent_at: u64,
}

#[derive(Debug)]
pub struct PendingLedger {
    capacity: usize,
    records: BTreeMap<u64, PendingSend>,
}

impl PendingLedger {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            records: BTreeMap::new(),
        }
    }

    /// Store a record. Returns the seq evicted to make room, if any.
    pub fn record(&mut self, pending: PendingSend) -> Option<u64> {
        let mut evicted = None;
        if self.records.len() >= self.capacity && !self.records.contains_key(&pending.seq) {
            if let Some((seq, _)) = self.records.pop_first() {
                debug!(seq, "Pending ledger full, evicting oldest");
                evicted = Some(seq);
            }
        }
        self.records.insert(pending.seq, pending);
        evicted
    }

    /// Remove the record for `seq`. Returns `false` for unmatched acks.
    pub fn acknowledge(&mut self, seq: u64) -> bool {
        self.records.remove(&seq).is_some()
    }

    pub fn contains(&self, seq: u64) -> bool {
        self.records.contains_key(&seq)
    }

    pub fn get(&self, seq: u64) -> Option<&PendingSend> {
        self.records.get(&seq)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for PendingLedger {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PENDING)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Body;

    fn pending(seq: u64) -> PendingSend {
        PendingSend {
            seq,
            envelope: Envelope {
                session_id: None,
                sent_at: seq * 10,
                seq: Some(seq),
                body: Body::Launch { url: "x".into() },
            },
            sent_at: seq * 10,
        }
    }

    #[test]
    fn ack_removes_record() {
        let mut ledger = PendingLedger::default();
        ledger.record(pending(1));
        ledger.record(pending(2));
        assert!(ledger.acknowledge(1));
        assert!(!ledger.contains(1));
        assert!(ledger.contains(2));
        assert_eq!(ledger.get(2).map(|p| p.sent_at), Some(20));
    }

    #[test]
    fn unmatched_ack_is_ignored() {
        let mut ledger = PendingLedger::default();
        ledger.record(pending(1));
        assert!(!ledger.acknowledge(99));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut ledger = PendingLedger::new(2);
        assert_eq!(ledger.record(pending(1)), None);
        assert_eq!(ledger.record(pending(2)), None);
        assert_eq!(ledger.record(pending(3)), Some(1));
        assert_eq!(ledger.len(), 2);
        assert!(!ledger.contains(1));
    }

    #[test]
    fn empty_ledger() {
        let ledger = PendingLedger::default();
        assert!(ledger.is_empty());
        assert_eq!(ledger.len(), 0);
    }
}
