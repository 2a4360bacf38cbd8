//! Per-sender memory of recently delivered sequence numbers.
//!
//! Each sender's set is capped. When a set is full it is cleared outright
//! before the next insert, not trimmed oldest-first. Memory stays bounded,
//! at the price that a sequence number delivered before a clear can be
//! delivered again afterwards. Replaying a key twice is the accepted cost.

use std::collections::{HashMap, HashSet};

use tracing::debug;

pub const DEFAULT_DEDUP_CAPACITY: usize = 256;

#[derive(Debug)]
pub struct DedupCache {
    capacity: usize,
    seen: HashMap<String, HashSet<u64>>,
}

impl DedupCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            seen: HashMap::new(),
        }
    }

    pub fn was_seen(&self, sender: &str, seq: u64) -> bool {
        self.seen.get(sender).is_some_and(|set| set.contains(&seq))
    }

    pub fn mark_seen(&mut self, sender: &str, seq: u64) {
        let set = self.seen.entry(sender.to_string()).or_default();
        if set.len() >= self.capacity {
            debug!(sender, capacity = self.capacity, "Dedup set full, clearing");
            set.clear();
        }
        set.insert(seq);
    }

    /// Returns `true` if `seq` is new for `sender` (and records it),
    /// `false` if it is a replay.
    pub fn check_and_mark(&mut self, sender: &str, seq: u64) -> bool {
        if self.was_seen(sender, seq) {
            return false;
        }
        self.mark_seen(sender, seq);
        true
    }

    /// Number of remembered sequence numbers for one sender.
    pub fn len_for(&self, sender: &str) -> usize {
        self.seen.get(sender).map_or(0, HashSet::len)
    }
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_CAPACITY)
    }
}
