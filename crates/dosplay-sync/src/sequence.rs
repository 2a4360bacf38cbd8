/// Issues the `seq` tag for outbound reliable envelopes.
///
/// Starts at 1 and only ever increases for the lifetime of the session.
#[derive(Debug, Default)]
pub struct SequenceAllocator {
    last: u64,
}

impl SequenceAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_seq(&mut self) -> u64 {
        self.last += 1;
        self.last
    }

    /// The most recently issued value, 0 if none yet.
    pub fn last(&self) -> u64 {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_one_and_increases() {
        let mut seq = SequenceAllocator::new();
        assert_eq!(seq.last(), 0);
        assert_eq!(seq.next_seq(), 1);
        assert_eq!(seq.next_seq(), 2);
        assert_eq!(seq.next_seq(), 3);
        assert_eq!(seq.last(), 3);
    }
}
