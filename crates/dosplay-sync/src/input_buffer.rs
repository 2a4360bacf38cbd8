//! Local input captured before the host has started the session.

use std::collections::VecDeque;

pub const DEFAULT_INPUT_BUFFER_CAPACITY: usize = 128;

/// Bounded FIFO that drops its oldest entry when full.
#[derive(Debug)]
pub struct InputBuffer<T> {
    capacity: usize,
    events: VecDeque<T>,
}

impl<T> InputBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            events: VecDeque::with_capacity(capacity),
        }
    }

    /// Append an event. Returns the entry dropped to make room, if any.
    pub fn push(&mut self, event: T) -> Option<T> {
        let dropped = if self.events.len() >= self.capacity {
            self.events.pop_front()
        } else {
            None
        };
        self.events.push_back(event);
        dropped
    }

    /// Drain everything, oldest first. The buffer is empty afterwards.
    pub fn flush_in_order(&mut self) -> Vec<T> {
        self.events.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl<T> Default for InputBuffer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_INPUT_BUFFER_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flushes_in_order_once() {
        let mut buf = InputBuffer::default();
        buf.push("e1");
        buf.push("e2");
        buf.push("e3");
        assert_eq!(buf.flush_in_order(), vec!["e1", "e2", "e3"]);
        assert!(buf.is_empty());
        assert!(buf.flush_in_order().is_empty());
    }

    #[test]
    fn drops_oldest_when_full() {
        let mut buf = InputBuffer::new(3);
        assert_eq!(buf.push(1), None);
        assert_eq!(buf.push(2), None);
        assert_eq!(buf.push(3), None);
        assert_eq!(buf.push(4), Some(1));
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.flush_in_order(), vec![2, 3, 4]);
    }

    #[test]
    fn default_capacity_is_128() {
        let mut buf = InputBuffer::default();
        for i in 0..200 {
            buf.push(i);
        }
        let flushed = buf.flush_in_order();
        assert_eq!(flushed.len(), 128);
        assert_eq!(flushed.first(), Some(&72));
        assert_eq!(flushed.last(), Some(&199));
    }
}
