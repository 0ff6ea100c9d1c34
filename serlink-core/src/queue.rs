//! Bounded FIFO of received telegrams awaiting consumption by the host.

use std::collections::VecDeque;

use crate::telegram::Telegram;

/// Maximum number of unread telegrams held at once.
pub const INBOUND_CAPACITY: usize = 10;

/// Arrival-ordered holding area between the inbound processor and `read()`.
#[derive(Debug, Default)]
pub struct InboundQueue {
    entries: VecDeque<Telegram>,
}

impl InboundQueue {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(INBOUND_CAPACITY),
        }
    }

    /// Append at the tail. Returns false when the queue is full; the caller
    /// decides what rejection means (the link withholds the ACK so the peer
    /// retransmits).
    pub fn push(&mut self, telegram: Telegram) -> bool {
        if self.entries.len() >= INBOUND_CAPACITY {
            return false;
        }
        self.entries.push_back(telegram);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove and return the oldest telegram.
    pub fn pop(&mut self) -> Option<Telegram> {
        self.entries.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order() {
        let mut queue = InboundQueue::new();
        for kind in 1..=3 {
            assert!(queue.push(Telegram::new(kind, vec![])));
        }
        assert_eq!(queue.len(), 3);
        for kind in 1..=3 {
            assert_eq!(queue.pop().unwrap().kind, kind);
        }
        assert!(queue.pop().is_none());
    }

    #[test]
    fn rejects_beyond_capacity() {
        let mut queue = InboundQueue::new();
        for kind in 0..INBOUND_CAPACITY as u8 {
            assert!(queue.push(Telegram::new(kind + 1, vec![])));
        }
        assert!(!queue.push(Telegram::new(99, vec![])));
        assert_eq!(queue.len(), INBOUND_CAPACITY);
        // Draining one makes room again.
        queue.pop();
        assert!(queue.push(Telegram::new(99, vec![])));
    }
}
