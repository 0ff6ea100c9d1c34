//! Outbound delivery tracking: a fixed circular window of sent frames and
//! the retransmission policy that drives at-least-once delivery.

use tracing::debug;

/// Number of sends that may be tracked for retransmission at once. Once the
/// window wraps, the oldest slot is overwritten even if still pending.
pub const RESEND_SLOTS: usize = 10;

/// Delivery outcome for a tracked send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    /// Sent, awaiting acknowledgment; may still be retransmitted.
    Pending,
    /// Acknowledged by the peer.
    Acknowledged,
    /// Retry budget exhausted without an acknowledgment; no further
    /// retransmissions.
    Abandoned,
    /// Not tracked: never sent, or evicted when the window wrapped.
    Unknown,
}

#[derive(Debug)]
struct PendingSlot {
    status: DeliveryStatus,
    /// Time of the most recent transmission, milliseconds.
    sent_at: u64,
    /// Number of retransmissions so far.
    retries: u8,
    message_id: u8,
    /// The exact bytes put on the wire; resends repeat them verbatim.
    frame: Vec<u8>,
}

/// Circular record of sent-but-possibly-unacknowledged frames.
#[derive(Debug)]
pub struct ResendTracker {
    slots: [Option<PendingSlot>; RESEND_SLOTS],
    index: usize,
}

impl ResendTracker {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
            index: 0,
        }
    }

    /// Record a freshly transmitted frame at the current circular index,
    /// overwriting the oldest slot unconditionally.
    pub fn record(&mut self, message_id: u8, frame: Vec<u8>, now: u64) {
        if let Some(old) = &self.slots[self.index] {
            if old.status == DeliveryStatus::Pending {
                debug!(
                    message_id = old.message_id,
                    "evicting pending send from resend window"
                );
            }
        }
        self.slots[self.index] = Some(PendingSlot {
            status: DeliveryStatus::Pending,
            sent_at: now,
            retries: 0,
            message_id,
            frame,
        });
        self.index = (self.index + 1) % RESEND_SLOTS;
    }

    /// Mark the first pending slot with this message ID as acknowledged.
    /// Returns whether a match was found; duplicate or stale ACKs find none.
    pub fn acknowledge(&mut self, message_id: u8) -> bool {
        for slot in self.slots.iter_mut().flatten() {
            if slot.message_id == message_id && slot.status == DeliveryStatus::Pending {
                slot.status = DeliveryStatus::Acknowledged;
                return true;
            }
        }
        false
    }

    /// One pass over the window: retransmit every pending slot whose resend
    /// interval has elapsed, verbatim. A slot whose retry count reaches
    /// `max_retries` is abandoned; with a budget of zero the first timeout
    /// abandons without retransmitting. Returns the message IDs abandoned
    /// during this scan.
    pub fn scan(
        &mut self,
        now: u64,
        interval_ms: u64,
        max_retries: u8,
        mut retransmit: impl FnMut(&[u8]),
    ) -> Vec<u8> {
        let mut abandoned = Vec::new();
        for slot in self.slots.iter_mut().flatten() {
            if slot.status != DeliveryStatus::Pending
                || now.saturating_sub(slot.sent_at) < interval_ms
            {
                continue;
            }
            if slot.retries >= max_retries {
                slot.status = DeliveryStatus::Abandoned;
                abandoned.push(slot.message_id);
                continue;
            }
            retransmit(&slot.frame);
            slot.sent_at = now;
            slot.retries += 1;
            if slot.retries >= max_retries {
                slot.status = DeliveryStatus::Abandoned;
                abandoned.push(slot.message_id);
            }
        }
        for id in abandoned.iter().copied() {
            debug!(message_id = id, "delivery abandoned after retry budget");
        }
        abandoned
    }

    /// Delivery state of a tracked message ID; first match in scan order wins
    /// when the ID has been reused.
    pub fn status(&self, message_id: u8) -> DeliveryStatus {
        self.slots
            .iter()
            .flatten()
            .find(|slot| slot.message_id == message_id)
            .map_or(DeliveryStatus::Unknown, |slot| slot.status)
    }
}

impl Default for ResendTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_n(tracker: &mut ResendTracker, n: u8) {
        for id in 0..n {
            tracker.record(id, vec![id], 0);
        }
    }

    #[test]
    fn acknowledge_matches_once() {
        let mut tracker = ResendTracker::new();
        tracker.record(7, b"frame".to_vec(), 0);
        assert!(tracker.acknowledge(7));
        assert_eq!(tracker.status(7), DeliveryStatus::Acknowledged);
        // Duplicate ACK finds nothing pending.
        assert!(!tracker.acknowledge(7));
    }

    #[test]
    fn acknowledge_unknown_id_is_noop() {
        let mut tracker = ResendTracker::new();
        tracker.record(1, b"x".to_vec(), 0);
        assert!(!tracker.acknowledge(2));
        assert_eq!(tracker.status(1), DeliveryStatus::Pending);
    }

    #[test]
    fn window_wrap_evicts_oldest() {
        let mut tracker = ResendTracker::new();
        record_n(&mut tracker, RESEND_SLOTS as u8);
        tracker.record(100, b"new".to_vec(), 0);
        // Message 0 occupied the slot just overwritten.
        assert_eq!(tracker.status(0), DeliveryStatus::Unknown);
        assert_eq!(tracker.status(100), DeliveryStatus::Pending);
        assert!(!tracker.acknowledge(0));
    }

    #[test]
    fn scan_respects_interval() {
        let mut tracker = ResendTracker::new();
        tracker.record(1, b"f".to_vec(), 0);
        let mut sent = Vec::new();
        tracker.scan(999, 1000, 3, |f| sent.push(f.to_vec()));
        assert!(sent.is_empty());
        tracker.scan(1000, 1000, 3, |f| sent.push(f.to_vec()));
        assert_eq!(sent, vec![b"f".to_vec()]);
        // Timestamp was reset; nothing due until another interval passes.
        tracker.scan(1500, 1000, 3, |f| sent.push(f.to_vec()));
        assert_eq!(sent.len(), 1);
    }

    #[test]
    fn retry_budget_abandons_after_final_resend() {
        let mut tracker = ResendTracker::new();
        tracker.record(5, b"f".to_vec(), 0);
        let mut transmissions = 0;
        for now in [1000, 2000, 3000, 4000, 5000] {
            let abandoned = tracker.scan(now, 1000, 3, |_| transmissions += 1);
            if now == 3000 {
                assert_eq!(abandoned, vec![5]);
            } else {
                assert!(abandoned.is_empty());
            }
        }
        assert_eq!(transmissions, 3);
        assert_eq!(tracker.status(5), DeliveryStatus::Abandoned);
    }

    #[test]
    fn zero_retry_budget_never_retransmits() {
        let mut tracker = ResendTracker::new();
        tracker.record(2, b"f".to_vec(), 0);
        let mut transmissions = 0;
        let abandoned = tracker.scan(1000, 1000, 0, |_| transmissions += 1);
        assert_eq!(transmissions, 0);
        assert_eq!(abandoned, vec![2]);
    }

    #[test]
    fn ack_after_abandon_is_ignored() {
        let mut tracker = ResendTracker::new();
        tracker.record(3, b"f".to_vec(), 0);
        tracker.scan(1000, 1000, 0, |_| {});
        assert!(!tracker.acknowledge(3));
        assert_eq!(tracker.status(3), DeliveryStatus::Abandoned);
    }

    #[test]
    fn acknowledged_slot_not_rescanned() {
        let mut tracker = ResendTracker::new();
        tracker.record(4, b"f".to_vec(), 0);
        tracker.acknowledge(4);
        let mut transmissions = 0;
        tracker.scan(10_000, 1000, 3, |_| transmissions += 1);
        assert_eq!(transmissions, 0);
    }
}
