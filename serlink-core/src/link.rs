//! Host-driven link facade: `SerialLink` receives bytes and clock readings
//! from the host, returns events, and never blocks or schedules anything of
//! its own.

use std::time::Instant;

use tracing::{debug, trace};

use crate::frame;
use crate::queue::InboundQueue;
use crate::telegram::{Telegram, ACK_KIND, MAX_PAYLOAD_LEN};
use crate::tracker::ResendTracker;

pub use crate::tracker::DeliveryStatus;

/// Byte-stream transport the link runs over. Implementations must be
/// non-blocking: `read_line` returns a line only once it is fully buffered,
/// never a partial one.
pub trait Transport {
    /// Write raw bytes to the peer. Assumed to eventually succeed; partial
    /// writes are the implementation's problem.
    fn write_bytes(&mut self, bytes: &[u8]);

    /// Take one complete terminator-delimited line, terminator stripped, or
    /// `None` when no full line is buffered yet.
    fn read_line(&mut self) -> Option<Vec<u8>>;
}

/// Monotonic millisecond clock.
pub trait Clock {
    fn now_millis(&self) -> u64;
}

/// Milliseconds elapsed since construction, from [`Instant`].
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_millis(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Retransmission parameters.
#[derive(Debug, Clone, Copy)]
pub struct LinkConfig {
    /// Minimum spacing between transmissions of the same frame.
    pub resend_interval_ms: u64,
    /// Resend attempts before a delivery is abandoned.
    pub max_retries: u8,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            resend_interval_ms: 1000,
            max_retries: 3,
        }
    }
}

/// Error from [`SerialLink::send`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SendError {
    #[error("telegram kind 0 is reserved for acknowledgments")]
    ReservedKind,
    #[error("payload of {0} bytes exceeds the {max}-byte maximum", max = MAX_PAYLOAD_LEN)]
    PayloadTooLarge(usize),
}

/// Error from [`SerialLink::read`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ReadError {
    #[error("no telegram available")]
    Empty,
}

/// Notification produced by [`SerialLink::poll`] for the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// A send exhausted its retry budget without an acknowledgment.
    DeliveryAbandoned { message_id: u8 },
    /// A valid telegram arrived while the inbound queue was full. It was
    /// dropped without an ACK, so the peer will retransmit it.
    InboundDropped { kind: u8, message_id: u8 },
}

/// Point-to-point at-least-once telegram link over a serial byte stream.
///
/// Single-owner and poll-driven: the host calls [`send`](Self::send) to
/// transmit and [`poll`](Self::poll) repeatedly from its own loop to drain
/// inbound lines and run the resend scan.
#[derive(Debug)]
pub struct SerialLink<T: Transport, C: Clock> {
    transport: T,
    clock: C,
    config: LinkConfig,
    tracker: ResendTracker,
    inbound: InboundQueue,
    next_message_id: u8,
}

impl<T: Transport, C: Clock> SerialLink<T, C> {
    pub fn new(transport: T, clock: C, config: LinkConfig) -> Self {
        Self {
            transport,
            clock,
            config,
            tracker: ResendTracker::new(),
            inbound: InboundQueue::new(),
            next_message_id: 0,
        }
    }

    /// Encode and transmit a telegram, and record it for retransmission.
    /// Returns the assigned message ID, which later appears in
    /// [`LinkEvent::DeliveryAbandoned`] and [`delivery_status`](Self::delivery_status).
    pub fn send(&mut self, telegram: Telegram) -> Result<u8, SendError> {
        if telegram.kind == ACK_KIND {
            return Err(SendError::ReservedKind);
        }
        if telegram.payload.len() > MAX_PAYLOAD_LEN {
            return Err(SendError::PayloadTooLarge(telegram.payload.len()));
        }
        let message_id = self.next_message_id;
        self.next_message_id = self.next_message_id.wrapping_add(1);
        let wire = frame::encode_frame(telegram.kind, message_id, &telegram.payload);
        self.transport.write_bytes(&wire);
        self.tracker.record(message_id, wire, self.clock.now_millis());
        Ok(message_id)
    }

    /// One poll cycle: drain every fully buffered line from the transport,
    /// then run one resend scan. Invalid lines are link noise and are
    /// discarded without reply.
    pub fn poll(&mut self) -> Vec<LinkEvent> {
        let mut events = Vec::new();
        while let Some(line) = self.transport.read_line() {
            let decoded = match frame::decode_frame(&line) {
                Ok(decoded) => decoded,
                Err(err) => {
                    trace!(error = %err, "discarding invalid line");
                    continue;
                }
            };
            if decoded.is_ack() {
                if !self.tracker.acknowledge(decoded.message_id) {
                    // Already acknowledged, abandoned, or evicted.
                    trace!(
                        message_id = decoded.message_id,
                        "ack without matching pending send"
                    );
                }
                continue;
            }
            let (kind, message_id) = (decoded.kind, decoded.message_id);
            if self.inbound.push(Telegram::new(kind, decoded.payload)) {
                // Acknowledge before touching the next line.
                let ack = frame::encode_frame(ACK_KIND, message_id, &[]);
                self.transport.write_bytes(&ack);
            } else {
                debug!(kind, message_id, "inbound queue full, dropping without ack");
                events.push(LinkEvent::InboundDropped { kind, message_id });
            }
        }

        let now = self.clock.now_millis();
        let Self {
            transport,
            tracker,
            config,
            ..
        } = self;
        for message_id in tracker.scan(now, config.resend_interval_ms, config.max_retries, |wire| {
            transport.write_bytes(wire);
        }) {
            events.push(LinkEvent::DeliveryAbandoned { message_id });
        }
        events
    }

    /// Number of received telegrams waiting to be read.
    pub fn available(&self) -> usize {
        self.inbound.len()
    }

    /// Remove and return the oldest received telegram.
    pub fn read(&mut self) -> Result<Telegram, ReadError> {
        self.inbound.pop().ok_or(ReadError::Empty)
    }

    /// Delivery state of a previous [`send`](Self::send). `Unknown` once the
    /// resend window has wrapped past it.
    pub fn delivery_status(&self, message_id: u8) -> DeliveryStatus {
        self.tracker.status(message_id)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
