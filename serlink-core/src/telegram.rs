//! Telegram types and protocol constants.

/// Telegram kind reserved for acknowledgment frames. Application telegrams
/// must use kinds 1..=255.
pub const ACK_KIND: u8 = 0;

/// Maximum payload size in bytes for a single telegram.
pub const MAX_PAYLOAD_LEN: usize = 15;

/// An application-level message carried over the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Telegram {
    /// Telegram kind (0 is reserved for ACKs).
    pub kind: u8,
    /// Raw payload bytes, at most [`MAX_PAYLOAD_LEN`].
    pub payload: Vec<u8>,
}

impl Telegram {
    pub fn new(kind: u8, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }
}
