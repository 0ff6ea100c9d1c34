//! Framing: `!` start marker, hex kind and message ID, raw payload,
//! CRC16 trailer, `\n` terminator.

use crc::{Crc, CRC_16_IBM_3740};

use crate::telegram::{ACK_KIND, MAX_PAYLOAD_LEN};

/// First byte of every frame.
pub const START_MARKER: u8 = b'!';

/// Line terminator ending every frame, ACKs included.
pub const TERMINATOR: u8 = b'\n';

/// Frame bytes beyond the payload: marker + 2 hex kind + 2 hex message ID
/// + 4 hex checksum + terminator.
pub const FRAME_OVERHEAD: usize = 10;

// Shortest well-formed line once the terminator is stripped (empty payload).
const MIN_LINE_LEN: usize = 9;

// CRC-16/CCITT-FALSE: poly 0x1021, init 0xFFFF.
const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

/// Checksum over a frame's kind/message-ID/payload span.
pub fn crc16(span: &[u8]) -> u16 {
    CRC16.checksum(span)
}

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

fn push_hex_u8(out: &mut Vec<u8>, value: u8) {
    out.push(HEX_DIGITS[usize::from(value >> 4)]);
    out.push(HEX_DIGITS[usize::from(value & 0x0F)]);
}

fn push_hex_u16(out: &mut Vec<u8>, value: u16) {
    push_hex_u8(out, (value >> 8) as u8);
    push_hex_u8(out, (value & 0xFF) as u8);
}

fn hex_val(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        _ => None,
    }
}

fn parse_hex_u8(digits: &[u8]) -> Option<u8> {
    Some(hex_val(digits[0])? << 4 | hex_val(digits[1])?)
}

fn parse_hex_u16(digits: &[u8]) -> Option<u16> {
    let hi = parse_hex_u8(&digits[0..2])?;
    let lo = parse_hex_u8(&digits[2..4])?;
    Some(u16::from(hi) << 8 | u16::from(lo))
}

/// Encode a telegram into a single wire frame. Deterministic; always ends in
/// the terminator. Payload size is the caller's contract (checked at the
/// `send()` boundary).
pub fn encode_frame(kind: u8, message_id: u8, payload: &[u8]) -> Vec<u8> {
    debug_assert!(payload.len() <= MAX_PAYLOAD_LEN);
    let mut out = Vec::with_capacity(payload.len() + FRAME_OVERHEAD);
    out.push(START_MARKER);
    push_hex_u8(&mut out, kind);
    push_hex_u8(&mut out, message_id);
    out.extend_from_slice(payload);
    let checksum = crc16(&out[1..]);
    push_hex_u16(&mut out, checksum);
    out.push(TERMINATOR);
    out
}

/// A validated inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    pub kind: u8,
    pub message_id: u8,
    pub payload: Vec<u8>,
}

impl DecodedFrame {
    /// Whether this frame is an acknowledgment rather than an application
    /// telegram.
    pub fn is_ack(&self) -> bool {
        self.kind == ACK_KIND
    }
}

/// Error decoding a received line. The link layer discards these silently;
/// they are surfaced for diagnostics and tests.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FrameDecodeError {
    #[error("line does not start with the frame marker")]
    MissingStartMarker,
    #[error("line too short for a frame: {0} bytes")]
    TooShort(usize),
    #[error("non-hex digit in ID or checksum field")]
    BadHexDigit,
    #[error("payload exceeds {max} bytes: {0}", max = MAX_PAYLOAD_LEN)]
    PayloadTooLong(usize),
    #[error("checksum mismatch: frame says {received:04X}, computed {computed:04X}")]
    ChecksumMismatch { received: u16, computed: u16 },
}

/// Decode and validate one received line (terminator already stripped by the
/// transport; a trailing one is tolerated).
pub fn decode_frame(line: &[u8]) -> Result<DecodedFrame, FrameDecodeError> {
    let line = match line.split_last() {
        Some((&TERMINATOR, rest)) => rest,
        _ => line,
    };
    if line.first() != Some(&START_MARKER) {
        return Err(FrameDecodeError::MissingStartMarker);
    }
    if line.len() < MIN_LINE_LEN {
        return Err(FrameDecodeError::TooShort(line.len()));
    }
    let payload_len = line.len() - MIN_LINE_LEN;
    if payload_len > MAX_PAYLOAD_LEN {
        return Err(FrameDecodeError::PayloadTooLong(payload_len));
    }
    let kind = parse_hex_u8(&line[1..3]).ok_or(FrameDecodeError::BadHexDigit)?;
    let message_id = parse_hex_u8(&line[3..5]).ok_or(FrameDecodeError::BadHexDigit)?;
    let crc_start = line.len() - 4;
    let received = parse_hex_u16(&line[crc_start..]).ok_or(FrameDecodeError::BadHexDigit)?;
    let computed = crc16(&line[1..crc_start]);
    if received != computed {
        return Err(FrameDecodeError::ChecksumMismatch { received, computed });
    }
    Ok(DecodedFrame {
        kind,
        message_id,
        payload: line[5..crc_start].to_vec(),
    })
}
