//! Reliable telegram delivery over an unreliable serial link.
//! Host-driven: no internal timers or threads; the host calls `poll()` from
//! its own loop and receives events back.

pub mod frame;
pub mod link;
pub mod queue;
pub mod telegram;
pub mod tracker;

pub use frame::{decode_frame, encode_frame, DecodedFrame, FrameDecodeError};
pub use link::{
    Clock, DeliveryStatus, LinkConfig, LinkEvent, ReadError, SendError, SerialLink, Transport,
};
pub use telegram::{Telegram, ACK_KIND, MAX_PAYLOAD_LEN};
