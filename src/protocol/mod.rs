//! On-wire protocol: framing constants, frame builder, receive state
//! machine.
//!
//! Frame format: `[0xFF 0xFF] [topic u16 LE] [size u16 LE] [payload] [checksum]`
//!
//! The checksum covers the four header bytes and the payload; the byte is
//! chosen so that the covered sum plus the checksum is 255 modulo 256. The
//! two sync flags are outside the checksum domain.

mod frame;
pub use frame::{checksum, FrameBuffer, FRAME_OVERHEAD};

mod parser;
pub use parser::{Frame, FrameParser};

/// Frame sync flag; two in a row mark the start of a frame.
pub const SYNC_FLAG: u8 = 0xFF;

/// Inbound trigger for a topic announcement burst.
pub const TOPIC_NEGOTIATION: u16 = 0;
/// Outer wire topic for publisher announcements.
pub const TOPIC_PUBLISHERS: u16 = 0;
/// Outer wire topic for subscriber announcements.
pub const TOPIC_SUBSCRIBERS: u16 = 1;
/// Time sync request/response.
pub const TOPIC_TIME: u16 = 10;
/// Parameter request/response.
pub const TOPIC_PARAMETER_REQUEST: u16 = 11;
/// Log records relayed to the peer's logging sink.
pub const TOPIC_LOG: u16 = 12;

/// First dynamically assigned topic ID. Subscribers occupy
/// `DYNAMIC_ID_BASE..DYNAMIC_ID_BASE + MAX_SUBSCRIBERS`, publishers the
/// range directly above them.
pub const DYNAMIC_ID_BASE: u16 = 100;

/// Largest payload a single frame may carry; sizes all static buffers.
pub const MAX_PAYLOAD: usize = 512;
/// Publisher slot count.
pub const MAX_PUBLISHERS: usize = 25;
/// Subscriber slot count.
pub const MAX_SUBSCRIBERS: usize = 25;
/// Upper bound on bytes consumed per spin, to bound dispatch latency.
pub const MAX_BYTES_PER_SPIN: usize = 512;
/// Re-sync interval while connected.
pub const SYNC_PERIOD_MS: u64 = 5_000;
/// Connection is considered dead after this long without a completed sync.
pub const CONNECTION_TIMEOUT_MS: u64 = 15_000;
/// Write buffering for stream transports.
pub const STREAM_BUFFER: usize = 8192;

/// Saturating fault counters for the receive path. Monotonic; never reset.
///
/// Parse-layer damage is accounted here instead of surfacing as errors, so
/// a noisy link self-heals. `checksum` doubles as the unroutable-frame
/// counter; counterpart firmware reports the same layout.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ErrorCounters {
    /// Byte arrived where a sync flag was expected.
    pub state: u32,
    /// Claimed payload size exceeded [`MAX_PAYLOAD`].
    pub invalid_size: u32,
    /// Valid frame had no route (see struct docs).
    pub checksum: u32,
    /// A subscriber handler rejected its payload.
    pub malformed_message: u32,
}

impl ErrorCounters {
    pub(crate) fn note_state(&mut self) {
        self.state = self.state.saturating_add(1);
    }

    pub(crate) fn note_invalid_size(&mut self) {
        self.invalid_size = self.invalid_size.saturating_add(1);
    }

    pub(crate) fn note_checksum(&mut self) {
        self.checksum = self.checksum.saturating_add(1);
    }

    pub(crate) fn note_malformed(&mut self) {
        self.malformed_message = self.malformed_message.saturating_add(1);
    }
}
