//! Outbound frame construction.

use super::{MAX_PAYLOAD, SYNC_FLAG};
use crate::error::{Error, Result};

/// Framing bytes around the payload: two sync flags, topic, size, checksum.
pub const FRAME_OVERHEAD: usize = 7;

/// Sum-to-255 checksum over the topic/size header and payload bytes.
///
/// Returns the byte that makes the covered total congruent to 255 mod 256,
/// so the receiver can accumulate everything including the trailing
/// checksum byte and accept iff the sum lands on 255.
#[inline]
pub fn checksum(data: &[u8]) -> u8 {
    let sum = data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    255u8.wrapping_sub(sum)
}

/// Reusable outbound frame buffer with the sync flags pre-filled.
///
/// Create once, reuse for every send - no allocation on the hot path.
pub struct FrameBuffer {
    data: [u8; MAX_PAYLOAD + FRAME_OVERHEAD],
    len: usize,
}

impl FrameBuffer {
    pub const fn new() -> Self {
        let mut data = [0u8; MAX_PAYLOAD + FRAME_OVERHEAD];
        data[0] = SYNC_FLAG;
        data[1] = SYNC_FLAG;
        Self { data, len: 0 }
    }

    /// Frame `payload` under `topic_id`, computing the trailing checksum.
    ///
    /// Fails with [`Error::PayloadTooLarge`] when the payload exceeds
    /// [`MAX_PAYLOAD`].
    pub fn set_frame(&mut self, topic_id: u16, payload: &[u8]) -> Result<()> {
        if payload.len() > MAX_PAYLOAD {
            return Err(Error::PayloadTooLarge {
                len: payload.len(),
                max: MAX_PAYLOAD,
            });
        }

        self.data[2..4].copy_from_slice(&topic_id.to_le_bytes());
        self.data[4..6].copy_from_slice(&(payload.len() as u16).to_le_bytes());
        self.data[6..6 + payload.len()].copy_from_slice(payload);
        self.data[6 + payload.len()] = checksum(&self.data[2..6 + payload.len()]);
        self.len = payload.len() + FRAME_OVERHEAD;

        Ok(())
    }

    /// Frame bytes for sending.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_complements_to_255() {
        assert_eq!(checksum(&[]), 0xFF);
        assert_eq!(checksum(&[0x01, 0x02]), 0xFC);

        let data = [0x7D, 0x00, 0x03, 0x00, 0x01, 0x02, 0x03];
        let ck = checksum(&data);
        let total: u32 = data.iter().map(|&b| b as u32).sum::<u32>() + ck as u32;
        assert_eq!(total % 256, 255);
    }

    #[test]
    fn empty_negotiation_frame() {
        let mut frame = FrameBuffer::new();
        frame.set_frame(0, &[]).unwrap();

        // Zero header sums to zero, so the checksum byte is 0xFF.
        assert_eq!(frame.as_bytes(), &[0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, 0xFF]);
    }

    #[test]
    fn frame_layout_is_little_endian() {
        let mut frame = FrameBuffer::new();
        frame.set_frame(0x0201, &[0xAB]).unwrap();

        let bytes = frame.as_bytes();
        assert_eq!(&bytes[..2], &[0xFF, 0xFF]);
        assert_eq!(&bytes[2..4], &[0x01, 0x02]); // topic LE
        assert_eq!(&bytes[4..6], &[0x01, 0x00]); // size LE
        assert_eq!(bytes[6], 0xAB);
        assert_eq!(bytes[7], checksum(&bytes[2..7]));
    }

    #[test]
    fn oversize_payload_is_rejected() {
        let mut frame = FrameBuffer::new();
        let payload = [0u8; MAX_PAYLOAD + 1];
        assert!(matches!(
            frame.set_frame(5, &payload),
            Err(Error::PayloadTooLarge { len, max }) if len == MAX_PAYLOAD + 1 && max == MAX_PAYLOAD
        ));
    }

    #[test]
    fn max_payload_fits() {
        let mut frame = FrameBuffer::new();
        let payload = [0x55u8; MAX_PAYLOAD];
        frame.set_frame(200, &payload).unwrap();
        assert_eq!(frame.as_bytes().len(), MAX_PAYLOAD + FRAME_OVERHEAD);
    }

    #[test]
    fn buffer_reuse_shrinks_frame() {
        let mut frame = FrameBuffer::new();
        frame.set_frame(100, &[1, 2, 3, 4]).unwrap();
        assert_eq!(frame.as_bytes().len(), 11);

        frame.set_frame(100, &[9]).unwrap();
        assert_eq!(frame.as_bytes().len(), 8);
        assert_eq!(frame.as_bytes()[6], 9);
    }
}
