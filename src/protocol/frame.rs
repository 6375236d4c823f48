//! Frame encoding and decoding for the coordinator bridge.
//!
//! ```text
//! ┌──────────┬──────────────┬─────────────────┐
//! │  header  │  size (LE)   │    payload      │
//! │  1 byte  │   2 bytes    │   size bytes    │
//! └──────────┴──────────────┴─────────────────┘
//! ```
//!
//! Frames written by the host use [`OUTBOUND_HEADER`]. The bridge normally
//! answers with [`INBOUND_HEADER`], but the decoder accepts any header byte.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::FrameError;

/// Header byte of host-to-bridge frames.
pub const OUTBOUND_HEADER: u8 = 0x3c;

/// Header byte of bridge-to-host frames.
pub const INBOUND_HEADER: u8 = 0x3e;

/// Maximum frame payload size (64KB - 1).
pub const MAX_FRAME_SIZE: usize = 65535;

/// Header plus 2-byte length.
pub const MIN_FRAME_SIZE: usize = 3;

/// Encodes a payload into an outbound frame.
///
/// # Errors
///
/// Returns [`FrameError::TooLarge`] if the payload does not fit the length field.
pub fn encode(payload: &[u8]) -> Result<Bytes, FrameError> {
    let len = u16::try_from(payload.len()).map_err(|_| FrameError::TooLarge {
        size: payload.len(),
        max: MAX_FRAME_SIZE,
    })?;

    let mut buf = BytesMut::with_capacity(MIN_FRAME_SIZE + payload.len());
    buf.put_u8(OUTBOUND_HEADER);
    buf.put_u16_le(len);
    buf.put_slice(payload);
    Ok(buf.freeze())
}

/// Incremental decoder for inbound frames.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: BytesMut,
}

impl FrameDecoder {
    /// Creates a new frame decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds data into the decoder.
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Attempts to decode the next complete frame.
    ///
    /// Byte 0 is taken as the header whatever its value. Returns `None`
    /// until a whole frame is buffered.
    pub fn decode(&mut self) -> Option<Bytes> {
        if self.buffer.len() < MIN_FRAME_SIZE {
            return None;
        }

        let length = usize::from(u16::from_le_bytes([self.buffer[1], self.buffer[2]]));
        if self.buffer.len() < MIN_FRAME_SIZE + length {
            return None;
        }

        self.buffer.advance(MIN_FRAME_SIZE);
        Some(self.buffer.split_to(length).freeze())
    }

    /// Returns the number of bytes currently buffered.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Clears the internal buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_simple() {
        let frame = encode(&[0x01]).unwrap();
        assert_eq!(&frame[..], &[OUTBOUND_HEADER, 0x01, 0x00, 0x01]);
    }

    #[test]
    fn test_encode_too_large() {
        let payload = vec![0u8; MAX_FRAME_SIZE + 1];
        assert!(matches!(
            encode(&payload),
            Err(FrameError::TooLarge { size, .. }) if size == MAX_FRAME_SIZE + 1
        ));
    }

    #[test]
    fn test_decode_partial_frame() {
        let mut decoder = FrameDecoder::new();
        decoder.feed(&[INBOUND_HEADER, 0x03, 0x00, 0x86]);
        assert_eq!(decoder.decode(), None);

        decoder.feed(&[0x01, 0x02]);
        assert_eq!(decoder.decode(), Some(Bytes::from_static(&[0x86, 0x01, 0x02])));
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_decode_multiple_frames() {
        let mut decoder = FrameDecoder::new();
        decoder.feed(&[
            INBOUND_HEADER, 0x01, 0x00, 0x00, // ok
            INBOUND_HEADER, 0x02, 0x00, 0x01, b'x', // error "x"
        ]);

        assert_eq!(decoder.decode(), Some(Bytes::from_static(&[0x00])));
        assert_eq!(decoder.decode(), Some(Bytes::from_static(&[0x01, b'x'])));
        assert_eq!(decoder.decode(), None);
    }

    #[test]
    fn test_decode_accepts_any_header() {
        let mut decoder = FrameDecoder::new();
        decoder.feed(&[0x7f, 0x01, 0x00, 0x00]);
        assert_eq!(decoder.decode(), Some(Bytes::from_static(&[0x00])));

        decoder.feed(&[OUTBOUND_HEADER, 0x01, 0x00, 0x94]);
        assert_eq!(decoder.decode(), Some(Bytes::from_static(&[0x94])));
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_decode_empty_payload() {
        let mut decoder = FrameDecoder::new();
        decoder.feed(&[INBOUND_HEADER, 0x00, 0x00, INBOUND_HEADER]);
        assert_eq!(decoder.decode(), Some(Bytes::new()));
        assert_eq!(decoder.decode(), None);
        assert_eq!(decoder.buffered(), 1);

        decoder.clear();
        assert_eq!(decoder.buffered(), 0);
    }
}
