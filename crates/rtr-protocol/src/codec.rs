//! Streaming frame parser
//!
//! Accumulates raw serial bytes and yields complete, checksum-valid
//! frames. Bytes before the next STX and frames that fail validation are
//! silently dropped, matching the router's tolerance policy: a corrupted
//! inbound frame gets no reply at all.

use crate::error::ParseError;
use crate::frame::{Frame, FRAME_LEN};

/// Upper bound on buffered bytes before old data is discarded
const MAX_BUFFER_LEN: usize = FRAME_LEN * 8;

/// Streaming codec that extracts frames from a byte stream
pub struct FrameCodec {
    buffer: Vec<u8>,
}

impl FrameCodec {
    /// Create an empty codec
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(FRAME_LEN * 2),
        }
    }

    /// Push raw bytes into the codec's buffer
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);

        // Prevent unbounded growth on a noisy line
        if self.buffer.len() > MAX_BUFFER_LEN {
            let start = self.buffer.len() - FRAME_LEN;
            self.buffer.drain(..start);
        }
    }

    /// Try to extract the next complete, valid frame from the buffer
    pub fn next_frame(&mut self) -> Option<Frame> {
        loop {
            // Discard anything before the next start marker
            let stx = self
                .buffer
                .iter()
                .position(|&b| b == crate::control::STX)?;
            if stx > 0 {
                tracing::debug!("discarding {} bytes before STX", stx);
                self.buffer.drain(..stx);
            }

            if self.buffer.len() < FRAME_LEN {
                return None;
            }

            match Frame::parse(&self.buffer[..FRAME_LEN]) {
                Ok(frame) => {
                    self.buffer.drain(..FRAME_LEN);
                    return Some(frame);
                }
                Err(ParseError::Incomplete { .. }) => return None,
                Err(e) => {
                    tracing::debug!("dropping invalid frame: {}", e);
                    self.buffer.drain(..FRAME_LEN);
                }
            }
        }
    }

    /// Clear the internal buffer
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}
