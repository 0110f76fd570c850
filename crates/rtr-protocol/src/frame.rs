//! Frame construction, validation and the BBC checksum
//!
//! A frame is `STX + body + checksum` where the body is 14 bytes of
//! fixed-width ASCII fields terminated by ETX. The checksum is the XOR
//! fold of every body byte (ETX included).

use crate::channel::ChannelId;
use crate::control::{ETX, STX};
use crate::error::ParseError;

/// Total frame length on the wire: STX + 14-byte body + checksum
pub const FRAME_LEN: usize = 16;

/// Body length: cmd(2) + flag(1) + "00" + "00" + dest(3) + source(3) + ETX
const BODY_LEN: usize = 14;

// Field offsets within the full frame
const CMD_RANGE: std::ops::Range<usize> = 1..3;
const FLAG_POS: usize = 3;
const FILLER_RANGE: std::ops::Range<usize> = 4..8;
const DEST_RANGE: std::ops::Range<usize> = 8..11;
const SOURCE_RANGE: std::ops::Range<usize> = 11..14;
const ETX_POS: usize = 14;

/// XOR fold over the body bytes (the "BBC" checksum)
pub fn checksum(body: &[u8]) -> u8 {
    body.iter().fold(0u8, |acc, b| acc ^ b)
}

/// What a parsed frame means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Crosspoint set request: cmd `03`, flag `0`
    Set,
    /// Crosspoint status query: cmd `10`, flag `0`
    Query,
    /// Status response: cmd `10`, flag `1`
    Status,
    /// Structurally valid frame with an unrecognized command code
    Other,
}

/// An immutable, validated protocol frame
///
/// Constructed either from the typed builders ([`Frame::set`],
/// [`Frame::query`], [`Frame::status`]) or by validating received bytes
/// with [`Frame::parse`]. Built per exchange and discarded after send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: [u8; FRAME_LEN],
}

impl Frame {
    fn build(cmd: &[u8; 2], flag: u8, dest: &ChannelId, source: &[u8; 3]) -> Self {
        let mut bytes = [0u8; FRAME_LEN];
        bytes[0] = STX;
        bytes[CMD_RANGE].copy_from_slice(cmd);
        bytes[FLAG_POS] = flag;
        bytes[FILLER_RANGE].copy_from_slice(b"0000");
        bytes[DEST_RANGE].copy_from_slice(dest.as_bytes());
        bytes[SOURCE_RANGE].copy_from_slice(source);
        bytes[ETX_POS] = ETX;
        bytes[FRAME_LEN - 1] = checksum(&bytes[1..FRAME_LEN - 1]);
        Self { bytes }
    }

    /// Build a crosspoint-set request frame
    pub fn set(dest: &ChannelId, source: &ChannelId) -> Self {
        Self::build(b"03", b'0', dest, source.as_bytes())
    }

    /// Build a status-query request frame (source field padded with "000")
    pub fn query(dest: &ChannelId) -> Self {
        Self::build(b"10", b'0', dest, b"000")
    }

    /// Build a status response frame reporting the routed source
    pub fn status(dest: &ChannelId, source: &ChannelId) -> Self {
        Self::build(b"10", b'1', dest, source.as_bytes())
    }

    /// Validate received bytes as a complete frame
    ///
    /// Checks the start marker, the ETX position, the constant filler
    /// field, the trailing checksum and that both channel fields are
    /// ASCII digits.
    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        if bytes.len() < FRAME_LEN {
            return Err(ParseError::Incomplete {
                needed: FRAME_LEN - bytes.len(),
            });
        }
        if bytes.len() > FRAME_LEN {
            return Err(ParseError::InvalidFrame(format!(
                "expected {} bytes, got {}",
                FRAME_LEN,
                bytes.len()
            )));
        }
        if bytes[0] != STX {
            return Err(ParseError::InvalidFrame(format!(
                "frame does not start with STX (got 0x{:02X})",
                bytes[0]
            )));
        }
        if bytes[ETX_POS] != ETX {
            return Err(ParseError::InvalidFrame(format!(
                "missing ETX at end of body (got 0x{:02X})",
                bytes[ETX_POS]
            )));
        }
        if &bytes[FILLER_RANGE] != b"0000" {
            return Err(ParseError::InvalidFrame(format!(
                "unexpected filler field {:?}",
                String::from_utf8_lossy(&bytes[FILLER_RANGE])
            )));
        }

        let expected = checksum(&bytes[1..FRAME_LEN - 1]);
        let actual = bytes[FRAME_LEN - 1];
        if expected != actual {
            return Err(ParseError::ChecksumMismatch { expected, actual });
        }

        ChannelId::from_bytes(&bytes[DEST_RANGE])?;
        ChannelId::from_bytes(&bytes[SOURCE_RANGE])?;

        let mut owned = [0u8; FRAME_LEN];
        owned.copy_from_slice(bytes);
        Ok(Self { bytes: owned })
    }

    /// The full wire representation, STX and checksum included
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The checksummed body (everything between STX and the checksum byte)
    pub fn body(&self) -> &[u8] {
        &self.bytes[1..FRAME_LEN - 1]
    }

    /// The trailing checksum byte
    pub fn checksum_byte(&self) -> u8 {
        self.bytes[FRAME_LEN - 1]
    }

    /// The two-character command code ("03" or "10")
    pub fn command_code(&self) -> &str {
        std::str::from_utf8(&self.bytes[CMD_RANGE]).unwrap_or("??")
    }

    /// What this frame means, from command code and direction flag
    pub fn kind(&self) -> FrameKind {
        match (&self.bytes[CMD_RANGE], self.bytes[FLAG_POS]) {
            (b"03", b'0') => FrameKind::Set,
            (b"10", b'0') => FrameKind::Query,
            (b"10", b'1') => FrameKind::Status,
            _ => FrameKind::Other,
        }
    }

    /// The destination channel field
    pub fn destination(&self) -> ChannelId {
        // Invariant: validated during construction/parse
        ChannelId::from_bytes(&self.bytes[DEST_RANGE]).expect("destination validated")
    }

    /// The source channel field ("000" padding in query frames)
    pub fn source(&self) -> ChannelId {
        ChannelId::from_bytes(&self.bytes[SOURCE_RANGE]).expect("source validated")
    }
}
