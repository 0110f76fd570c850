//! Reserved control bytes of the router serial protocol
//!
//! Six byte values are reserved for framing and handshaking. Everything
//! else on the wire is payload data. [`classify`] maps a received byte to
//! its symbolic name for logging and comparison.

use std::fmt;

/// Start-of-text frame marker
pub const STX: u8 = 0x02;
/// End-of-text body terminator
pub const ETX: u8 = 0x03;
/// End-of-transmission-block marker
pub const ETB: u8 = 0x17;
/// Positive acknowledgment
pub const ACK: u8 = 0x06;
/// Negative acknowledgment
pub const NAK: u8 = 0x15;
/// End-of-transmission marker
pub const EOT: u8 = 0x04;

/// The reserved control bytes of the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ControlByte {
    /// Start of text (0x02)
    Stx,
    /// End of text (0x03)
    Etx,
    /// End of transmission block (0x17)
    Etb,
    /// Positive acknowledgment (0x06)
    Ack,
    /// Negative acknowledgment (0x15)
    Nak,
    /// End of transmission (0x04)
    Eot,
}

impl ControlByte {
    /// Returns the symbolic name used in wire logs
    pub fn name(&self) -> &'static str {
        match self {
            ControlByte::Stx => "STX",
            ControlByte::Etx => "ETX",
            ControlByte::Etb => "ETB",
            ControlByte::Ack => "ACK",
            ControlByte::Nak => "NAK",
            ControlByte::Eot => "EOT",
        }
    }

    /// Returns the wire value of this control byte
    pub fn value(&self) -> u8 {
        match self {
            ControlByte::Stx => STX,
            ControlByte::Etx => ETX,
            ControlByte::Etb => ETB,
            ControlByte::Ack => ACK,
            ControlByte::Nak => NAK,
            ControlByte::Eot => EOT,
        }
    }
}

impl TryFrom<u8> for ControlByte {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            STX => Ok(ControlByte::Stx),
            ETX => Ok(ControlByte::Etx),
            ETB => Ok(ControlByte::Etb),
            ACK => Ok(ControlByte::Ack),
            NAK => Ok(ControlByte::Nak),
            EOT => Ok(ControlByte::Eot),
            other => Err(other),
        }
    }
}

impl fmt::Display for ControlByte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A classified wire byte: either a reserved control byte or payload data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireByte {
    /// One of the six reserved control bytes
    Control(ControlByte),
    /// Any other byte, reported as itself
    Data(u8),
}

impl fmt::Display for WireByte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireByte::Control(c) => f.write_str(c.name()),
            WireByte::Data(b) if b.is_ascii_graphic() => write!(f, "'{}'", *b as char),
            WireByte::Data(b) => write!(f, "0x{:02X}", b),
        }
    }
}

/// Classify a received byte for logging and comparison
pub fn classify(byte: u8) -> WireByte {
    match ControlByte::try_from(byte) {
        Ok(control) => WireByte::Control(control),
        Err(data) => WireByte::Data(data),
    }
}
