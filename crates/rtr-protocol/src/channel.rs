//! Channel identifiers
//!
//! The router addresses matrix sources and destinations with 3-digit
//! ASCII ids ("024", "127", ...). Ids are compared as text for protocol
//! fidelity; the numeric view exists only for translation-table lookups.

use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// A 3-digit channel id addressing a matrix source or destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId([u8; 3]);

impl ChannelId {
    /// Create a channel id from a 3-digit ASCII string
    pub fn new(s: &str) -> Result<Self, ParseError> {
        Self::from_bytes(s.as_bytes())
    }

    /// Create a channel id from 3 ASCII digit bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ParseError> {
        if bytes.len() != 3 || !bytes.iter().all(|b| b.is_ascii_digit()) {
            return Err(ParseError::InvalidChannel(
                String::from_utf8_lossy(bytes).into_owned(),
            ));
        }
        Ok(Self([bytes[0], bytes[1], bytes[2]]))
    }

    /// The id as an ASCII string slice
    pub fn as_str(&self) -> &str {
        // Invariant: only ASCII digits are stored
        std::str::from_utf8(&self.0).expect("channel id is ASCII")
    }

    /// The id as raw wire bytes
    pub fn as_bytes(&self) -> &[u8; 3] {
        &self.0
    }

    /// Numeric view, used for translation-table lookups
    pub fn as_number(&self) -> u16 {
        self.0
            .iter()
            .fold(0u16, |acc, b| acc * 10 + u16::from(b - b'0'))
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ChannelId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for ChannelId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        ChannelId::new(&s).map_err(serde::de::Error::custom)
    }
}
