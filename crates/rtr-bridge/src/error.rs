//! Error types for the bridge

use thiserror::Error;

/// Errors that can occur while setting up the bridge
///
/// Protocol anomalies on the serial side never surface here: invalid
/// inbound frames are dropped and rejected commands are answered with NAK.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Serial device could not be opened
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// Translation table file could not be read
    #[error("table I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Translation table file could not be parsed
    #[error("table parse error: {0}")]
    Table(#[from] serde_json::Error),
}
