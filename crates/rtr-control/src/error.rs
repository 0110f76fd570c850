//! Error types for the controller

use thiserror::Error;

/// Errors that can occur while setting up the controller
///
/// Protocol-level anomalies (NAK, timeout, checksum mismatch) never show
/// up here: command exchanges resolve to plain success/failure values,
/// and snapshot write failures are logged where they occur. Only
/// transport setup faults are surfaced as errors.
#[derive(Debug, Error)]
pub enum ControlError {
    /// Serial device could not be opened
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),
}
