//! Downstream switch wire format and TCP forwarding
//!
//! The downstream switch speaks a small binary protocol over TCP:
//!
//! ```text
//! 10 02 | 02 00 00 <target-1> <source-1> 05 <ck> | 10 03
//! ```
//!
//! where `ck` is the two's complement of the sum of the preceding body
//! bytes, modulo 256, and both ids are sent zero-based.
//!
//! Each forwarded command opens a fresh connection; there is no pooling.
//! A response timeout is not a failure: the switch often stays silent,
//! so a quiet 2 seconds yields a "no data" sentinel.

use std::io;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Two-byte start marker of the downstream protocol
pub const FRAME_START: [u8; 2] = [0x10, 0x02];
/// Two-byte end marker of the downstream protocol
pub const FRAME_END: [u8; 2] = [0x10, 0x03];

/// Default overall response timeout per forwarded command
pub const DEFAULT_FORWARD_TIMEOUT: Duration = Duration::from_secs(2);

const RESPONSE_BUFFER_SIZE: usize = 4096;

/// Encode one switch command for the downstream protocol
///
/// Ids are 1-based on our side and 0-based on the wire.
pub fn encode_switch_frame(target_id: u8, source_id: u8) -> Vec<u8> {
    let mut body = vec![
        0x02,
        0x00,
        0x00,
        target_id.wrapping_sub(1),
        source_id.wrapping_sub(1),
        0x05,
    ];
    let sum = body.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    body.push(sum.wrapping_neg());

    let mut frame = Vec::with_capacity(FRAME_START.len() + body.len() + FRAME_END.len());
    frame.extend_from_slice(&FRAME_START);
    frame.extend_from_slice(&body);
    frame.extend_from_slice(&FRAME_END);
    frame
}

/// Forward one switch command over a fresh TCP connection
///
/// Returns the raw response payload, or `None` when the switch did not
/// answer (or accept the connection) within the timeout. Connection and
/// write faults are real errors and propagate to the caller.
pub async fn forward_switch_command(
    addr: &str,
    target_id: u8,
    source_id: u8,
    response_timeout: Duration,
) -> io::Result<Option<Vec<u8>>> {
    let frame = encode_switch_frame(target_id, source_id);
    debug!("forwarding to {}: {:02X?}", addr, frame);

    let mut stream = match timeout(response_timeout, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => return Err(e),
        Err(_) => {
            debug!("downstream {} did not accept within {:?}", addr, response_timeout);
            return Ok(None);
        }
    };

    stream.write_all(&frame).await?;

    let mut buf = vec![0u8; RESPONSE_BUFFER_SIZE];
    match timeout(response_timeout, stream.read(&mut buf)).await {
        Ok(Ok(n)) => {
            buf.truncate(n);
            debug!("downstream response: {:02X?}", buf);
            Ok(Some(buf))
        }
        Ok(Err(e)) => Err(e),
        Err(_) => {
            debug!("no data from {} within {:?}", addr, response_timeout);
            Ok(None)
        }
    }
}
