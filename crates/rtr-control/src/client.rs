//! Router command client
//!
//! Sends crosspoint-set and status-query frames over a serial channel and
//! runs the ACK/NAK + response state machine. A command exchange is
//! `Sent -> AwaitAck -> (AwaitStatus) -> Done | Failed`; there is no retry,
//! a single failed attempt is terminal for that call.
//!
//! Protocol anomalies (NAK, timeout, checksum mismatch) resolve to `false`
//! rather than errors; only opening the serial device can fail with an
//! error. One client instance owns its transport exclusively; calls must
//! not be interleaved from multiple tasks.
//!
//! Leftover bytes from an aborted prior exchange are not drained: each
//! call reads the transport as-is, matching the device's documented
//! behavior.

use std::time::Duration;

use rtr_protocol::{classify, control, ChannelId, ControlByte, Frame, FrameKind, WireByte, FRAME_LEN};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{timeout_at, Instant};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info, trace, warn};

use crate::error::ControlError;
use crate::tally::{ContactInput, SnapshotStore, TallyMonitor};

/// Default wall-clock deadline for each command exchange
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default serial line settings of the router (9600 8N1)
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Outcome of a tally-driven set attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlResult {
    /// False only when a wire command was attempted and failed
    pub acknowledged: bool,
    /// Whether a real tally transition was detected
    pub changed: bool,
}

/// Client side of the router control protocol
///
/// Generic over the transport so tests can run over `tokio::io::duplex`;
/// production uses the [`RouterClient::connect`] serial constructor.
pub struct RouterClient<T> {
    io: T,
    timeout: Duration,
}

impl RouterClient<SerialStream> {
    /// Open the serial device and create a client over it
    pub fn connect(port: &str, baud_rate: u32) -> Result<Self, ControlError> {
        let stream = tokio_serial::new(port, baud_rate).open_native_async()?;
        info!("opened router serial port {} at {} baud", port, baud_rate);
        Ok(Self::new(stream))
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin> RouterClient<T> {
    /// Create a client over an already-open transport
    pub fn new(io: T) -> Self {
        Self {
            io,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create a client with a custom exchange deadline
    pub fn with_timeout(io: T, timeout: Duration) -> Self {
        Self { io, timeout }
    }

    /// Send a crosspoint-set command and wait for the single ACK byte
    ///
    /// Returns true only when the router answers ACK within the deadline.
    /// NAK, any other byte, or silence all report failure.
    pub async fn set_crosspoint(&mut self, dest: &ChannelId, source: &ChannelId) -> bool {
        let frame = Frame::set(dest, source);
        debug!("crosspoint set: {} <- {}", dest, source);

        if !self.send_frame(&frame).await {
            return false;
        }
        let deadline = Instant::now() + self.timeout;
        self.await_ack(deadline).await
    }

    /// Query the routed source for a destination and validate the reply
    ///
    /// After the ACK, a full status frame must arrive within the same
    /// deadline window. Success requires a valid checksum and a matching
    /// status header; the parsed channels are logged, not returned.
    pub async fn get_crosspoint(&mut self, dest: &ChannelId) -> bool {
        let frame = Frame::query(dest);
        debug!("crosspoint query: {}", dest);

        if !self.send_frame(&frame).await {
            return false;
        }
        let deadline = Instant::now() + self.timeout;
        if !self.await_ack(deadline).await {
            return false;
        }

        self.await_status(deadline).await
    }

    /// Apply the debounced tally selection to a destination
    ///
    /// Issues a set command only when the monitor reports a real
    /// transition. No transition is still `acknowledged = true`.
    pub async fn set_by_selection<C, S>(
        &mut self,
        monitor: &TallyMonitor<C, S>,
        dest: &ChannelId,
    ) -> ControlResult
    where
        C: ContactInput,
        S: SnapshotStore,
    {
        if !monitor.status_check() {
            debug!("tally state unchanged, no command issued");
            return ControlResult {
                acknowledged: true,
                changed: false,
            };
        }

        let source = monitor.current_selection();
        info!("tally changed, switching {} to source {}", dest, source);
        ControlResult {
            acknowledged: self.set_crosspoint(dest, &source).await,
            changed: true,
        }
    }

    async fn send_frame(&mut self, frame: &Frame) -> bool {
        for &byte in frame.as_bytes() {
            trace!(">{}", classify(byte));
        }
        if let Err(e) = self.io.write_all(frame.as_bytes()).await {
            warn!("frame write failed: {}", e);
            return false;
        }
        if let Err(e) = self.io.flush().await {
            warn!("frame flush failed: {}", e);
            return false;
        }
        true
    }

    async fn await_ack(&mut self, deadline: Instant) -> bool {
        match timeout_at(deadline, self.io.read_u8()).await {
            Ok(Ok(byte)) => match classify(byte) {
                WireByte::Control(ControlByte::Ack) => {
                    trace!("<ACK");
                    true
                }
                other => {
                    warn!("expected ACK, got {}", other);
                    false
                }
            },
            Ok(Err(e)) => {
                warn!("read failed while waiting for ACK: {}", e);
                false
            }
            Err(_) => {
                warn!("timed out waiting for ACK");
                false
            }
        }
    }

    async fn await_status(&mut self, deadline: Instant) -> bool {
        let mut buf = [0u8; FRAME_LEN];

        // The first response byte must be the start marker
        match timeout_at(deadline, self.io.read_u8()).await {
            Ok(Ok(byte)) if byte == control::STX => {
                trace!("<STX");
                buf[0] = byte;
            }
            Ok(Ok(byte)) => {
                warn!("expected STX, got {}", classify(byte));
                return false;
            }
            Ok(Err(e)) => {
                warn!("read failed while waiting for status frame: {}", e);
                return false;
            }
            Err(_) => {
                warn!("timed out waiting for status frame");
                return false;
            }
        }

        match timeout_at(deadline, self.io.read_exact(&mut buf[1..])).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                warn!("read failed mid status frame: {}", e);
                return false;
            }
            Err(_) => {
                warn!("timed out mid status frame");
                return false;
            }
        }

        match Frame::parse(&buf) {
            Ok(status) if status.kind() == FrameKind::Status => {
                info!(
                    "output channel is {}, input channel is {}",
                    status.destination(),
                    status.source()
                );
                true
            }
            Ok(status) => {
                warn!("unexpected frame in status position: {:?}", status.kind());
                false
            }
            Err(e) => {
                warn!("invalid status frame: {}", e);
                false
            }
        }
    }
}
