//! Router impersonation worker
//!
//! [`ProtocolBridge`] plays the router's role on a serial channel: it
//! validates inbound frames, answers the handshake, and forwards
//! translated crosspoint-set commands to the downstream switch over TCP.
//!
//! The receive loop runs as one worker task per bridge instance and
//! observes a shutdown command once per loop iteration; an in-flight TCP
//! forward completes before shutdown is noticed.
//!
//! A bridge with no downstream endpoint is a plain responder: it acks
//! valid commands without translating or forwarding, which is the peer
//! the controller's end-to-end tests talk to. `ng_mode` makes every
//! command fail with NAK for negative-path testing.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use rtr_protocol::control::{ACK, NAK};
use rtr_protocol::{classify, ChannelId, Frame, FrameCodec};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{broadcast, mpsc};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info, trace, warn};

use crate::error::BridgeError;
use crate::forward::{forward_switch_command, DEFAULT_FORWARD_TIMEOUT};
use crate::table::TranslationTable;

/// Commands that can be sent to a running bridge
#[derive(Debug, Clone)]
pub enum BridgeCommand {
    /// Stop the receive loop
    Shutdown,
}

/// Events emitted as the bridge handles inbound frames
///
/// This is the bridge's only observable state; subscribers (tests, a
/// status UI) watch the stream instead of sharing flags with the worker.
#[derive(Debug, Clone)]
pub enum BridgeEvent {
    /// A set command was accepted and acked
    SetApplied {
        /// Destination channel from the inbound frame
        destination: ChannelId,
        /// Source channel from the inbound frame
        source: ChannelId,
        /// Raw downstream response, if a forward happened and data came back
        response: Option<Vec<u8>>,
    },
    /// A set command named a source with no translation entry (answered NAK)
    UnknownSource {
        /// The unmapped source channel
        source: ChannelId,
    },
    /// Forwarding failed at the transport level (answered NAK)
    ForwardFailed {
        /// The source channel that was being forwarded
        source: ChannelId,
    },
    /// A query was answered with ACK and a status frame
    QueryAnswered {
        /// Destination channel from the inbound frame
        destination: ChannelId,
    },
    /// A command was rejected because failure simulation is enabled
    Rejected,
}

/// Bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Downstream switch endpoint; `None` makes the bridge a plain responder
    pub downstream: Option<String>,
    /// Downstream target (destination) id, 1-based
    pub target_id: u8,
    /// Source reported in every canned status reply
    pub canned_source: ChannelId,
    /// Failure-simulation mode: answer everything with NAK, forward nothing
    pub ng_mode: bool,
    /// Overall response timeout per forwarded command
    pub forward_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            downstream: None,
            target_id: 12,
            canned_source: ChannelId::new("123").expect("valid channel"),
            ng_mode: false,
            forward_timeout: DEFAULT_FORWARD_TIMEOUT,
        }
    }
}

/// Impersonates the router for the downstream switch vendor's protocol
pub struct ProtocolBridge<S> {
    io: S,
    config: BridgeConfig,
    table: Arc<TranslationTable>,
    events: broadcast::Sender<BridgeEvent>,
}

impl ProtocolBridge<SerialStream> {
    /// Open the serial device and create a bridge over it
    pub fn connect(
        port: &str,
        baud_rate: u32,
        config: BridgeConfig,
        table: Arc<TranslationTable>,
        events: broadcast::Sender<BridgeEvent>,
    ) -> Result<Self, BridgeError> {
        let stream = tokio_serial::new(port, baud_rate).open_native_async()?;
        info!("opened bridge serial port {} at {} baud", port, baud_rate);
        Ok(Self::new(stream, config, table, events))
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> ProtocolBridge<S> {
    /// Create a bridge over an already-open transport
    pub fn new(
        io: S,
        config: BridgeConfig,
        table: Arc<TranslationTable>,
        events: broadcast::Sender<BridgeEvent>,
    ) -> Self {
        Self {
            io,
            config,
            table,
            events,
        }
    }

    /// Run the receive loop until shutdown or stream close
    ///
    /// Drains inbound bytes, parses complete frames and dispatches them.
    /// Structurally invalid frames and unknown command codes get no reply.
    pub async fn run(mut self, mut commands: mpsc::Receiver<BridgeCommand>) -> io::Result<()> {
        let mut codec = FrameCodec::new();
        let mut buf = [0u8; 1024];

        info!(
            "bridge running (ng_mode={}, downstream={:?})",
            self.config.ng_mode, self.config.downstream
        );

        loop {
            tokio::select! {
                result = self.io.read(&mut buf) => {
                    match result {
                        Ok(0) => {
                            debug!("serial stream closed");
                            break;
                        }
                        Ok(n) => {
                            debug!("received {} bytes: {:02X?}", n, &buf[..n]);
                            codec.push_bytes(&buf[..n]);
                            while let Some(frame) = codec.next_frame() {
                                self.dispatch(frame).await?;
                            }
                        }
                        Err(e) => {
                            warn!("serial read error: {}", e);
                            return Err(e);
                        }
                    }
                }

                cmd = commands.recv() => {
                    match cmd {
                        Some(BridgeCommand::Shutdown) | None => {
                            info!("shutdown requested");
                            break;
                        }
                    }
                }
            }
        }

        info!("bridge stopped");
        Ok(())
    }

    async fn dispatch(&mut self, frame: Frame) -> io::Result<()> {
        match frame.command_code() {
            "03" => self.handle_set(frame).await,
            "10" => self.handle_query(frame).await,
            other => {
                debug!("dropping frame with unknown command {:?}", other);
                Ok(())
            }
        }
    }

    async fn handle_set(&mut self, frame: Frame) -> io::Result<()> {
        let destination = frame.destination();
        let source = frame.source();
        debug!("crosspoint set request: {} <- {}", destination, source);

        if self.config.ng_mode {
            let _ = self.events.send(BridgeEvent::Rejected);
            return self.reply(NAK).await;
        }

        let Some(addr) = self.config.downstream.clone() else {
            // Plain responder: accept without translating or forwarding
            let _ = self.events.send(BridgeEvent::SetApplied {
                destination,
                source,
                response: None,
            });
            return self.reply(ACK).await;
        };

        let Some(mapped) = self.table.lookup(&source) else {
            warn!("no translation entry for source {}", source);
            let _ = self.events.send(BridgeEvent::UnknownSource { source });
            return self.reply(NAK).await;
        };

        debug!("in:{}, send:{}", source, mapped);
        match forward_switch_command(
            &addr,
            self.config.target_id,
            mapped,
            self.config.forward_timeout,
        )
        .await
        {
            Ok(response) => {
                let _ = self.events.send(BridgeEvent::SetApplied {
                    destination,
                    source,
                    response,
                });
                self.reply(ACK).await
            }
            Err(e) => {
                warn!("forward to {} failed: {}", addr, e);
                let _ = self.events.send(BridgeEvent::ForwardFailed { source });
                self.reply(NAK).await
            }
        }
    }

    async fn handle_query(&mut self, frame: Frame) -> io::Result<()> {
        let destination = frame.destination();
        debug!("crosspoint status query: {}", destination);

        if self.config.ng_mode {
            let _ = self.events.send(BridgeEvent::Rejected);
            return self.reply(NAK).await;
        }

        self.reply(ACK).await?;

        let status = Frame::status(&destination, &self.config.canned_source);
        self.io.write_all(status.as_bytes()).await?;
        self.io.flush().await?;
        let _ = self.events.send(BridgeEvent::QueryAnswered { destination });
        Ok(())
    }

    async fn reply(&mut self, byte: u8) -> io::Result<()> {
        trace!(">{}", classify(byte));
        self.io.write_all(&[byte]).await?;
        self.io.flush().await
    }
}
