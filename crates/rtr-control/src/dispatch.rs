//! Tally edge dispatch
//!
//! Binds falling-edge notifications from the tally lines to crosspoint
//! commands. The edge-notification capability (the GPIO driver in
//! production) delivers raw line numbers over an mpsc channel; the
//! dispatcher maps them to source channels, applies the monitor's
//! debounce, and only then issues a set command.
//!
//! Edges on unregistered lines are ignored without error, matching the
//! protocol's tolerance policy for spurious events. Minimum re-trigger
//! spacing is the edge capability's responsibility, not the dispatcher's.

use std::collections::HashMap;

use rtr_protocol::ChannelId;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use crate::client::{ControlResult, RouterClient};
use crate::tally::{ContactInput, SnapshotStore, TallyChannels, TallyMonitor};

/// Default BCM line number of the tally-sub contact
pub const TSUB_LINE: u8 = 2;
/// Default BCM line number of the near-sub contact
pub const NSUB_LINE: u8 = 3;

/// Build the line-number to source-channel map for the default wiring
pub fn default_line_map(channels: &TallyChannels) -> HashMap<u8, ChannelId> {
    HashMap::from([(TSUB_LINE, channels.tsub), (NSUB_LINE, channels.nsub)])
}

/// Routes tally-line edges to crosspoint commands
pub struct EventDispatcher<T, C, S> {
    client: RouterClient<T>,
    monitor: TallyMonitor<C, S>,
    destination: ChannelId,
    lines: HashMap<u8, ChannelId>,
}

impl<T, C, S> EventDispatcher<T, C, S>
where
    T: AsyncRead + AsyncWrite + Unpin,
    C: ContactInput,
    S: SnapshotStore,
{
    /// Create a dispatcher switching the given destination
    pub fn new(
        client: RouterClient<T>,
        monitor: TallyMonitor<C, S>,
        destination: ChannelId,
        lines: HashMap<u8, ChannelId>,
    ) -> Self {
        Self {
            client,
            monitor,
            destination,
            lines,
        }
    }

    /// Handle one falling edge on a tally line
    ///
    /// Returns `None` when the line is not registered (the edge is a
    /// no-op); otherwise the debounced command outcome.
    pub async fn handle_edge(&mut self, line: u8) -> Option<ControlResult> {
        let Some(source) = self.lines.get(&line).copied() else {
            trace!("ignoring edge on unregistered line {}", line);
            return None;
        };

        if !self.monitor.history_check(&source) {
            debug!("edge on line {} without tally change", line);
            return Some(ControlResult {
                acknowledged: true,
                changed: false,
            });
        }

        info!(
            "tally edge on line {}: switching {} to source {}",
            line, self.destination, source
        );
        Some(ControlResult {
            acknowledged: self.client.set_crosspoint(&self.destination, &source).await,
            changed: true,
        })
    }

    /// Consume edge events until the notification channel closes
    ///
    /// Handlers run one at a time on this task; the serial transport is
    /// never shared mid-exchange.
    pub async fn run(mut self, mut edges: mpsc::Receiver<u8>) {
        info!("tally dispatcher running for destination {}", self.destination);
        while let Some(line) = edges.recv().await {
            self.handle_edge(line).await;
        }
        info!("edge notification channel closed, dispatcher stopping");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tally::{MemorySnapshotStore, TallyLine};
    use rtr_protocol::control::ACK;
    use rtr_protocol::{Frame, FrameKind, FRAME_LEN};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    struct IdleContacts;

    impl ContactInput for IdleContacts {
        fn read(&self, _line: TallyLine) -> bool {
            false
        }
    }

    fn dispatcher(
        io: tokio::io::DuplexStream,
    ) -> EventDispatcher<tokio::io::DuplexStream, IdleContacts, MemorySnapshotStore> {
        let channels = TallyChannels::default();
        let lines = default_line_map(&channels);
        EventDispatcher::new(
            RouterClient::new(io),
            TallyMonitor::new(IdleContacts, MemorySnapshotStore::new(), channels),
            ChannelId::new("128").unwrap(),
            lines,
        )
    }

    #[tokio::test]
    async fn test_edge_triggers_set_command() {
        let (io, mut peer) = tokio::io::duplex(256);
        let mut dispatcher = dispatcher(io);

        let peer_task = tokio::spawn(async move {
            let mut request = vec![0u8; FRAME_LEN];
            peer.read_exact(&mut request).await.unwrap();
            peer.write_all(&[ACK]).await.unwrap();
            request
        });

        let result = dispatcher.handle_edge(TSUB_LINE).await.unwrap();
        assert!(result.acknowledged);
        assert!(result.changed);

        let frame = Frame::parse(&peer_task.await.unwrap()).unwrap();
        assert_eq!(frame.kind(), FrameKind::Set);
        assert_eq!(frame.destination(), ChannelId::new("128").unwrap());
        assert_eq!(frame.source(), TallyChannels::default().tsub);
    }

    #[tokio::test]
    async fn test_unknown_line_is_ignored() {
        let (io, _peer) = tokio::io::duplex(256);
        let mut dispatcher = dispatcher(io);

        assert!(dispatcher.handle_edge(99).await.is_none());
    }

    #[tokio::test]
    async fn test_repeated_edge_is_debounced() {
        let (io, mut peer) = tokio::io::duplex(256);
        let mut dispatcher = dispatcher(io);

        let peer_task = tokio::spawn(async move {
            let mut request = vec![0u8; FRAME_LEN];
            peer.read_exact(&mut request).await.unwrap();
            peer.write_all(&[ACK]).await.unwrap();
            // Keep the transport open for the debounced second edge
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        });

        let first = dispatcher.handle_edge(NSUB_LINE).await.unwrap();
        assert!(first.changed);

        let second = dispatcher.handle_edge(NSUB_LINE).await.unwrap();
        assert!(second.acknowledged);
        assert!(!second.changed);

        peer_task.await.unwrap();
    }
}
