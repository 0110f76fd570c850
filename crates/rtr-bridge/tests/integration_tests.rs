//! End-to-end tests for the bridge and the controller talking to it
//!
//! These tests wire a real `RouterClient` to a running `ProtocolBridge`
//! over an in-memory duplex transport, with a local TCP listener standing
//! in for the downstream switch:
//! - handshake outcomes in normal and failure-simulation mode
//! - tally-driven switching with debounce and on-air suppression
//! - channel translation and downstream forwarding

use std::io;
use std::sync::Arc;
use std::time::Duration;

use rtr_bridge::{
    encode_switch_frame, BridgeCommand, BridgeConfig, BridgeEvent, ProtocolBridge,
    TranslationTable,
};
use rtr_control::{
    ContactInput, MemorySnapshotStore, RouterClient, SnapshotStore, TallyChannels, TallyLine,
    TallyMonitor,
};
use rtr_protocol::ChannelId;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::timeout;

// ============================================================================
// Helper Functions
// ============================================================================

mod helpers {
    use super::*;

    pub fn init_logging() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "warn".into()),
            )
            .try_init();
    }

    pub fn ch(s: &str) -> ChannelId {
        ChannelId::new(s).unwrap()
    }

    /// Fixed contact levels for tally scenarios
    pub struct FixedContacts {
        pub tsub: bool,
        pub nsub: bool,
    }

    impl ContactInput for FixedContacts {
        fn read(&self, line: TallyLine) -> bool {
            match line {
                TallyLine::Tsub => self.tsub,
                TallyLine::Nsub => self.nsub,
            }
        }
    }

    /// A bridge worker plus the client connected to its serial side
    pub struct BridgeUnderTest {
        pub client: RouterClient<DuplexStream>,
        pub events: broadcast::Receiver<BridgeEvent>,
        shutdown: mpsc::Sender<BridgeCommand>,
        worker: JoinHandle<io::Result<()>>,
    }

    impl BridgeUnderTest {
        pub async fn stop(self) {
            self.shutdown.send(BridgeCommand::Shutdown).await.unwrap();
            self.worker.await.unwrap().unwrap();
        }
    }

    pub fn start_bridge(config: BridgeConfig, table: TranslationTable) -> BridgeUnderTest {
        init_logging();
        let (client_io, bridge_io) = tokio::io::duplex(1024);
        let (events_tx, events) = broadcast::channel(32);
        let (shutdown, shutdown_rx) = mpsc::channel(1);

        let bridge = ProtocolBridge::new(bridge_io, config, Arc::new(table), events_tx);
        let worker = tokio::spawn(bridge.run(shutdown_rx));

        BridgeUnderTest {
            client: RouterClient::with_timeout(client_io, Duration::from_secs(1)),
            events,
            shutdown,
            worker,
        }
    }

    pub async fn next_event(events: &mut broadcast::Receiver<BridgeEvent>) -> BridgeEvent {
        timeout(Duration::from_secs(1), events.recv())
            .await
            .expect("timed out waiting for bridge event")
            .expect("event channel closed")
    }
}

// ============================================================================
// Handshake Tests
// ============================================================================

mod handshake_tests {
    use super::helpers::*;
    use super::*;

    #[tokio::test]
    async fn set_crosspoint_acked_in_normal_mode() {
        let mut bridge = start_bridge(BridgeConfig::default(), TranslationTable::new());

        assert!(bridge.client.set_crosspoint(&ch("127"), &ch("128")).await);

        match next_event(&mut bridge.events).await {
            BridgeEvent::SetApplied {
                destination,
                source,
                response,
            } => {
                assert_eq!(destination, ch("127"));
                assert_eq!(source, ch("128"));
                assert_eq!(response, None);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        bridge.stop().await;
    }

    #[tokio::test]
    async fn set_crosspoint_fails_in_ng_mode() {
        let config = BridgeConfig {
            ng_mode: true,
            ..Default::default()
        };
        let mut bridge = start_bridge(config, TranslationTable::new());

        assert!(!bridge.client.set_crosspoint(&ch("127"), &ch("128")).await);

        assert!(matches!(
            next_event(&mut bridge.events).await,
            BridgeEvent::Rejected
        ));
        bridge.stop().await;
    }

    #[tokio::test]
    async fn query_answered_with_canned_status() {
        let mut bridge = start_bridge(BridgeConfig::default(), TranslationTable::new());

        assert!(bridge.client.get_crosspoint(&ch("127")).await);

        match next_event(&mut bridge.events).await {
            BridgeEvent::QueryAnswered { destination } => assert_eq!(destination, ch("127")),
            other => panic!("unexpected event: {:?}", other),
        }
        bridge.stop().await;
    }

    #[tokio::test]
    async fn query_fails_in_ng_mode() {
        let config = BridgeConfig {
            ng_mode: true,
            ..Default::default()
        };
        let mut bridge = start_bridge(config, TranslationTable::new());

        assert!(!bridge.client.get_crosspoint(&ch("127")).await);
        bridge.stop().await;
    }
}

// ============================================================================
// Tally-Driven Switching Tests
// ============================================================================

mod tally_tests {
    use super::helpers::*;
    use super::*;

    #[tokio::test]
    async fn on_air_issues_no_command() {
        let mut bridge = start_bridge(BridgeConfig::default(), TranslationTable::new());

        // Both contacts set: on-air, no definite source
        let monitor = TallyMonitor::new(
            FixedContacts {
                tsub: true,
                nsub: true,
            },
            MemorySnapshotStore::new(),
            TallyChannels::default(),
        );

        let result = bridge.client.set_by_selection(&monitor, &ch("128")).await;
        assert!(result.acknowledged);
        assert!(!result.changed);

        // Nothing reached the wire
        assert!(matches!(
            bridge.events.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
        bridge.stop().await;
    }

    #[tokio::test]
    async fn tsub_transition_sends_set_frame() {
        let mut bridge = start_bridge(BridgeConfig::default(), TranslationTable::new());

        let channels = TallyChannels::default();
        let store = MemorySnapshotStore::new();
        store.write(&channels.nsub).unwrap();

        // tsub=false, nsub=true selects the tally-sub source
        let monitor = TallyMonitor::new(
            FixedContacts {
                tsub: false,
                nsub: true,
            },
            store,
            channels.clone(),
        );

        let result = bridge.client.set_by_selection(&monitor, &ch("128")).await;
        assert!(result.acknowledged);
        assert!(result.changed);

        match next_event(&mut bridge.events).await {
            BridgeEvent::SetApplied {
                destination,
                source,
                ..
            } => {
                assert_eq!(destination, ch("128"));
                assert_eq!(source, channels.tsub);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        bridge.stop().await;
    }

    #[tokio::test]
    async fn repeated_selection_is_debounced() {
        let mut bridge = start_bridge(BridgeConfig::default(), TranslationTable::new());

        let monitor = TallyMonitor::new(
            FixedContacts {
                tsub: false,
                nsub: false,
            },
            MemorySnapshotStore::new(),
            TallyChannels::default(),
        );

        let first = bridge.client.set_by_selection(&monitor, &ch("128")).await;
        assert!(first.acknowledged && first.changed);
        let _ = next_event(&mut bridge.events).await;

        let second = bridge.client.set_by_selection(&monitor, &ch("128")).await;
        assert!(second.acknowledged);
        assert!(!second.changed);

        bridge.stop().await;
    }
}

// ============================================================================
// Translation and Forwarding Tests
// ============================================================================

mod translation_tests {
    use super::helpers::*;
    use super::*;

    async fn downstream_listener() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        (listener, addr)
    }

    #[tokio::test]
    async fn mapped_source_forwards_one_binary_frame() {
        let (listener, addr) = downstream_listener().await;

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 64];
            let n = socket.read(&mut buf).await.unwrap();
            socket.write_all(b"\x04").await.unwrap();
            buf.truncate(n);
            buf
        });

        let config = BridgeConfig {
            downstream: Some(addr),
            target_id: 12,
            forward_timeout: Duration::from_millis(500),
            ..Default::default()
        };
        let mut bridge = start_bridge(config, TranslationTable::from_pairs([(128, 116)]));

        assert!(bridge.client.set_crosspoint(&ch("127"), &ch("128")).await);

        let forwarded = server.await.unwrap();
        assert_eq!(forwarded, encode_switch_frame(12, 116));

        match next_event(&mut bridge.events).await {
            BridgeEvent::SetApplied {
                source, response, ..
            } => {
                assert_eq!(source, ch("128"));
                assert_eq!(response, Some(b"\x04".to_vec()));
            }
            other => panic!("unexpected event: {:?}", other),
        }
        bridge.stop().await;
    }

    #[tokio::test]
    async fn unmapped_source_naks_and_forwards_nothing() {
        let (listener, addr) = downstream_listener().await;

        let config = BridgeConfig {
            downstream: Some(addr),
            forward_timeout: Duration::from_millis(500),
            ..Default::default()
        };
        let mut bridge = start_bridge(config, TranslationTable::from_pairs([(128, 116)]));

        assert!(!bridge.client.set_crosspoint(&ch("127"), &ch("999")).await);

        assert!(matches!(
            next_event(&mut bridge.events).await,
            BridgeEvent::UnknownSource { source } if source == ch("999")
        ));

        // The downstream listener must never see a connection
        assert!(
            timeout(Duration::from_millis(200), listener.accept())
                .await
                .is_err()
        );
        bridge.stop().await;
    }

    #[tokio::test]
    async fn ng_mode_forwards_nothing_even_for_mapped_sources() {
        let (listener, addr) = downstream_listener().await;

        let config = BridgeConfig {
            downstream: Some(addr),
            ng_mode: true,
            ..Default::default()
        };
        let mut bridge = start_bridge(config, TranslationTable::from_pairs([(128, 116)]));

        assert!(!bridge.client.set_crosspoint(&ch("127"), &ch("128")).await);

        assert!(
            timeout(Duration::from_millis(200), listener.accept())
                .await
                .is_err()
        );
        bridge.stop().await;
    }

    #[tokio::test]
    async fn silent_downstream_still_acks() {
        let (listener, addr) = downstream_listener().await;

        // Accept and hold the connection without answering
        let server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_millis(500)).await;
        });

        let config = BridgeConfig {
            downstream: Some(addr),
            forward_timeout: Duration::from_millis(100),
            ..Default::default()
        };
        let mut bridge = start_bridge(config, TranslationTable::from_pairs([(128, 116)]));

        assert!(bridge.client.set_crosspoint(&ch("127"), &ch("128")).await);

        match next_event(&mut bridge.events).await {
            BridgeEvent::SetApplied { response, .. } => assert_eq!(response, None),
            other => panic!("unexpected event: {:?}", other),
        }

        server.await.unwrap();
        bridge.stop().await;
    }
}
