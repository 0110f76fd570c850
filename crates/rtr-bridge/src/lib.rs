//! Router impersonation bridge
//!
//! Accepts the material-distribution router's serial control protocol,
//! validates and acknowledges inbound frames, remaps channel numbers
//! through a translation table, and forwards set commands as a binary
//! protocol over TCP to the downstream switch.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rtr_bridge::{BridgeConfig, ProtocolBridge, TranslationTable};
//! use tokio::sync::{broadcast, mpsc};
//!
//! # async fn run() -> Result<(), rtr_bridge::BridgeError> {
//! let table = Arc::new(TranslationTable::load_json("location.json")?);
//! let config = BridgeConfig {
//!     downstream: Some("192.168.212.200:52000".to_string()),
//!     ..Default::default()
//! };
//!
//! let (events, _) = broadcast::channel(32);
//! let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
//! let bridge = ProtocolBridge::connect("/dev/ttyUSB0", 9600, config, table, events)?;
//!
//! let worker = tokio::spawn(bridge.run(shutdown_rx));
//! // ... later:
//! shutdown_tx.send(rtr_bridge::BridgeCommand::Shutdown).await.ok();
//! # let _ = worker;
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod error;
pub mod forward;
pub mod table;

pub use bridge::{BridgeCommand, BridgeConfig, BridgeEvent, ProtocolBridge};
pub use error::BridgeError;
pub use forward::{encode_switch_frame, forward_switch_command, DEFAULT_FORWARD_TIMEOUT};
pub use table::TranslationTable;
