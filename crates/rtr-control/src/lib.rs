//! Tally-driven crosspoint control
//!
//! This crate drives one destination of a material-distribution crosspoint
//! router from two physical tally contacts. It provides:
//!
//! - [`RouterClient`]: the command/acknowledgment state machine over a
//!   serial channel (crosspoint set, status query)
//! - [`TallyMonitor`]: contact sampling and debounced state persistence
//! - [`EventDispatcher`]: binds tally-line edges to crosspoint commands
//!
//! Hardware access is injected through the [`ContactInput`] and
//! [`SnapshotStore`] capability traits and an mpsc edge stream, so the
//! whole control path runs unmodified against stubs and
//! `tokio::io::duplex` transports in tests.
//!
//! # Example
//!
//! ```rust,no_run
//! use rtr_control::{RouterClient, DEFAULT_BAUD_RATE};
//! use rtr_protocol::ChannelId;
//!
//! # async fn run() -> Result<(), rtr_control::ControlError> {
//! let mut client = RouterClient::connect("/dev/ttyUSB0", DEFAULT_BAUD_RATE)?;
//!
//! let dest = ChannelId::new("128").unwrap();
//! let source = ChannelId::new("024").unwrap();
//! if client.set_crosspoint(&dest, &source).await {
//!     println!("crosspoint applied");
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod dispatch;
pub mod error;
pub mod tally;

pub use client::{ControlResult, RouterClient, DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT};
pub use dispatch::{default_line_map, EventDispatcher, NSUB_LINE, TSUB_LINE};
pub use error::ControlError;
pub use tally::{
    ContactInput, FileSnapshotStore, MemorySnapshotStore, SnapshotStore, TallyChannels, TallyLine,
    TallyMonitor, TallyState,
};
