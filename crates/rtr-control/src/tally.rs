//! Tally contact sampling and debounced state persistence
//!
//! Two physical tally contacts (tsub / nsub) indicate which upstream
//! source is on-air. [`TallyMonitor`] derives a logical source selection
//! from the contact pair and debounces it against a persisted snapshot so
//! that only real transitions trigger a crosspoint command.
//!
//! The contact reader and the snapshot store are injected capabilities;
//! tests supply stub implementations instead of touching hardware.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use rtr_protocol::ChannelId;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// The two physical tally lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TallyLine {
    /// Tally-sub contact
    Tsub,
    /// Near-sub contact
    Nsub,
}

/// Contact-reading capability (the GPIO driver in production)
pub trait ContactInput {
    /// Read the current level of one tally line
    fn read(&self, line: TallyLine) -> bool;
}

/// Logical source selection derived from the contact pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TallyState {
    /// Near-sub source selected (also the default when neither contact is set)
    Nsub,
    /// Tally-sub source selected
    Tsub,
    /// Both contacts set: program is on-air, no definite source
    OnAir,
}

impl TallyState {
    /// Derive the selection from the (tsub, nsub) contact readings
    pub fn from_contacts(tsub: bool, nsub: bool) -> Self {
        match (tsub, nsub) {
            (true, true) => TallyState::OnAir,
            (false, true) => TallyState::Tsub,
            _ => TallyState::Nsub,
        }
    }
}

/// Router source channels assigned to each tally state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TallyChannels {
    /// Near-sub source channel
    pub nsub: ChannelId,
    /// Tally-sub source channel
    pub tsub: ChannelId,
    /// On-air output channel (never written as a crosspoint source)
    pub oa: ChannelId,
}

impl Default for TallyChannels {
    fn default() -> Self {
        Self {
            nsub: ChannelId::new("024").expect("valid channel"),
            tsub: ChannelId::new("028").expect("valid channel"),
            oa: ChannelId::new("043").expect("valid channel"),
        }
    }
}

impl TallyChannels {
    /// The source channel assigned to a tally state
    pub fn channel_for(&self, state: TallyState) -> ChannelId {
        match state {
            TallyState::Nsub => self.nsub,
            TallyState::Tsub => self.tsub,
            TallyState::OnAir => self.oa,
        }
    }
}

/// Persisted last-observed channel, surviving polling cycles and restarts
///
/// Reads and writes are unguarded: the deployment assumption is a single
/// controller instance per destination, with all checks serialized on one
/// task. Concurrent writers would race.
pub trait SnapshotStore {
    /// Last persisted channel, or `None` when nothing was stored yet
    fn read(&self) -> Option<ChannelId>;

    /// Persist the observed channel
    fn write(&self, channel: &ChannelId) -> io::Result<()>;
}

/// Snapshot store backed by a small text file
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    /// Create a store at the given path (the file need not exist yet)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn read(&self) -> Option<ChannelId> {
        let contents = fs::read_to_string(&self.path).ok()?;
        match ChannelId::new(contents.trim_end()) {
            Ok(ch) => Some(ch),
            Err(e) => {
                warn!("ignoring unreadable snapshot {:?}: {}", self.path, e);
                None
            }
        }
    }

    fn write(&self, channel: &ChannelId) -> io::Result<()> {
        fs::write(&self.path, channel.as_str())
    }
}

/// In-memory snapshot store for tests and single-process deployments
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    cell: Mutex<Option<ChannelId>>,
}

impl MemorySnapshotStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn read(&self) -> Option<ChannelId> {
        *self.cell.lock().expect("snapshot lock")
    }

    fn write(&self, channel: &ChannelId) -> io::Result<()> {
        *self.cell.lock().expect("snapshot lock") = Some(*channel);
        Ok(())
    }
}

/// Samples the tally contacts and debounces against the persisted snapshot
pub struct TallyMonitor<C, S> {
    contacts: C,
    store: S,
    channels: TallyChannels,
}

impl<C: ContactInput, S: SnapshotStore> TallyMonitor<C, S> {
    /// Create a monitor over the given capabilities
    pub fn new(contacts: C, store: S, channels: TallyChannels) -> Self {
        Self {
            contacts,
            store,
            channels,
        }
    }

    /// The channel assignments in use
    pub fn channels(&self) -> &TallyChannels {
        &self.channels
    }

    /// Sample both contacts and return the selected source channel
    pub fn current_selection(&self) -> ChannelId {
        let tsub = self.contacts.read(TallyLine::Tsub);
        let nsub = self.contacts.read(TallyLine::Nsub);
        let state = TallyState::from_contacts(tsub, nsub);
        self.channels.channel_for(state)
    }

    /// Compare the currently sampled selection against the snapshot
    ///
    /// Returns true (and persists the new value) only on a real transition
    /// to nsub or tsub. An on-air reading never counts as a change and is
    /// never persisted.
    pub fn status_check(&self) -> bool {
        let observed = self.current_selection();
        self.has_changed(&observed)
    }

    /// Compare an externally supplied channel id (from an edge-notification
    /// payload) against the snapshot, with the same rule as [`Self::status_check`]
    pub fn history_check(&self, observed: &ChannelId) -> bool {
        self.has_changed(observed)
    }

    fn has_changed(&self, observed: &ChannelId) -> bool {
        let stored = self.store.read();

        if stored.as_ref() == Some(observed) {
            debug!("tally unchanged at {}", observed);
            return false;
        }
        if *observed == self.channels.oa {
            debug!("on-air reading {} suppressed", observed);
            return false;
        }

        if let Err(e) = self.store.write(observed) {
            warn!("failed to persist tally snapshot {}: {}", observed, e);
        }
        debug!(
            "tally changed: {} -> {}",
            stored.map(|c| c.to_string()).unwrap_or_else(|| "-".into()),
            observed
        );
        true
    }
}
