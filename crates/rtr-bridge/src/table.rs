//! Channel id translation table
//!
//! The facility renumbered its sources at some point; the downstream
//! switch still speaks the old single-byte ids. The table maps old
//! 3-digit router ids to new downstream ids, exact-match only: no ranges,
//! no defaults.
//!
//! Loaded once before the bridge starts and immutable afterwards; shared
//! with the bridge worker through an `Arc`.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use rtr_protocol::ChannelId;
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// Exact-match old-id to new-id mapping
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TranslationTable {
    entries: HashMap<u16, u8>,
}

impl TranslationTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from (old, new) id pairs
    pub fn from_pairs(pairs: impl IntoIterator<Item = (u16, u8)>) -> Self {
        Self {
            entries: pairs.into_iter().collect(),
        }
    }

    /// Load a table from a JSON file of `{"old": new}` entries
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, BridgeError> {
        let file = File::open(path)?;
        let table = serde_json::from_reader(BufReader::new(file))?;
        Ok(table)
    }

    /// Add one mapping (only useful before the bridge starts)
    pub fn insert(&mut self, old: u16, new: u8) {
        self.entries.insert(old, new);
    }

    /// Look up the downstream id for a router source channel
    pub fn lookup(&self, channel: &ChannelId) -> Option<u8> {
        self.entries.get(&channel.as_number()).copied()
    }

    /// Number of mappings
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no mappings
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
