//! Bounded history of week snapshots
//!
//! Snapshots are value copies. Oldest entries are evicted first once the
//! capacity is reached.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::document::Week;
use crate::week::WeekKey;

/// Default number of snapshots kept
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

/// Immutable copy of one week at save time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Week the snapshot was taken from
    pub date: WeekKey,
    #[serde(rename = "savedAt")]
    pub saved_at: DateTime<Utc>,
    pub data: Week,
}

/// Insertion-ordered, capacity-bounded snapshot list (oldest first)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    capacity: usize,
    entries: VecDeque<Snapshot>,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl History {
    /// A capacity of zero is raised to one
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::new(),
        }
    }

    /// Rebuild from stored entries, keeping only the newest `capacity`
    pub fn from_entries(entries: Vec<Snapshot>, capacity: usize) -> Self {
        let mut history = Self::new(capacity);
        for entry in entries {
            history.push(entry);
        }
        history
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Snapshot> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.entries.iter()
    }

    /// Append; returns the evicted oldest snapshot when over capacity
    pub fn push(&mut self, snapshot: Snapshot) -> Option<Snapshot> {
        self.entries.push_back(snapshot);
        if self.entries.len() > self.capacity {
            self.entries.pop_front()
        } else {
            None
        }
    }

    pub fn remove(&mut self, index: usize) -> Option<Snapshot> {
        self.entries.remove(index)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn to_vec(&self) -> Vec<&Snapshot> {
        self.entries.iter().collect()
    }
}
