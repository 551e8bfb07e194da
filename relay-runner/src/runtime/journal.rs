//! Replay journal
//!
//! Records the results of side effects and completed activities under
//! deterministic keys. A workflow re-executed over the same journal reads
//! these back instead of recomputing them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// A recorded result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JournalEntry {
    SideEffect { value: Value },
    ActivityCompleted { activity: String, result: Value },
}

/// Shared, append-only record of one logical execution
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<BTreeMap<String, JournalEntry>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a journal from a previously taken snapshot
    pub fn from_snapshot(entries: BTreeMap<String, JournalEntry>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(entries)),
        }
    }

    pub fn get(&self, key: &str) -> Option<JournalEntry> {
        self.lock().get(key).cloned()
    }

    /// Records `entry` unless `key` already holds a value
    ///
    /// Returns the entry stored under `key` afterwards.
    pub fn record(&self, key: &str, entry: JournalEntry) -> JournalEntry {
        self.lock().entry(key.to_string()).or_insert(entry).clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn snapshot(&self) -> BTreeMap<String, JournalEntry> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, JournalEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
