//! Non-persistent log managers.
//!
//! This module provides:
//! - [`MemoryLogManager`] — bounded in-memory FIFO of entries
//! - [`NullLogManager`] — accepts and discards everything

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::debug;

use crate::config::MemoryConfig;
use crate::error::{LogError, Result};
use crate::reader::{newest_first, OrderedRecord};
use crate::traits::LogManager;
use crate::types::{LogEntry, TimeRange};

/// Keeps the most recent entries in memory, evicting the oldest when full.
pub struct MemoryLogManager {
    record_limit: usize,
    entries: Mutex<VecDeque<LogEntry>>,
    accepting: AtomicBool,
}

impl MemoryLogManager {
    /// Creates a manager holding at most the clamped record limit.
    #[must_use]
    pub fn new(config: &MemoryConfig) -> Self {
        let record_limit = config.effective_record_limit();
        debug!(record_limit, "memory log manager created");
        Self {
            record_limit,
            entries: Mutex::new(VecDeque::new()),
            accepting: AtomicBool::new(true),
        }
    }

    /// Record limit after clamping.
    #[must_use]
    pub const fn record_limit(&self) -> usize {
        self.record_limit
    }

    /// Number of entries currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if no entries are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.accepting.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(LogError::Closed)
        }
    }
}

impl Default for MemoryLogManager {
    fn default() -> Self {
        Self::new(&MemoryConfig::default())
    }
}

impl LogManager for MemoryLogManager {
    fn queue_entry(&self, entry: LogEntry) -> Result<()> {
        self.ensure_open()?;
        let mut entries = self.entries.lock();
        while entries.len() >= self.record_limit {
            entries.pop_front();
        }
        entries.push_back(entry);
        Ok(())
    }

    fn read_entries(&self, range: &TimeRange) -> Result<Vec<LogEntry>> {
        self.ensure_open()?;
        let records: Vec<OrderedRecord> = self
            .entries
            .lock()
            .iter()
            .zip(0u64..)
            .filter(|(entry, _)| range.contains(entry.timestamp))
            .map(|(entry, sequence)| OrderedRecord::new(sequence, entry.clone()))
            .collect();
        Ok(newest_first(records))
    }

    fn shutdown(&self) -> Result<()> {
        if self.accepting.swap(false, Ordering::AcqRel) {
            self.entries.lock().clear();
            debug!("memory log manager stopped");
        }
        Ok(())
    }
}

/// Discards every entry and always reads back nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLogManager;

impl LogManager for NullLogManager {
    fn queue_entry(&self, _entry: LogEntry) -> Result<()> {
        Ok(())
    }

    fn read_entries(&self, _range: &TimeRange) -> Result<Vec<LogEntry>> {
        Ok(Vec::new())
    }

    fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}
