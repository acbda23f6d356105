//! Traits for log managers and their storage backends.
//!
//! [`LogManager`] is the producer-facing contract every manager implements.
//! [`RecordSink`] is the capability a rotation policy offers to the
//! background writer, so one [`FlushQueue`](crate::queue::FlushQueue) can
//! drive any policy.

use crate::error::Result;
use crate::types::{LogEntry, TimeRange};

/// A backend that accepts entries and replays them newest first.
pub trait LogManager: Send + Sync {
    /// Queues an entry for writing. Never blocks on I/O.
    ///
    /// # Errors
    ///
    /// Returns an error if the manager has been shut down.
    fn queue_entry(&self, entry: LogEntry) -> Result<()>;

    /// Reads entries whose timestamp falls within `range`.
    ///
    /// Entries are returned newest first; entries sharing a timestamp are
    /// returned in reverse discovery order.
    ///
    /// # Errors
    ///
    /// Returns an error if the manager has been shut down or its storage
    /// cannot be listed.
    fn read_entries(&self, range: &TimeRange) -> Result<Vec<LogEntry>>;

    /// Stops the manager, writing anything still queued.
    ///
    /// Calling it more than once is harmless.
    ///
    /// # Errors
    ///
    /// Returns an error if the background writer could not be stopped cleanly.
    fn shutdown(&self) -> Result<()>;
}

/// Destination for encoded records, owned by a single writer thread.
pub trait RecordSink: Send + 'static {
    /// Appends one encoded record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn append(&mut self, record: &[u8]) -> Result<()>;

    /// Flushes buffered data to the operating system.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    fn flush(&mut self) -> Result<()>;

    /// Flushes and releases any open file.
    ///
    /// # Errors
    ///
    /// Returns an error if the final flush fails.
    fn close(&mut self) -> Result<()> {
        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LogLevel;
    use parking_lot::Mutex;

    /// A sink that keeps records in memory.
    #[derive(Default)]
    struct VecSink {
        records: Vec<Vec<u8>>,
        flushes: usize,
    }

    impl RecordSink for VecSink {
        fn append(&mut self, record: &[u8]) -> Result<()> {
            self.records.push(record.to_vec());
            Ok(())
        }

        fn flush(&mut self) -> Result<()> {
            self.flushes += 1;
            Ok(())
        }
    }

    /// A manager that keeps entries in insertion order.
    #[derive(Default)]
    struct MockManager {
        entries: Mutex<Vec<LogEntry>>,
    }

    impl LogManager for MockManager {
        fn queue_entry(&self, entry: LogEntry) -> Result<()> {
            self.entries.lock().push(entry);
            Ok(())
        }

        fn read_entries(&self, range: &TimeRange) -> Result<Vec<LogEntry>> {
            Ok(self
                .entries
                .lock()
                .iter()
                .rev()
                .filter(|e| range.contains(e.timestamp))
                .cloned()
                .collect())
        }

        fn shutdown(&self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn default_close_flushes() {
        let mut sink = VecSink::default();
        assert!(sink.append(b"one").is_ok());
        assert!(sink.close().is_ok());
        assert_eq!(sink.records.len(), 1);
        assert_eq!(sink.flushes, 1);
    }

    #[test]
    fn manager_is_object_safe() {
        let manager: Box<dyn LogManager> = Box::new(MockManager::default());
        assert!(manager.queue_entry(LogEntry::new(LogLevel::Info, "first")).is_ok());
        assert!(manager.queue_entry(LogEntry::new(LogLevel::Info, "second")).is_ok());

        let entries = manager.read_entries(&TimeRange::all()).expect("read");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "second");
        assert!(manager.shutdown().is_ok());
    }
}
