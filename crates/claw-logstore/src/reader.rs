//! Reading and merging stored records.
//!
//! Files are read line by line with the lenient decoder, so a corrupt line
//! shows up as an error entry instead of hiding the rest of the file.
//! Entries from every file are tagged with a discovery sequence number,
//! sorted by `(timestamp, sequence)` and returned newest first.

use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, warn};

use crate::clock::Clock;
use crate::codec;
use crate::error::Result;
use crate::types::{LogEntry, TimeRange};

/// A decoded entry tagged with the order in which it was discovered.
#[derive(Debug, Clone)]
pub struct OrderedRecord {
    /// Discovery order within one read.
    pub sequence: u64,
    /// The decoded entry.
    pub entry: LogEntry,
}

impl OrderedRecord {
    /// Wraps an entry.
    #[must_use]
    pub const fn new(sequence: u64, entry: LogEntry) -> Self {
        Self { sequence, entry }
    }
}

impl PartialEq for OrderedRecord {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OrderedRecord {}

impl PartialOrd for OrderedRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.entry
            .timestamp
            .cmp(&other.entry.timestamp)
            .then(self.sequence.cmp(&other.sequence))
    }
}

/// Sorts records oldest first and returns their entries newest first.
#[must_use]
pub fn newest_first(mut records: Vec<OrderedRecord>) -> Vec<LogEntry> {
    records.sort();
    records.into_iter().rev().map(|r| r.entry).collect()
}

/// Reads every line of a file as a record.
///
/// Lines that do not decode, blank ones included, become error entries.
///
/// # Errors
///
/// Returns an error if the file cannot be opened.
pub fn read_file(path: &Path, clock: &dyn Clock) -> Result<Vec<LogEntry>> {
    let reader = BufReader::new(File::open(path)?);
    let mut entries = Vec::new();

    for line in reader.split(b'\n') {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "stopped reading log file");
                break;
            }
        };
        let text = String::from_utf8_lossy(&line);
        entries.push(codec::decode_lenient(&text, clock.now()));
    }

    Ok(entries)
}

/// Merges the records of `files` that fall within `range`, newest first.
///
/// Files are visited in the order given. Files that cannot be opened, for
/// example because rotation removed them after they were listed, are
/// skipped.
pub fn merge<'a, I>(files: I, range: &TimeRange, clock: &dyn Clock) -> Vec<LogEntry>
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut records = Vec::new();
    let mut sequence = 0u64;

    for path in files {
        let entries = match read_file(path, clock) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "skipping unreadable log file");
                continue;
            }
        };
        for entry in entries {
            if !range.contains(entry.timestamp) {
                continue;
            }
            records.push(OrderedRecord::new(sequence, entry));
            sequence += 1;
        }
    }

    newest_first(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::codec::RAW_LINE_KEY;
    use crate::types::LogLevel;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn base_time() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).single().unwrap_or_default()
    }

    fn entry_at(offset_ms: i64, message: &str) -> LogEntry {
        LogEntry::builder()
            .timestamp(base_time() + Duration::milliseconds(offset_ms))
            .level(LogLevel::Info)
            .message(message)
            .build()
            .expect("valid entry")
    }

    fn write_file(dir: &Path, name: &str, entries: &[LogEntry]) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).expect("create");
        for entry in entries {
            file.write_all(&codec::encode(entry).expect("encode"))
                .expect("write");
        }
        path
    }

    fn messages(entries: &[LogEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.message.as_str()).collect()
    }

    #[test]
    fn ordered_record_breaks_ties_by_sequence() {
        let a = OrderedRecord::new(0, entry_at(0, "a"));
        let b = OrderedRecord::new(1, entry_at(0, "b"));
        let c = OrderedRecord::new(2, entry_at(-5, "c"));
        assert!(a < b);
        assert!(c < a);
        assert_eq!(messages(&newest_first(vec![b, c, a])), vec!["b", "a", "c"]);
    }

    #[test]
    fn merge_interleaves_files_newest_first() {
        let dir = TempDir::new().expect("create temp dir");
        let first = write_file(
            dir.path(),
            "a.log",
            &[entry_at(0, "a0"), entry_at(20, "a20")],
        );
        let second = write_file(
            dir.path(),
            "b.log",
            &[entry_at(10, "b10"), entry_at(30, "b30")],
        );

        let clock = ManualClock::new(base_time());
        let merged = merge(
            [first.as_path(), second.as_path()],
            &TimeRange::all(),
            &clock,
        );
        assert_eq!(messages(&merged), vec!["b30", "a20", "b10", "a0"]);
    }

    #[test]
    fn merge_equal_timestamps_later_discovery_first() {
        let dir = TempDir::new().expect("create temp dir");
        let first = write_file(dir.path(), "a.log", &[entry_at(0, "first"), entry_at(0, "second")]);
        let second = write_file(dir.path(), "b.log", &[entry_at(0, "third")]);

        let clock = ManualClock::new(base_time());
        let merged = merge(
            [first.as_path(), second.as_path()],
            &TimeRange::all(),
            &clock,
        );
        assert_eq!(messages(&merged), vec!["third", "second", "first"]);
    }

    #[test]
    fn merge_applies_inclusive_bounds() {
        let dir = TempDir::new().expect("create temp dir");
        let path = write_file(
            dir.path(),
            "a.log",
            &[
                entry_at(0, "before"),
                entry_at(10, "start"),
                entry_at(20, "middle"),
                entry_at(30, "end"),
                entry_at(40, "after"),
            ],
        );

        let range = TimeRange::new(
            Some(base_time() + Duration::milliseconds(10)),
            Some(base_time() + Duration::milliseconds(30)),
        );
        let clock = ManualClock::new(base_time());
        let merged = merge([path.as_path()], &range, &clock);
        assert_eq!(messages(&merged), vec!["end", "middle", "start"]);
    }

    #[test]
    fn corrupt_lines_become_error_entries() {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("a.log");
        let mut contents = codec::encode(&entry_at(0, "good")).expect("encode");
        contents.extend_from_slice(b"this is not json,\n");
        contents.extend(codec::encode(&entry_at(10, "also good")).expect("encode"));
        std::fs::write(&path, contents).expect("write");

        let now = base_time() + Duration::days(1);
        let clock = ManualClock::new(now);
        let merged = merge([path.as_path()], &TimeRange::all(), &clock);

        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].level, LogLevel::Error);
        assert_eq!(merged[0].timestamp, now);
        assert_eq!(
            merged[0].param(RAW_LINE_KEY),
            Some(&serde_json::json!("this is not json,"))
        );
        assert_eq!(messages(&merged[1..]), vec!["also good", "good"]);
    }

    #[test]
    fn blank_lines_become_error_entries() {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("a.log");
        let mut contents = codec::encode(&entry_at(0, "good")).expect("encode");
        contents.extend_from_slice(b"\n   \n");
        std::fs::write(&path, contents).expect("write");

        let clock = ManualClock::new(base_time() + Duration::days(1));
        let entries = read_file(&path, &clock).expect("read");

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].message, "good");
        assert!(entries[1..].iter().all(|e| e.level == LogLevel::Error));
        assert_eq!(entries[1].param(RAW_LINE_KEY), Some(&serde_json::json!("")));
        assert_eq!(entries[2].param(RAW_LINE_KEY), Some(&serde_json::json!("   ")));
    }

    #[test]
    fn missing_files_are_skipped() {
        let dir = TempDir::new().expect("create temp dir");
        let present = write_file(dir.path(), "a.log", &[entry_at(0, "kept")]);
        let missing = dir.path().join("gone.log");

        let clock = ManualClock::new(base_time());
        let merged = merge(
            [missing.as_path(), present.as_path()],
            &TimeRange::all(),
            &clock,
        );
        assert_eq!(messages(&merged), vec!["kept"]);
    }

    #[test]
    fn read_file_reports_missing_file() {
        let dir = TempDir::new().expect("create temp dir");
        let clock = ManualClock::new(base_time());
        assert!(read_file(&dir.path().join("nope.log"), &clock).is_err());
    }

    proptest! {
        #[test]
        fn prop_output_is_non_increasing(offsets in proptest::collection::vec(0i64..50, 0..40)) {
            let records: Vec<OrderedRecord> = offsets
                .iter()
                .enumerate()
                .map(|(i, ms)| OrderedRecord::new(i as u64, entry_at(*ms, &i.to_string())))
                .collect();
            let sorted = newest_first(records);
            prop_assert_eq!(sorted.len(), offsets.len());
            for pair in sorted.windows(2) {
                prop_assert!(pair[0].timestamp >= pair[1].timestamp);
                if pair[0].timestamp == pair[1].timestamp {
                    let a: usize = pair[0].message.parse().unwrap_or_default();
                    let b: usize = pair[1].message.parse().unwrap_or_default();
                    prop_assert!(a > b);
                }
            }
        }
    }
}
