//! Daily-rotation file storage.
//!
//! This module provides:
//! - [`DailyWriter`] — [`RecordSink`] writing one file per UTC calendar day
//! - [`DailyLogManager`] — [`LogManager`] pairing the writer with a
//!   [`FlushQueue`] and the newest-first reader
//!
//! Files are named `<prefix>-<YYYYMMDD>.log`. Whenever the writer opens a
//! new day's file it deletes files older than the retention window.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate};
use tracing::{debug, info, warn};

use crate::clock::{system_clock, SharedClock};
use crate::config::{check_directory, DailyConfig};
use crate::error::Result;
use crate::manifest::{date_to_version, list_matching, DailyNaming};
use crate::queue::{FlushQueue, QueueStats};
use crate::reader;
use crate::traits::{LogManager, RecordSink};
use crate::types::{LogEntry, TimeRange};

/// Currently open day file.
struct OpenDay {
    version: i64,
    writer: BufWriter<File>,
}

/// Writes records to the file for the current day.
pub struct DailyWriter {
    directory: PathBuf,
    naming: DailyNaming,
    days_to_keep: u32,
    clock: SharedClock,
    current: Option<OpenDay>,
}

impl DailyWriter {
    /// Creates a writer. No file is opened until the first append.
    ///
    /// `days_to_keep` is used as given; managers clamp it beforehand.
    #[must_use]
    pub fn new(
        directory: impl Into<PathBuf>,
        naming: DailyNaming,
        days_to_keep: u32,
        clock: SharedClock,
    ) -> Self {
        Self {
            directory: directory.into(),
            naming,
            days_to_keep,
            clock,
            current: None,
        }
    }

    /// Date version of the file currently open, if any.
    #[must_use]
    pub fn current_version(&self) -> Option<i64> {
        self.current.as_ref().map(|open| open.version)
    }

    /// Deletes every day file older than the retention window ending at `today`.
    ///
    /// Returns the number of files removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub fn purge(&self, today: NaiveDate) -> Result<usize> {
        let oldest_to_keep = today
            .checked_sub_days(Days::new(u64::from(self.days_to_keep)))
            .unwrap_or(NaiveDate::MIN);
        let cutoff = date_to_version(oldest_to_keep);

        let mut removed = 0;
        for (version, path) in list_matching(&self.directory, |n| self.naming.parse(n))? {
            if version >= cutoff {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!(path = %path.display(), "purged expired log file");
                    removed += 1;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to purge log file");
                }
            }
        }
        Ok(removed)
    }

    fn writer_for_today(&mut self) -> Result<&mut BufWriter<File>> {
        let today = self.clock.now().date_naive();
        let version = date_to_version(today);

        let open = match self.current.take() {
            Some(open) if open.version == version => open,
            stale => {
                if let Some(mut stale) = stale {
                    stale.writer.flush()?;
                }
                self.purge(today)?;
                let path = self.directory.join(self.naming.file_name(version));
                let file = OpenOptions::new().create(true).append(true).open(&path)?;
                debug!(path = %path.display(), "opened daily log file");
                OpenDay {
                    version,
                    writer: BufWriter::new(file),
                }
            }
        };

        Ok(&mut self.current.insert(open).writer)
    }

    fn close_current(&mut self) -> Result<()> {
        if let Some(mut open) = self.current.take() {
            open.writer.flush()?;
        }
        Ok(())
    }
}

impl RecordSink for DailyWriter {
    fn append(&mut self, record: &[u8]) -> Result<()> {
        self.writer_for_today()?.write_all(record)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(open) = self.current.as_mut() {
            open.writer.flush()?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.close_current()
    }
}

/// Log manager writing one file per day.
pub struct DailyLogManager {
    directory: PathBuf,
    prefix: String,
    naming: DailyNaming,
    days_to_keep: u32,
    clock: SharedClock,
    queue: FlushQueue<DailyWriter>,
}

impl DailyLogManager {
    /// Creates a manager using the system clock.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the directory is blank or not
    /// writable.
    pub fn new(config: DailyConfig) -> Result<Self> {
        Self::with_clock(config, system_clock())
    }

    /// Creates a manager reading time from `clock`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the directory is blank or not
    /// writable.
    pub fn with_clock(config: DailyConfig, clock: SharedClock) -> Result<Self> {
        let directory = check_directory(&config.directory)?;
        let prefix = config.effective_prefix();
        let naming = DailyNaming::new(&prefix)?;
        let days_to_keep = config.effective_days_to_keep();

        let writer = DailyWriter::new(
            directory.clone(),
            naming.clone(),
            days_to_keep,
            clock.clone(),
        );
        let queue = FlushQueue::spawn(prefix.clone(), writer)?;

        info!(
            directory = %directory.display(),
            prefix = %prefix,
            days_to_keep,
            "daily log manager started"
        );

        Ok(Self {
            directory,
            prefix,
            naming,
            days_to_keep,
            clock,
            queue,
        })
    }

    /// Queues an entry for writing.
    ///
    /// # Errors
    ///
    /// Returns an error after shutdown.
    pub fn queue_entry(&self, entry: LogEntry) -> Result<()> {
        self.queue.enqueue(entry)
    }

    /// Waits until everything queued so far is on disk.
    ///
    /// # Errors
    ///
    /// Returns an error after shutdown or if the writer thread died.
    pub fn flush(&self) -> Result<()> {
        self.queue.flush()
    }

    /// Reads entries within `range`, newest first.
    ///
    /// Day files outside the range are skipped by name before any record is
    /// decoded; records are then filtered by their exact timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error after shutdown or if the directory cannot be listed.
    pub fn read_entries(&self, range: &TimeRange) -> Result<Vec<LogEntry>> {
        self.queue.flush()?;

        let min_version = date_to_version(range.start.map_or(NaiveDate::MIN, |t| t.date_naive()));
        let max_version = date_to_version(
            range
                .end
                .unwrap_or_else(|| self.clock.now())
                .date_naive(),
        );

        let files: Vec<PathBuf> = self
            .files()?
            .into_iter()
            .filter(|(version, _)| (min_version..=max_version).contains(version))
            .map(|(_, path)| path)
            .collect();

        Ok(reader::merge(
            files.iter().map(PathBuf::as_path),
            range,
            self.clock.as_ref(),
        ))
    }

    /// Lists the day files on disk with their date versions.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub fn files(&self) -> Result<Vec<(i64, PathBuf)>> {
        list_matching(&self.directory, |n| self.naming.parse(n))
    }

    /// Stops the writer thread after writing everything queued.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer thread panicked.
    pub fn shutdown(&self) -> Result<()> {
        self.queue.shutdown()?;
        info!(prefix = %self.prefix, "daily log manager stopped");
        Ok(())
    }

    /// Writer counters.
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        self.queue.stats()
    }

    /// The validated log directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The sanitized filename prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Retention in days after clamping.
    #[must_use]
    pub const fn days_to_keep(&self) -> u32 {
        self.days_to_keep
    }
}

impl LogManager for DailyLogManager {
    fn queue_entry(&self, entry: LogEntry) -> Result<()> {
        DailyLogManager::queue_entry(self, entry)
    }

    fn read_entries(&self, range: &TimeRange) -> Result<Vec<LogEntry>> {
        DailyLogManager::read_entries(self, range)
    }

    fn shutdown(&self) -> Result<()> {
        DailyLogManager::shutdown(self)
    }
}
