//! Size-limited file storage.
//!
//! This module provides:
//! - [`SizeLimitedWriter`] — [`RecordSink`] that rotates by byte size
//! - [`SizeLimitedLogManager`] — [`LogManager`] pairing the writer with a
//!   [`FlushQueue`] and the newest-first reader
//!
//! The current file is `<prefix>.log`. Rotation renames it to
//! `<prefix>-1.log`, shifting older generations up by one and discarding the
//! oldest once `history` files exist. A record at least as large as the
//! limit is written to a file of its own.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::clock::{system_clock, SharedClock};
use crate::config::{check_directory, SizeLimitedConfig};
use crate::error::Result;
use crate::manifest::{list_matching, rotation_plan, GenerationNaming};
use crate::queue::{FlushQueue, QueueStats};
use crate::reader;
use crate::traits::{LogManager, RecordSink};
use crate::types::{LogEntry, TimeRange};

struct OpenFile {
    writer: BufWriter<File>,
    /// Bytes in the file including those still buffered.
    size: u64,
}

/// Writes records to `<prefix>.log`, rotating before the size limit is passed.
pub struct SizeLimitedWriter {
    directory: PathBuf,
    naming: GenerationNaming,
    size_limit: u64,
    history: u32,
    current: Option<OpenFile>,
    /// Set when the current file holds an oversized record that could not
    /// be rotated away yet.
    sealed: bool,
}

impl SizeLimitedWriter {
    /// Creates a writer with the given limits, used as given.
    ///
    /// Managers clamp their configuration before calling this.
    #[must_use]
    pub fn with_limits(
        directory: impl Into<PathBuf>,
        naming: GenerationNaming,
        size_limit: u64,
        history: u32,
    ) -> Self {
        Self {
            directory: directory.into(),
            naming,
            size_limit,
            history: history.max(1),
            current: None,
            sealed: false,
        }
    }

    /// Path of a generation; generation 0 is the current file.
    #[must_use]
    pub fn generation_path(&self, generation: u32) -> PathBuf {
        self.directory.join(self.naming.file_name(generation))
    }

    /// Closes the current file and shifts the generation chain by one.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be flushed, removed or renamed.
    pub fn rotate(&mut self) -> Result<()> {
        self.close_current()?;

        if self.history == 1 {
            remove_if_exists(&self.generation_path(0))?;
        }
        for (from, to) in rotation_plan(self.history) {
            let from_path = self.generation_path(from);
            let to_path = self.generation_path(to);
            remove_if_exists(&to_path)?;
            match fs::rename(&from_path, &to_path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        self.sealed = false;
        debug!(
            directory = %self.directory.display(),
            history = self.history,
            "rotated size-limited log files"
        );
        Ok(())
    }

    /// Size of the current file, counting bytes not yet flushed.
    fn current_size(&self) -> u64 {
        match &self.current {
            Some(open) => open.size,
            None => fs::metadata(self.generation_path(0)).map_or(0, |m| m.len()),
        }
    }

    fn write_current(&mut self, record: &[u8]) -> Result<()> {
        let open = match self.current.take() {
            Some(open) => open,
            None => {
                let path = self.generation_path(0);
                let file = OpenOptions::new().create(true).append(true).open(&path)?;
                let size = file.metadata()?.len();
                debug!(path = %path.display(), size, "opened size-limited log file");
                OpenFile {
                    writer: BufWriter::new(file),
                    size,
                }
            }
        };

        let open = self.current.insert(open);
        open.writer.write_all(record)?;
        open.size += record.len() as u64;
        Ok(())
    }

    fn close_current(&mut self) -> Result<()> {
        if let Some(mut open) = self.current.take() {
            open.writer.flush()?;
        }
        Ok(())
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

impl RecordSink for SizeLimitedWriter {
    fn append(&mut self, record: &[u8]) -> Result<()> {
        let len = record.len() as u64;

        if len >= self.size_limit {
            self.rotate()?;
            self.write_current(record)?;
            if self.history > 1 {
                return self.rotate();
            }
            // With a single generation, rotating now would delete the record.
            self.close_current()?;
            self.sealed = true;
            return Ok(());
        }

        if self.sealed || self.current_size() + len > self.size_limit {
            self.rotate()?;
        }
        self.write_current(record)
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

/// Log manager rotating files by size.
pub struct SizeLimitedLogManager {
    directory: PathBuf,
    prefix: String,
    naming: GenerationNaming,
    size_limit: u64,
    history: u32,
    clock: SharedClock,
    queue: FlushQueue<SizeLimitedWriter>,
}

impl SizeLimitedLogManager {
    /// Creates a manager.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the directory is blank or not
    /// writable.
    pub fn new(config: SizeLimitedConfig) -> Result<Self> {
        Self::with_clock(config, system_clock())
    }

    /// Creates a manager whose lenient decoder stamps corrupt records with
    /// `clock`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the directory is blank or not
    /// writable.
    pub fn with_clock(config: SizeLimitedConfig, clock: SharedClock) -> Result<Self> {
        let directory = check_directory(&config.directory)?;
        let prefix = config.effective_prefix();
        let naming = GenerationNaming::new(&prefix)?;
        let size_limit = config.effective_size_limit();
        let history = config.effective_history_to_keep();

        let writer =
            SizeLimitedWriter::with_limits(directory.clone(), naming.clone(), size_limit, history);
        let queue = FlushQueue::spawn(prefix.clone(), writer)?;

        info!(
            directory = %directory.display(),
            prefix = %prefix,
            size_limit,
            history,
            "size-limited log manager started"
        );

        Ok(Self {
            directory,
            prefix,
            naming,
            size_limit,
            history,
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

    /// Reads entries within `range` from every generation, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error after shutdown or if the directory cannot be listed.
    pub fn read_entries(&self, range: &TimeRange) -> Result<Vec<LogEntry>> {
        self.queue.flush()?;
        let files = self.files()?;
        Ok(reader::merge(
            files.iter().map(|(_, path)| path.as_path()),
            range,
            self.clock.as_ref(),
        ))
    }

    /// Lists the generation files on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub fn files(&self) -> Result<Vec<(u32, PathBuf)>> {
        list_matching(&self.directory, |n| self.naming.parse(n))
    }

    /// Stops the writer thread after writing everything queued.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer thread panicked.
    pub fn shutdown(&self) -> Result<()> {
        self.queue.shutdown()?;
        info!(prefix = %self.prefix, "size-limited log manager stopped");
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

    /// Size limit after clamping.
    #[must_use]
    pub const fn size_limit(&self) -> u64 {
        self.size_limit
    }

    /// Generations kept after clamping.
    #[must_use]
    pub const fn history_to_keep(&self) -> u32 {
        self.history
    }
}

impl LogManager for SizeLimitedLogManager {
    fn queue_entry(&self, entry: LogEntry) -> Result<()> {
        SizeLimitedLogManager::queue_entry(self, entry)
    }

    fn read_entries(&self, range: &TimeRange) -> Result<Vec<LogEntry>> {
        SizeLimitedLogManager::read_entries(self, range)
    }

    fn shutdown(&self) -> Result<()> {
        SizeLimitedLogManager::shutdown(self)
    }
}
