//! # claw-logstore
//!
//! Buffered persistence for structured log entries.
//!
//! Producers queue entries without touching the filesystem; a background
//! writer thread drains the queue in batches into rotating files. Entries are
//! later read back in chronological order, newest first.
//!
//! This crate provides:
//!
//! - [`LogEntry`] — Structured log entry with level, event id and parameters
//! - [`LogManager`] — Common contract of every manager
//! - [`DailyLogManager`] — One file per UTC day with day-based retention
//! - [`SizeLimitedLogManager`] — Size-capped files with numbered generations
//! - [`MemoryLogManager`] / [`NullLogManager`] — Non-persistent managers
//! - [`FlushQueue`] — Background writer with a flush barrier
//!
//! ## Example
//!
//! ```rust
//! use claw_logstore::{DailyConfig, DailyLogManager, LogEntry, LogLevel, TimeRange};
//!
//! let dir = tempfile::TempDir::new()?;
//! let manager = DailyLogManager::new(DailyConfig::new(dir.path()).with_days_to_keep(7))?;
//!
//! let entry = LogEntry::builder()
//!     .timestamp(chrono::Utc::now())
//!     .level(LogLevel::Info)
//!     .event_id(1001)
//!     .message("Application started")
//!     .param("version", "1.4.2")
//!     .build()?;
//! manager.queue_entry(entry)?;
//!
//! // Reading waits for everything queued so far to be written.
//! let entries = manager.read_entries(&TimeRange::all())?;
//! assert_eq!(entries.len(), 1);
//!
//! manager.shutdown()?;
//! # Ok::<(), claw_logstore::LogError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod codec;
pub mod config;
pub mod daily;
pub mod error;
pub mod manifest;
pub mod memory;
pub mod queue;
pub mod reader;
pub mod size_limited;
pub mod traits;
pub mod types;

// Re-export main types
pub use clock::{system_clock, Clock, ManualClock, SharedClock, SystemClock};
pub use config::{check_directory, sanitize_prefix, DailyConfig, MemoryConfig, SizeLimitedConfig};
pub use daily::{DailyLogManager, DailyWriter};
pub use error::{LogError, Result};
pub use memory::{MemoryLogManager, NullLogManager};
pub use queue::{FlushQueue, QueueStats};
pub use reader::OrderedRecord;
pub use size_limited::{SizeLimitedLogManager, SizeLimitedWriter};
pub use traits::{LogManager, RecordSink};
pub use types::{LogEntry, LogEntryBuilder, LogLevel, LogParam, TimeRange};
