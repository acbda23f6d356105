//! Manager configuration.
//!
//! Out-of-range numeric settings are clamped to their documented bounds,
//! never rejected. Filename prefixes are sanitized before use and the log
//! directory is probed with a throwaway file before a manager starts.

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{LogError, Result};

/// Prefix used when the configured one sanitizes to nothing.
pub const DEFAULT_FILENAME_PREFIX: &str = "application";

/// Fewest daily files retained.
pub const MIN_DAYS_TO_KEEP: u32 = 1;
/// Most daily files retained.
pub const MAX_DAYS_TO_KEEP: u32 = 720;
/// Default daily retention.
pub const DEFAULT_DAYS_TO_KEEP: u32 = 30;

/// Smallest size limit (10 KiB).
pub const MIN_SIZE_LIMIT: u64 = 10 << 10;
/// Largest size limit (100 MiB).
pub const MAX_SIZE_LIMIT: u64 = 100 << 20;
/// Default size limit (1 MiB).
pub const DEFAULT_SIZE_LIMIT: u64 = 1 << 20;

/// Fewest size-limited generations kept.
pub const MIN_HISTORY_TO_KEEP: u32 = 1;
/// Most size-limited generations kept.
pub const MAX_HISTORY_TO_KEEP: u32 = 100;
/// Default number of size-limited generations.
pub const DEFAULT_HISTORY_TO_KEEP: u32 = 10;

/// Smallest in-memory record limit.
pub const MIN_RECORD_LIMIT: usize = 1;
/// Largest in-memory record limit.
pub const MAX_RECORD_LIMIT: usize = 1_000_000;
/// Default in-memory record limit.
pub const DEFAULT_RECORD_LIMIT: usize = 32_000;

/// Name of the probe file written by [`check_directory`].
const PROBE_FILE: &str = "test.txt";

static WHITESPACE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").unwrap_or_else(|_| unreachable!()));

static UNSAFE_CHAR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]").unwrap_or_else(|_| unreachable!()));

/// Configuration for a daily-rotation manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DailyConfig {
    /// Directory holding the log files.
    pub directory: PathBuf,
    /// Prefix for log file names; `-YYYYMMDD.log` is appended.
    pub filename_prefix: String,
    /// Number of days of files to keep.
    pub days_to_keep: u32,
}

impl Default for DailyConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            filename_prefix: DEFAULT_FILENAME_PREFIX.to_string(),
            days_to_keep: DEFAULT_DAYS_TO_KEEP,
        }
    }
}

impl DailyConfig {
    /// Creates a new config with the given directory.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ..Default::default()
        }
    }

    /// Sets the filename prefix.
    #[must_use]
    pub fn with_filename_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.filename_prefix = prefix.into();
        self
    }

    /// Sets the number of days to keep.
    #[must_use]
    pub const fn with_days_to_keep(mut self, days: u32) -> Self {
        self.days_to_keep = days;
        self
    }

    /// Retention after clamping to `[MIN_DAYS_TO_KEEP, MAX_DAYS_TO_KEEP]`.
    #[must_use]
    pub fn effective_days_to_keep(&self) -> u32 {
        self.days_to_keep.clamp(MIN_DAYS_TO_KEEP, MAX_DAYS_TO_KEEP)
    }

    /// Sanitized filename prefix.
    #[must_use]
    pub fn effective_prefix(&self) -> String {
        sanitize_prefix(&self.filename_prefix, DEFAULT_FILENAME_PREFIX)
    }
}

/// Configuration for a size-limited manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeLimitedConfig {
    /// Directory holding the log files.
    pub directory: PathBuf,
    /// Prefix for log file names.
    pub filename_prefix: String,
    /// Size in bytes the current file may not exceed.
    pub size_limit: u64,
    /// Number of files kept, including the current one.
    pub history_to_keep: u32,
}

impl Default for SizeLimitedConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            filename_prefix: DEFAULT_FILENAME_PREFIX.to_string(),
            size_limit: DEFAULT_SIZE_LIMIT,
            history_to_keep: DEFAULT_HISTORY_TO_KEEP,
        }
    }
}

impl SizeLimitedConfig {
    /// Creates a new config with the given directory.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ..Default::default()
        }
    }

    /// Sets the filename prefix.
    #[must_use]
    pub fn with_filename_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.filename_prefix = prefix.into();
        self
    }

    /// Sets the size limit.
    #[must_use]
    pub const fn with_size_limit(mut self, bytes: u64) -> Self {
        self.size_limit = bytes;
        self
    }

    /// Sets the number of generations to keep.
    #[must_use]
    pub const fn with_history_to_keep(mut self, history: u32) -> Self {
        self.history_to_keep = history;
        self
    }

    /// Size limit after clamping to `[MIN_SIZE_LIMIT, MAX_SIZE_LIMIT]`.
    #[must_use]
    pub fn effective_size_limit(&self) -> u64 {
        self.size_limit.clamp(MIN_SIZE_LIMIT, MAX_SIZE_LIMIT)
    }

    /// History after clamping to `[MIN_HISTORY_TO_KEEP, MAX_HISTORY_TO_KEEP]`.
    #[must_use]
    pub fn effective_history_to_keep(&self) -> u32 {
        self.history_to_keep
            .clamp(MIN_HISTORY_TO_KEEP, MAX_HISTORY_TO_KEEP)
    }

    /// Sanitized filename prefix.
    #[must_use]
    pub fn effective_prefix(&self) -> String {
        sanitize_prefix(&self.filename_prefix, DEFAULT_FILENAME_PREFIX)
    }
}

/// Configuration for the in-memory manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Maximum number of entries held.
    pub record_limit: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            record_limit: DEFAULT_RECORD_LIMIT,
        }
    }
}

impl MemoryConfig {
    /// Creates a config with the given record limit.
    #[must_use]
    pub const fn new(record_limit: usize) -> Self {
        Self { record_limit }
    }

    /// Record limit after clamping to `[MIN_RECORD_LIMIT, MAX_RECORD_LIMIT]`.
    #[must_use]
    pub fn effective_record_limit(&self) -> usize {
        self.record_limit.clamp(MIN_RECORD_LIMIT, MAX_RECORD_LIMIT)
    }
}

/// Makes a value safe to use as a filename prefix.
///
/// Whitespace runs become `_`, characters outside `[A-Za-z0-9._-]` are
/// removed and leading/trailing `.`, `-`, `_` are trimmed. Falls back to
/// `default` when nothing is left.
#[must_use]
pub fn sanitize_prefix(value: &str, default: &str) -> String {
    let spaced = WHITESPACE_REGEX.replace_all(value, "_");
    let cleaned = UNSAFE_CHAR_REGEX.replace_all(&spaced, "");
    let trimmed = cleaned.trim_matches(['.', '-', '_']);
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Ensures `directory` exists and is writable.
///
/// Creates the directory if needed, then writes and deletes a probe file.
///
/// # Errors
///
/// Returns [`LogError::Config`] if the path is blank or the probe fails.
pub fn check_directory(directory: &Path) -> Result<PathBuf> {
    if directory.as_os_str().to_string_lossy().trim().is_empty() {
        return Err(LogError::Config("log directory cannot be blank".to_string()));
    }

    let config_err = |action: &str, e: std::io::Error| {
        LogError::Config(format!(
            "log directory {} is not usable ({action}): {e}",
            directory.display()
        ))
    };

    fs::create_dir_all(directory).map_err(|e| config_err("create", e))?;

    let probe = directory.join(PROBE_FILE);
    let text = format!(
        "Test data written at {}.\nThis file is safe to delete.\n",
        chrono::Local::now().format("%H:%M:%S on %m/%d/%Y")
    );
    fs::write(&probe, text).map_err(|e| config_err("write", e))?;
    fs::remove_file(&probe).map_err(|e| config_err("delete", e))?;

    Ok(directory.to_path_buf())
}
