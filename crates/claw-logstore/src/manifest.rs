//! Filename conventions for rotated log files.
//!
//! There is no index file: the set of log files belonging to a manager is
//! recovered from a directory listing by parsing file names. Everything in
//! this module except [`list_matching`] is pure.
//!
//! - Daily files: `<prefix>-<YYYYMMDD>.log`
//! - Size-limited files: `<prefix>.log` (generation 0) and `<prefix>-<N>.log`

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use regex::Regex;

use crate::error::{LogError, Result};

/// Encodes a calendar date as `year * 10000 + month * 100 + day`.
#[must_use]
pub fn date_to_version(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 10_000 + i64::from(date.month()) * 100 + i64::from(date.day())
}

/// Naming scheme for daily files.
#[derive(Debug, Clone)]
pub struct DailyNaming {
    prefix: String,
    pattern: Regex,
}

impl DailyNaming {
    /// Creates the naming scheme for an already sanitized prefix.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the filename pattern cannot be built.
    pub fn new(prefix: &str) -> Result<Self> {
        let pattern = Regex::new(&format!(r"^{}-(\d{{8}})\.log$", regex::escape(prefix)))
            .map_err(|e| LogError::Config(format!("invalid filename prefix: {e}")))?;
        Ok(Self {
            prefix: prefix.to_string(),
            pattern,
        })
    }

    /// Returns the file name for a date version.
    #[must_use]
    pub fn file_name(&self, version: i64) -> String {
        format!("{}-{version:08}.log", self.prefix)
    }

    /// Extracts the date version from a file name.
    #[must_use]
    pub fn parse(&self, file_name: &str) -> Option<i64> {
        self.pattern
            .captures(file_name)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }
}

/// Naming scheme for size-limited generations.
#[derive(Debug, Clone)]
pub struct GenerationNaming {
    prefix: String,
    pattern: Regex,
}

impl GenerationNaming {
    /// Creates the naming scheme for an already sanitized prefix.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the filename pattern cannot be built.
    pub fn new(prefix: &str) -> Result<Self> {
        let pattern = Regex::new(&format!(r"^{}(?:-(\d+))?\.log$", regex::escape(prefix)))
            .map_err(|e| LogError::Config(format!("invalid filename prefix: {e}")))?;
        Ok(Self {
            prefix: prefix.to_string(),
            pattern,
        })
    }

    /// Returns the file name for a generation. Generation 0 is the current file.
    #[must_use]
    pub fn file_name(&self, generation: u32) -> String {
        if generation == 0 {
            format!("{}.log", self.prefix)
        } else {
            format!("{}-{generation}.log", self.prefix)
        }
    }

    /// Extracts the generation from a file name.
    #[must_use]
    pub fn parse(&self, file_name: &str) -> Option<u32> {
        let caps = self.pattern.captures(file_name)?;
        match caps.get(1) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    }
}

/// Renames needed to shift a generation chain of length `history` by one.
///
/// Returned as `(from, to)` pairs in the order they must be applied; the
/// target of each pair has to be removed first.
#[must_use]
pub fn rotation_plan(history: u32) -> Vec<(u32, u32)> {
    (1..history).rev().map(|i| (i - 1, i)).collect()
}

/// Lists files in `dir` whose name `parse` accepts, sorted by file name.
///
/// # Errors
///
/// Returns an error if the directory cannot be read.
pub fn list_matching<T, F>(dir: &Path, parse: F) -> Result<Vec<(T, PathBuf)>>
where
    F: Fn(&str) -> Option<T>,
{
    let mut files: Vec<(String, T, PathBuf)> = fs::read_dir(dir)?
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_ok_and(|t| t.is_file()))
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            parse(&name).map(|key| (name, key, e.path()))
        })
        .collect();
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files.into_iter().map(|(_, key, path)| (key, path)).collect())
}
