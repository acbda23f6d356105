//! Core types for the log persistence layer.
//!
//! This module provides:
//! - [`LogLevel`] — Severity levels for log entries
//! - [`LogEntry`] — Structured log entry as written by producers
//! - [`LogParam`] — Named auxiliary value attached to an entry
//! - [`TimeRange`] — Inclusive time bounds used when reading

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LogError;

/// Log severity levels, ordered from most to least verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed debugging information
    Trace = 0,
    /// Debugging information
    Debug = 1,
    /// General information
    Info = 2,
    /// Warning conditions
    Warn = 3,
    /// Error conditions
    Error = 4,
    /// Failures that require immediate attention
    Critical = 5,
}

/// A named auxiliary value attached to a log entry.
///
/// Keys are not required to be unique within an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogParam {
    /// Parameter name
    pub key: String,
    /// Parameter value
    pub value: serde_json::Value,
}

impl LogParam {
    /// Creates a new parameter.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A structured log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// When the entry was created
    pub timestamp: DateTime<Utc>,
    /// Severity level
    pub level: LogLevel,
    /// Producer-defined event identifier
    #[serde(default)]
    pub event_id: i32,
    /// The log message
    #[serde(default)]
    pub message: String,
    /// Exception or error detail text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
    /// Auxiliary values, in insertion order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<LogParam>,
}

impl LogEntry {
    /// Creates an entry stamped with the current time.
    #[must_use]
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            event_id: 0,
            message: message.into(),
            exception: None,
            params: Vec::new(),
        }
    }

    /// Creates a new log entry builder.
    #[must_use]
    pub fn builder() -> LogEntryBuilder {
        LogEntryBuilder::default()
    }

    /// Returns the first parameter with the given key.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&serde_json::Value> {
        self.params.iter().find(|p| p.key == key).map(|p| &p.value)
    }
}

/// Time range for reading logs. Both bounds are inclusive when present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Oldest timestamp to return
    pub start: Option<DateTime<Utc>>,
    /// Newest timestamp to return
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    /// Creates a new time range with the given bounds.
    #[must_use]
    pub const fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    /// A range with no bounds.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            start: None,
            end: None,
        }
    }

    /// Creates a time range from a start time onwards.
    #[must_use]
    pub const fn since(start: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    /// Creates a time range up to and including an end time.
    #[must_use]
    pub const fn until(end: DateTime<Utc>) -> Self {
        Self {
            start: None,
            end: Some(end),
        }
    }

    /// Checks if a timestamp falls within this range.
    #[must_use]
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        if let Some(start) = self.start {
            if timestamp < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if timestamp > end {
                return false;
            }
        }
        true
    }
}

/// Builder for constructing log entries.
#[derive(Debug, Default)]
pub struct LogEntryBuilder {
    timestamp: Option<DateTime<Utc>>,
    level: Option<LogLevel>,
    event_id: i32,
    message: Option<String>,
    exception: Option<String>,
    params: Vec<LogParam>,
}

impl LogEntryBuilder {
    /// Sets the timestamp.
    #[must_use]
    pub const fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Sets the log level.
    #[must_use]
    pub const fn level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    /// Sets the event identifier.
    #[must_use]
    pub const fn event_id(mut self, event_id: i32) -> Self {
        self.event_id = event_id;
        self
    }

    /// Sets the message.
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the exception detail.
    #[must_use]
    pub fn exception(mut self, exception: impl Into<String>) -> Self {
        self.exception = Some(exception.into());
        self
    }

    /// Appends a parameter.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params.push(LogParam::new(key, value));
        self
    }

    /// Builds the log entry, returning an error if required fields are missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the timestamp, level or message is not set.
    pub fn build(self) -> Result<LogEntry, LogError> {
        let timestamp = self.timestamp.ok_or(LogError::MissingField("timestamp"))?;
        let level = self.level.ok_or(LogError::MissingField("level"))?;
        let message = self.message.ok_or(LogError::MissingField("message"))?;

        Ok(LogEntry {
            timestamp,
            level,
            event_id: self.event_id,
            message,
            exception: self.exception,
            params: self.params,
        })
    }
}
