//! Record codec.
//!
//! Each entry is stored as one compact JSON object on its own line, followed
//! by a `,` so that a whole file wrapped in `[` `]` is a JSON array. Decoding
//! is line oriented and ignores the trailing separator.

use chrono::{DateTime, Utc};

use crate::error::{LogError, Result};
use crate::types::{LogEntry, LogLevel, LogParam};

/// Line terminator appended to every encoded record.
pub const RECORD_SEPARATOR: &[u8] = b",\n";

/// Parameter key holding the raw text of a line that failed to decode.
pub const RAW_LINE_KEY: &str = "JSON";

/// Message used when the parser gives no diagnostic.
pub const DECODE_FALLBACK_MESSAGE: &str = "could not deserialize log entry";

/// Encodes an entry as a single separator-terminated line.
///
/// # Errors
///
/// Returns an error if a parameter value cannot be serialized.
pub fn encode(entry: &LogEntry) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec(entry)?;
    bytes.extend_from_slice(RECORD_SEPARATOR);
    Ok(bytes)
}

/// Decodes a single line.
///
/// # Errors
///
/// Returns [`LogError::Decode`] if the line is not a valid record.
pub fn decode(line: &str) -> Result<LogEntry> {
    serde_json::from_str(strip_separator(line)).map_err(|e| LogError::Decode(diagnostic(&e)))
}

/// Decodes a single line, turning malformed input into an error entry.
///
/// The replacement entry is stamped with `now`, has level
/// [`LogLevel::Error`], carries the parser diagnostic as its message and
/// keeps the raw line under [`RAW_LINE_KEY`].
#[must_use]
pub fn decode_lenient(line: &str, now: DateTime<Utc>) -> LogEntry {
    match serde_json::from_str(strip_separator(line)) {
        Ok(entry) => entry,
        Err(e) => LogEntry {
            timestamp: now,
            level: LogLevel::Error,
            event_id: 0,
            message: diagnostic(&e),
            exception: None,
            params: vec![LogParam::new(RAW_LINE_KEY, line)],
        },
    }
}

fn strip_separator(line: &str) -> &str {
    let trimmed = line.trim_end();
    trimmed.strip_suffix(',').unwrap_or(trimmed)
}

fn diagnostic(err: &serde_json::Error) -> String {
    let message = err.to_string();
    if message.trim().is_empty() {
        DECODE_FALLBACK_MESSAGE.to_string()
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn sample_entry() -> LogEntry {
        LogEntry::builder()
            .timestamp(Utc.timestamp_nanos(1_700_000_000_123_456_789))
            .level(LogLevel::Warn)
            .event_id(42)
            .message("line one\nline two, with \"quotes\"")
            .exception("stack trace\n  at frame")
            .param("user", "alice")
            .param("user", "bob")
            .param("attempt", 3)
            .build()
            .expect("valid entry")
    }

    #[test]
    fn encode_is_single_line_with_separator() {
        let bytes = encode(&sample_entry()).expect("encode");
        assert!(bytes.ends_with(b",\n"));
        let body = &bytes[..bytes.len() - 2];
        assert!(!body.contains(&b'\n'));
    }

    #[test]
    fn encode_then_decode_preserves_fields() {
        let entry = sample_entry();
        let bytes = encode(&entry).expect("encode");
        let line = String::from_utf8(bytes).expect("utf8");
        let decoded = decode(line.trim_end_matches('\n')).expect("decode");
        assert_eq!(decoded, entry);
    }

    #[test]
    fn empty_optional_fields_are_omitted() {
        let entry = LogEntry::builder()
            .timestamp(Utc::now())
            .level(LogLevel::Info)
            .message("plain")
            .build()
            .expect("valid entry");
        let text = String::from_utf8(encode(&entry).expect("encode")).expect("utf8");
        assert!(!text.contains("params"));
        assert!(!text.contains("exception"));
    }

    #[test]
    fn file_contents_form_a_json_array() {
        let mut contents = Vec::new();
        for _ in 0..3 {
            contents.extend(encode(&sample_entry()).expect("encode"));
        }
        let text = String::from_utf8(contents).expect("utf8");
        let array = format!("[{}]", text.trim_end().trim_end_matches(','));
        let parsed: Vec<LogEntry> = serde_json::from_str(&array).expect("array");
        assert_eq!(parsed.len(), 3);
    }

    #[test]
    fn strict_decode_reports_failure() {
        let result = decode("not json at all");
        assert!(matches!(result, Err(LogError::Decode(msg)) if !msg.is_empty()));
    }

    #[test]
    fn lenient_decode_wraps_garbage() {
        let now = Utc::now();
        let entry = decode_lenient("{\"timestamp\": broken", now);
        assert_eq!(entry.timestamp, now);
        assert_eq!(entry.level, LogLevel::Error);
        assert!(!entry.message.is_empty());
        assert_eq!(
            entry.param(RAW_LINE_KEY),
            Some(&serde_json::json!("{\"timestamp\": broken"))
        );
    }

    #[test]
    fn lenient_decode_passes_valid_lines_through() {
        let entry = sample_entry();
        let line = String::from_utf8(encode(&entry).expect("encode")).expect("utf8");
        assert_eq!(decode_lenient(&line, Utc::now()), entry);
    }

    proptest! {
        #[test]
        fn prop_lenient_decode_never_panics(line in "[^\n]{0,200}") {
            let now = Utc::now();
            let entry = decode_lenient(&line, now);
            if decode(&line).is_err() {
                prop_assert_eq!(entry.level, LogLevel::Error);
                prop_assert_eq!(entry.param(RAW_LINE_KEY), Some(&serde_json::json!(line)));
            }
        }

        #[test]
        fn prop_round_trip_preserves_fields(
            nanos in 0i64..4_000_000_000_000_000_000,
            event_id in any::<i32>(),
            message in "\\PC{0,64}",
            exception in proptest::option::of("\\PC{0,32}"),
            keys in proptest::collection::vec("[a-z]{1,8}", 0..4),
        ) {
            let mut entry = LogEntry {
                timestamp: Utc.timestamp_nanos(nanos),
                level: LogLevel::Info,
                event_id,
                message,
                exception,
                params: Vec::new(),
            };
            for (i, key) in keys.into_iter().enumerate() {
                entry.params.push(LogParam::new(key, i));
            }
            let line = String::from_utf8(encode(&entry).expect("encode")).expect("utf8");
            prop_assert_eq!(decode(&line).expect("decode"), entry);
        }
    }
}
