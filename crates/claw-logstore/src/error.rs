//! Error types for the log persistence layer.

use thiserror::Error;

/// Errors that can occur while configuring, writing or reading logs.
#[derive(Debug, Error)]
pub enum LogError {
    /// The manager configuration is unusable (blank or unwritable directory).
    #[error("configuration error: {0}")]
    Config(String),

    /// A required field was not provided.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Serialization of a record failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored record could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The manager has been shut down.
    #[error("log manager is shut down")]
    Closed,

    /// The background writer thread is no longer running.
    #[error("log writer thread is not running")]
    WorkerStopped,
}

/// Result type alias for log operations.
pub type Result<T> = std::result::Result<T, LogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = LogError::Config("directory cannot be blank".to_string());
        assert_eq!(
            err.to_string(),
            "configuration error: directory cannot be blank"
        );

        let err = LogError::MissingField("timestamp");
        assert_eq!(err.to_string(), "missing required field: timestamp");

        let err = LogError::Decode("expected value".to_string());
        assert_eq!(err.to_string(), "decode error: expected value");

        let err = LogError::Closed;
        assert_eq!(err.to_string(), "log manager is shut down");

        let err = LogError::WorkerStopped;
        assert_eq!(err.to_string(), "log writer thread is not running");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LogError>();
    }

    #[test]
    fn error_io_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: LogError = io_err.into();
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn error_serialization_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").err();
        assert!(json_err.is_some());
        if let Some(json_err) = json_err {
            let err: LogError = json_err.into();
            assert!(err.to_string().starts_with("serialization error"));
        }
    }

    #[test]
    fn error_debug_format_all_variants() {
        let errors = vec![
            LogError::Config("test".to_string()),
            LogError::MissingField("test"),
            LogError::Decode("test".to_string()),
            LogError::Closed,
            LogError::WorkerStopped,
        ];

        for err in errors {
            let debug = format!("{err:?}");
            assert!(!debug.is_empty());
        }
    }
}
