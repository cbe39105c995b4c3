//! Streaming CSV Parser Library
//!
//! A Rust library for incrementally reading delimited text, turning each raw
//! line into a structured record, optionally validating it against a rule
//! set, and forwarding the outcome to a caller-supplied handler.
//!
//! This library provides tools for:
//! - Pull-based iteration (read one record at a time) over a line stream
//! - Push-based parsing (`run`) that drives the whole stream through a
//!   row handler
//! - Automatic or explicit header handling with per-line field-count checks
//! - A stop-on-error / skip-on-error policy for malformed and invalid rows
//! - Pluggable validation behind a small rule-engine contract

pub mod handler;
pub mod options;
pub mod parser;
pub mod record;
pub mod stream;
pub mod validator;

// Re-export commonly used types
pub use handler::RowHandler;
pub use options::ParserOptions;
pub use parser::Parser;
pub use record::Record;
pub use stream::{CsvStream, LineStream, MemoryStream};
pub use validator::{EchoResolver, MessageResolver, RuleEngine, RuleSet, Validator};

/// Result type alias for CSV stream parsing
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for CSV stream parsing operations
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Low-level CSV decoding error from the underlying reader
    #[error("CSV error: {message}")]
    Csv {
        message: String,
        #[source]
        source: csv::Error,
    },

    /// The underlying stream cannot be read at all
    #[error("stream is not readable: {message}")]
    StreamNotReadable { message: String },

    /// A data line's field count does not match the active header
    #[error("malformed row at line {line}: expected {expected} fields, found {found}")]
    MalformedRow {
        line: u64,
        expected: usize,
        found: usize,
    },

    /// A record failed validation under the stop-on-error policy
    #[error("invalid record at line {line}")]
    InvalidRecord { line: u64 },

    /// A requested field is not present in a record
    #[error("field not found: {key}")]
    KeyNotFound { key: String },
}

impl Error {
    /// Create an I/O error with context
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a CSV decoding error with context
    pub fn csv(message: impl Into<String>, source: csv::Error) -> Self {
        Self::Csv {
            message: message.into(),
            source,
        }
    }

    /// Create a stream-not-readable error
    pub fn stream_not_readable(message: impl Into<String>) -> Self {
        Self::StreamNotReadable {
            message: message.into(),
        }
    }

    /// Create a malformed-row error
    pub fn malformed_row(line: u64, expected: usize, found: usize) -> Self {
        Self::MalformedRow {
            line,
            expected,
            found,
        }
    }

    /// Create an invalid-record error
    pub fn invalid_record(line: u64) -> Self {
        Self::InvalidRecord { line }
    }

    /// Create a key-not-found error
    pub fn key_not_found(key: impl Into<String>) -> Self {
        Self::KeyNotFound { key: key.into() }
    }
}

// Automatic conversions from common error types
impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: "I/O operation failed".to_string(),
            source: error,
        }
    }
}

impl From<csv::Error> for Error {
    fn from(error: csv::Error) -> Self {
        Self::Csv {
            message: "CSV decoding failed".to_string(),
            source: error,
        }
    }
}
