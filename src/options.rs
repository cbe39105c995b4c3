//! Parser configuration
//!
//! A flat option set recognized by the parser. The external key names are
//! camelCase (`hasHeader`, `stopWhenError`, `skipFirstLine`); unrecognized
//! keys in a deserialized document are ignored.

use serde::{Deserialize, Serialize};

/// Configuration for a parser run
///
/// Fixed after parser construction, except that an explicit
/// [`Parser::set_header`](crate::Parser::set_header) marks the header as
/// present.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParserOptions {
    /// Treat the first line of the stream as a header (default: true)
    pub has_header: bool,

    /// Abort on malformed rows and failed validations instead of skipping
    /// them (default: true)
    pub stop_when_error: bool,

    /// Discard the first data line after header consumption (default: false)
    pub skip_first_line: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            has_header: true,
            stop_when_error: true,
            skip_first_line: false,
        }
    }
}
