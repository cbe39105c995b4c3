//! Row handler contract
//!
//! The parser reports each record's outcome to an optional, caller-supplied
//! observer. All notifications are fire-and-forget; the parser never
//! inspects a return value.

use crate::record::Record;

/// Observer of parsing outcomes
pub trait RowHandler {
    /// A record parsed and passed validation (or no validator is attached)
    fn success(&mut self, record: &Record);

    /// A record failed validation (only reached when the parser is not
    /// configured to stop on errors)
    fn failure(&mut self, record: &Record);

    /// The stream has been fully consumed; called exactly once per `run`
    fn end_of_stream(&mut self);
}
