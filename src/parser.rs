//! Core parsing state machine
//!
//! [`Parser`] orchestrates header detection, line-to-record construction,
//! validation dispatch, and handler notification over a [`LineStream`]. It
//! exposes two entry points over one shared read step: a pull-style cursor
//! (`current`/`next`/`key`/`valid`, or `read_line` directly) and a
//! push-style [`Parser::run`] that drives the whole stream through the
//! attached row handler.
//!
//! A parser instance is single-threaded: one stream, no internal locking.
//! The stream resource stays owned by the caller; the parser only reads and
//! repositions it.

use tracing::{debug, info, warn};

use crate::handler::RowHandler;
use crate::options::ParserOptions;
use crate::record::Record;
use crate::stream::LineStream;
use crate::validator::Validator;
use crate::{Error, Result};

/// Streaming CSV parser
///
/// Reads a stream one line at a time, builds a [`Record`] per data line, and
/// reports each outcome. The validator and row handler are both optional:
/// without a validator every record counts as valid, and without a handler
/// the notifications are simply not sent.
pub struct Parser<S: LineStream> {
    stream: S,
    options: ParserOptions,
    header: Option<Vec<String>>,
    validator: Option<Validator>,
    handler: Option<Box<dyn RowHandler>>,
    current: Option<Record>,
    skipped_first: bool,
}

impl<S: LineStream> Parser<S> {
    /// Bind a stream with the given options; reads nothing yet
    pub fn new(stream: S, options: ParserOptions) -> Self {
        Self {
            stream,
            options,
            header: None,
            validator: None,
            handler: None,
            current: None,
            skipped_first: false,
        }
    }

    /// Attach a validator, returning the parser for chaining
    pub fn set_validator(&mut self, validator: Validator) -> &mut Self {
        self.validator = Some(validator);

        self
    }

    /// Attach a row handler, returning the parser for chaining
    pub fn set_row_handler(&mut self, handler: impl RowHandler + 'static) -> &mut Self {
        self.handler = Some(Box::new(handler));

        self
    }

    /// Install a header explicitly, overriding automatic detection
    ///
    /// Also marks the stream as having a header, so field counts are checked
    /// against it from the first data line on.
    pub fn set_header(&mut self, header: Vec<String>) -> &mut Self {
        self.options.has_header = true;
        self.header = Some(header);

        self
    }

    /// Reposition the stream to its start and clear the lookahead slot
    ///
    /// Configuration and an already-captured header survive a rewind.
    pub fn rewind(&mut self) -> Result<()> {
        self.stream.rewind()?;
        self.current = None;
        self.skipped_first = false;

        Ok(())
    }

    /// True when the underlying stream has no more rows
    ///
    /// Reflects stream exhaustion, not "no more records": a lookahead record
    /// may still be pending after the stream itself hits its end.
    pub fn eof(&self) -> bool {
        self.stream.at_end()
    }

    /// Read the next data line and build a record from it
    ///
    /// Captures the header first if one is expected and not yet installed.
    /// Returns `None` for the skipped first data line, for blank lines, and
    /// at end-of-stream. Malformed rows (field count differing from the
    /// header) and failed validations are fatal under the stop-on-error
    /// policy; otherwise malformed rows are skipped in place and failed
    /// records are routed to the handler's failure notification.
    pub fn read_line(&mut self) -> Result<Option<Record>> {
        self.ensure_header()?;

        let fields = loop {
            let Some(raw) = self.stream.read_line()? else {
                return Ok(None);
            };

            if self.options.skip_first_line && !self.skipped_first {
                self.skipped_first = true;
                debug!(line = self.stream.line_index(), "skipping first data line");
                return Ok(None);
            }

            if raw.is_empty() {
                return Ok(None);
            }

            match &self.header {
                Some(header) if header.len() != raw.len() => {
                    if self.options.stop_when_error {
                        return Err(Error::malformed_row(
                            self.stream.line_index(),
                            header.len(),
                            raw.len(),
                        ));
                    }

                    warn!(
                        line = self.stream.line_index(),
                        expected = header.len(),
                        found = raw.len(),
                        "skipping row with mismatched field count"
                    );
                }
                _ => break raw,
            }
        };

        let mut record = match &self.header {
            Some(header) => Record::with_header(header, fields),
            None => Record::positional(fields),
        };
        self.dispatch(&mut record)?;

        Ok(Some(record))
    }

    /// Run the parser to end-of-stream, reporting through the row handler
    ///
    /// Rewinds first, then repeats the read step until the stream is
    /// exhausted, and finally sends the handler its end-of-stream
    /// notification. Push-only: records are observed through the handler,
    /// not returned.
    pub fn run(&mut self) -> Result<()> {
        if !self.stream.is_readable() {
            return Err(Error::stream_not_readable("cannot run parser"));
        }

        self.rewind()?;

        let mut records = 0u64;
        while !self.eof() {
            if self.read_line()?.is_some() {
                records += 1;
            }
        }

        info!(records, "stream fully parsed");

        if let Some(handler) = self.handler.as_mut() {
            handler.end_of_stream();
        }

        Ok(())
    }

    /// The record under the cursor, reading ahead if the slot is empty
    pub fn current(&mut self) -> Result<Option<&Record>> {
        if self.current.is_none() {
            self.current = self.read_line()?;
        }

        Ok(self.current.as_ref())
    }

    /// Advance the cursor, replacing the lookahead record with the next one
    pub fn next(&mut self) -> Result<()> {
        self.current = self.read_line()?;

        Ok(())
    }

    /// Index of the stream's most recently read line
    pub fn key(&self) -> u64 {
        self.stream.line_index()
    }

    /// True while records can still be observed
    ///
    /// Covers the final record sitting in the lookahead slot after the
    /// stream itself reports end-of-stream.
    pub fn valid(&self) -> bool {
        !self.eof() || self.current.is_some()
    }

    /// Capture the header row if one is expected and none is installed yet
    ///
    /// Consumes exactly one line, whatever its content; blank lines are not
    /// skipped before header capture.
    fn ensure_header(&mut self) -> Result<()> {
        if self.options.has_header && self.header.is_none() {
            if let Some(row) = self.stream.read_line()? {
                debug!(fields = row.len(), "captured header row");
                self.header = Some(row);
            }
        }

        Ok(())
    }

    /// Validate a record and notify the handler of the outcome
    fn dispatch(&mut self, record: &mut Record) -> Result<()> {
        let passed = match &self.validator {
            Some(validator) => validator.is_valid(record),
            None => true,
        };

        if passed {
            if let Some(handler) = self.handler.as_mut() {
                handler.success(record);
            }

            return Ok(());
        }

        record.set_is_valid(false);

        if self.options.stop_when_error {
            return Err(Error::invalid_record(self.stream.line_index()));
        }

        if let Some(handler) = self.handler.as_mut() {
            handler.failure(record);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::stream::MemoryStream;
    use crate::validator::{MessageResolver, RuleEngine, RuleSet};

    /// Engine that passes a record iff, for every rule entry, the named
    /// field's value is one of the listed expressions
    struct FieldEquals;

    impl RuleEngine for FieldEquals {
        fn evaluate(
            &self,
            fields: &[(String, String)],
            rules: &RuleSet,
            _messages: &dyn MessageResolver,
        ) -> bool {
            rules.iter().all(|(key, allowed)| {
                fields
                    .iter()
                    .any(|(k, v)| k == key && allowed.contains(v))
            })
        }
    }

    fn reject_unless(field: &str, value: &str) -> Validator {
        let mut rules = RuleSet::new();
        rules.insert(field.to_string(), vec![value.to_string()]);

        Validator::new(rules, Box::new(FieldEquals))
    }

    /// Handler that records every notification as a readable event string
    #[derive(Clone, Default)]
    struct RecordingHandler {
        events: Rc<RefCell<Vec<String>>>,
    }

    impl RecordingHandler {
        fn events(&self) -> Vec<String> {
            self.events.borrow().clone()
        }
    }

    impl RowHandler for RecordingHandler {
        fn success(&mut self, record: &Record) {
            let values: Vec<&str> = record.fields().iter().map(|(_, v)| v.as_str()).collect();
            self.events
                .borrow_mut()
                .push(format!("success:{}", values.join(",")));
        }

        fn failure(&mut self, record: &Record) {
            let values: Vec<&str> = record.fields().iter().map(|(_, v)| v.as_str()).collect();
            self.events
                .borrow_mut()
                .push(format!("failure:{}", values.join(",")));
        }

        fn end_of_stream(&mut self) {
            self.events.borrow_mut().push("end_of_stream".to_string());
        }
    }

    fn options(has_header: bool, stop_when_error: bool, skip_first_line: bool) -> ParserOptions {
        ParserOptions {
            has_header,
            stop_when_error,
            skip_first_line,
        }
    }

    fn collect(parser: &mut Parser<MemoryStream>) -> Vec<Record> {
        let mut records = Vec::new();
        while !parser.eof() {
            if let Some(record) = parser.read_line().unwrap() {
                records.push(record);
            }
        }

        records
    }

    #[test]
    fn test_header_detection_and_record_keys() {
        let stream = MemoryStream::from_lines(&["h1,h2,h3", "a,b,c", "d,e,f"]);
        let mut parser = Parser::new(stream, ParserOptions::default());

        let records = collect(&mut parser);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("h1").unwrap(), "a");
        assert_eq!(records[0].get("h2").unwrap(), "b");
        assert_eq!(records[0].get("h3").unwrap(), "c");
        assert_eq!(records[1].get("h1").unwrap(), "d");
        assert_eq!(records[1].get("h3").unwrap(), "f");
    }

    #[test]
    fn test_no_header_positional_keys_and_varying_counts() {
        let stream = MemoryStream::from_lines(&["a,b", "c,d,e"]);
        let mut parser = Parser::new(stream, options(false, false, false));

        let records = collect(&mut parser);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("0").unwrap(), "a");
        assert_eq!(records[0].get("1").unwrap(), "b");
        assert_eq!(records[1].get("0").unwrap(), "c");
        assert_eq!(records[1].get("2").unwrap(), "e");
    }

    #[test]
    fn test_no_header_field_count_variance_with_stop_on_error() {
        // mismatch checks only apply when a header is active
        let stream = MemoryStream::from_lines(&["a,b", "c,d,e"]);
        let mut parser = Parser::new(stream, options(false, true, false));

        assert_eq!(collect(&mut parser).len(), 2);
    }

    #[test]
    fn test_explicit_header_matches_auto_detection() {
        let stream = MemoryStream::from_lines(&["h1,h2", "a,b"]);
        let mut auto = Parser::new(stream, ParserOptions::default());
        let auto_records = collect(&mut auto);

        let stream = MemoryStream::from_lines(&["a,b"]);
        let mut explicit = Parser::new(stream, options(false, true, false));
        explicit.set_header(vec!["h1".to_string(), "h2".to_string()]);
        let explicit_records = collect(&mut explicit);

        assert_eq!(auto_records.len(), explicit_records.len());
        assert_eq!(auto_records[0].fields(), explicit_records[0].fields());
    }

    #[test]
    fn test_skip_first_data_line_after_header() {
        let stream = MemoryStream::from_lines(&["h1,h2", "a,b", "c,d"]);
        let mut parser = Parser::new(stream, options(true, true, true));

        let records = collect(&mut parser);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("h1").unwrap(), "c");
    }

    #[test]
    fn test_skip_first_line_without_header() {
        let stream = MemoryStream::from_lines(&["a,b", "c,d"]);
        let mut parser = Parser::new(stream, options(false, true, true));

        let records = collect(&mut parser);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("0").unwrap(), "c");
    }

    #[test]
    fn test_skip_first_line_drops_exactly_one_regardless_of_content() {
        // even a malformed first data line is discarded by the skip, not
        // reported as an error
        let stream = MemoryStream::from_lines(&["h1,h2", "only-one-field", "c,d"]);
        let mut parser = Parser::new(stream, options(true, true, true));

        let records = collect(&mut parser);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("h2").unwrap(), "d");
    }

    #[test]
    fn test_blank_line_yields_no_record() {
        let stream = MemoryStream::from_lines(&["h1,h2", "a,b", "", "c,d"]);
        let mut parser = Parser::new(stream, ParserOptions::default());

        let records = collect(&mut parser);

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("h1").unwrap(), "c");
    }

    #[test]
    fn test_blank_first_line_becomes_header() {
        // header capture consumes exactly one line, blank or not
        let stream = MemoryStream::from_lines(&["", "a,b"]);
        let mut parser = Parser::new(stream, options(true, false, false));

        // the data line can never match the empty header, so it is skipped
        assert!(collect(&mut parser).is_empty());
    }

    #[test]
    fn test_malformed_row_fatal_when_stopping_on_error() {
        let stream = MemoryStream::from_lines(&["h1,h2", "a,b", "c,d,e", "f,g"]);
        let mut parser = Parser::new(stream, ParserOptions::default());

        assert_eq!(
            parser.read_line().unwrap().unwrap().get("h1").unwrap(),
            "a"
        );

        let err = parser.read_line().unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedRow {
                expected: 2,
                found: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_malformed_row_skipped_when_not_stopping() {
        let stream = MemoryStream::from_lines(&["h1,h2", "a,b", "c,d,e", "f,g"]);
        let mut parser = Parser::new(stream, options(true, false, false));

        let records = collect(&mut parser);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("h1").unwrap(), "a");
        assert_eq!(records[1].get("h1").unwrap(), "f");
    }

    #[test]
    fn test_validator_dispatch_and_validity_flag() {
        let stream = MemoryStream::from_lines(&["h1,h2,h3", "a,b,c", "d,e,f"]);
        let handler = RecordingHandler::default();
        let mut parser = Parser::new(stream, options(true, false, false));
        parser
            .set_validator(reject_unless("h2", "b"))
            .set_row_handler(handler.clone());

        let records = collect(&mut parser);

        assert_eq!(handler.events(), vec!["success:a,b,c", "failure:d,e,f"]);
        assert!(records[0].is_valid());
        assert!(!records[1].is_valid());
    }

    #[test]
    fn test_failed_validation_fatal_when_stopping_on_error() {
        let stream = MemoryStream::from_lines(&["h1,h2", "a,x"]);
        let handler = RecordingHandler::default();
        let mut parser = Parser::new(stream, ParserOptions::default());
        parser
            .set_validator(reject_unless("h2", "b"))
            .set_row_handler(handler.clone());

        let err = parser.read_line().unwrap_err();

        assert!(matches!(err, Error::InvalidRecord { .. }));
        // the failure notification is replaced by the error, not sent
        assert!(handler.events().is_empty());
    }

    #[test]
    fn test_no_validator_treats_every_record_as_success() {
        let stream = MemoryStream::from_lines(&["h1,h2", "a,b", "c,d"]);
        let handler = RecordingHandler::default();
        let mut parser = Parser::new(stream, ParserOptions::default());
        parser.set_row_handler(handler.clone());

        collect(&mut parser);

        assert_eq!(handler.events(), vec!["success:a,b", "success:c,d"]);
    }

    #[test]
    fn test_run_notifies_end_of_stream_once() {
        let stream = MemoryStream::from_lines(&["h1,h2", "a,b", "c,d"]);
        let handler = RecordingHandler::default();
        let mut parser = Parser::new(stream, ParserOptions::default());
        parser.set_row_handler(handler.clone());

        parser.run().unwrap();

        assert_eq!(
            handler.events(),
            vec!["success:a,b", "success:c,d", "end_of_stream"]
        );
    }

    #[test]
    fn test_run_fails_on_unreadable_stream() {
        let mut stream = MemoryStream::from_lines(&["a,b"]);
        stream.set_readable(false);
        let mut parser = Parser::new(stream, ParserOptions::default());

        let err = parser.run().unwrap_err();
        assert!(matches!(err, Error::StreamNotReadable { .. }));
    }

    #[test]
    fn test_run_propagates_malformed_row() {
        let stream = MemoryStream::from_lines(&["h1,h2", "a,b,c"]);
        let handler = RecordingHandler::default();
        let mut parser = Parser::new(stream, ParserOptions::default());
        parser.set_row_handler(handler.clone());

        assert!(parser.run().is_err());
        // aborted runs send no end-of-stream notification
        assert!(handler.events().is_empty());
    }

    #[test]
    fn test_pull_cursor_iteration() {
        let stream = MemoryStream::from_lines(&["h1,h2", "a,b", "c,d"]);
        let mut parser = Parser::new(stream, ParserOptions::default());
        parser.rewind().unwrap();

        let mut values = Vec::new();
        while parser.valid() {
            if let Some(record) = parser.current().unwrap() {
                values.push(record.get("h1").unwrap().to_string());
            }
            parser.next().unwrap();
        }

        assert_eq!(values, vec!["a", "c"]);
    }

    #[test]
    fn test_lookahead_keeps_cursor_valid_at_stream_end() {
        let stream = MemoryStream::from_lines(&["h1,h2", "a,b"]);
        let mut parser = Parser::new(stream, ParserOptions::default());

        // reading the only data line exhausts the stream, but the record
        // still sits in the lookahead slot
        parser.current().unwrap();
        assert!(parser.eof());
        assert!(parser.valid());

        parser.next().unwrap();
        assert!(!parser.valid());
    }

    #[test]
    fn test_rewind_clears_lookahead_and_skip_state() {
        let stream = MemoryStream::from_lines(&["a,b", "c,d"]);
        let mut parser = Parser::new(stream, options(false, true, true));

        let first_pass = collect(&mut parser);
        assert_eq!(first_pass.len(), 1);

        parser.rewind().unwrap();
        let second_pass = collect(&mut parser);

        // the skip applies again after a rewind
        assert_eq!(second_pass.len(), 1);
        assert_eq!(second_pass[0].get("0").unwrap(), "c");
    }
}
