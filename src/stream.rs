//! Line stream contract and implementations
//!
//! The parser consumes delimited text through the [`LineStream`] trait: one
//! already-tokenized row per call, with end-of-stream reporting and restart
//! support. Field splitting, quoting, and escaping are entirely the stream's
//! responsibility.
//!
//! Two implementations are provided:
//! - [`CsvStream`] reads CSV-encoded bytes through the csv crate, for files
//!   and other seekable readers
//! - [`MemoryStream`] serves pre-tokenized rows, useful for tests and for
//!   inputs that are already split into fields

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use csv::StringRecord;

use crate::{Error, Result};

/// A source of tokenized rows
///
/// `at_end` reflects byte exhaustion of the underlying source: it becomes
/// true immediately after the last row has been read, not one call later.
pub trait LineStream {
    /// Read the next row, or `None` at end-of-stream
    fn read_line(&mut self) -> Result<Option<Vec<String>>>;

    /// True when the source has no more rows to yield
    fn at_end(&self) -> bool;

    /// Reposition the source to its start
    fn rewind(&mut self) -> Result<()>;

    /// Zero-based index of the most recently read row
    fn line_index(&self) -> u64;

    /// True when the source can be read at all
    fn is_readable(&self) -> bool {
        true
    }
}

/// CSV-decoding stream over a seekable reader
///
/// Runs the csv crate in flexible mode so per-row field counts may vary;
/// field-count policy belongs to the parser, not the tokenizer. Note that
/// the csv crate skips blank lines itself, so this stream never yields an
/// empty row.
///
/// Holds a one-row read-ahead buffer so `at_end` turns true as soon as the
/// last row has been handed out.
#[derive(Debug)]
pub struct CsvStream<R: Read + Seek> {
    reader: csv::Reader<R>,
    next: Option<Result<Vec<String>>>,
    rows_read: u64,
}

impl CsvStream<File> {
    /// Open a CSV file as a line stream
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| Error::io(format!("failed to open {}", path.display()), e))?;

        Ok(Self::from_reader(file))
    }
}

impl<R: Read + Seek> CsvStream<R> {
    /// Wrap a seekable reader producing CSV-encoded bytes
    pub fn from_reader(reader: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut stream = Self {
            reader,
            next: None,
            rows_read: 0,
        };
        stream.fill();

        stream
    }

    /// Pull the next raw row into the read-ahead buffer
    fn fill(&mut self) {
        let mut row = StringRecord::new();
        self.next = match self.reader.read_record(&mut row) {
            Ok(true) => Some(Ok(row.iter().map(str::to_string).collect())),
            Ok(false) => None,
            Err(e) => Some(Err(Error::csv("failed to read row", e))),
        };
    }
}

impl<R: Read + Seek> LineStream for CsvStream<R> {
    fn read_line(&mut self) -> Result<Option<Vec<String>>> {
        match self.next.take() {
            Some(row) => {
                self.rows_read += 1;
                self.fill();
                row.map(Some)
            }
            None => Ok(None),
        }
    }

    fn at_end(&self) -> bool {
        self.next.is_none()
    }

    fn rewind(&mut self) -> Result<()> {
        self.reader
            .seek(csv::Position::new())
            .map_err(|e| Error::csv("failed to rewind stream", e))?;
        self.rows_read = 0;
        self.fill();

        Ok(())
    }

    fn line_index(&self) -> u64 {
        self.rows_read.saturating_sub(1)
    }
}

/// In-memory stream of pre-tokenized rows
///
/// Unlike [`CsvStream`], this can yield empty rows (blank lines), which the
/// parser treats as absent records.
pub struct MemoryStream {
    rows: Vec<Vec<String>>,
    position: usize,
    readable: bool,
}

impl MemoryStream {
    /// Build a stream from tokenized rows
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self {
            rows,
            position: 0,
            readable: true,
        }
    }

    /// Build a stream by naively splitting each line on commas
    ///
    /// No quoting or escaping; intended for simple inputs and tests. Use
    /// [`CsvStream`] for real CSV encoding.
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        let rows = lines
            .iter()
            .map(|line| {
                let line = line.as_ref();
                if line.is_empty() {
                    Vec::new()
                } else {
                    line.split(',').map(str::to_string).collect()
                }
            })
            .collect();

        Self::new(rows)
    }

    /// Mark the stream unreadable, making `run` refuse it
    pub fn set_readable(&mut self, readable: bool) -> &mut Self {
        self.readable = readable;

        self
    }
}

impl LineStream for MemoryStream {
    fn read_line(&mut self) -> Result<Option<Vec<String>>> {
        match self.rows.get(self.position) {
            Some(row) => {
                self.position += 1;
                Ok(Some(row.clone()))
            }
            None => Ok(None),
        }
    }

    fn at_end(&self) -> bool {
        self.position >= self.rows.len()
    }

    fn rewind(&mut self) -> Result<()> {
        self.position = 0;

        Ok(())
    }

    fn line_index(&self) -> u64 {
        (self.position.saturating_sub(1)) as u64
    }

    fn is_readable(&self) -> bool {
        self.readable
    }
}
