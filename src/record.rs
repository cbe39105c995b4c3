//! Parsed CSV records
//!
//! A [`Record`] is one parsed data line: an ordered mapping from field name
//! (or stringified positional index) to string value, plus a validity flag.
//! A record is valid by default and is only marked invalid by the parser
//! when an attached validator rejects it.

use crate::{Error, Result};

/// One parsed data line
///
/// The key set is fixed at construction; only the validity flag mutates
/// afterwards, and only the parser does so.
#[derive(Debug, Clone)]
pub struct Record {
    fields: Vec<(String, String)>,
    is_valid: bool,
}

impl Record {
    /// Build a record by pairing header names with field values, in order
    ///
    /// Caller guarantees the lengths match; the parser enforces this before
    /// construction.
    pub fn with_header(header: &[String], values: Vec<String>) -> Self {
        let fields = header
            .iter()
            .cloned()
            .zip(values)
            .collect();

        Self {
            fields,
            is_valid: true,
        }
    }

    /// Build a record keyed by zero-based positional index
    pub fn positional(values: Vec<String>) -> Self {
        let fields = values
            .into_iter()
            .enumerate()
            .map(|(i, value)| (i.to_string(), value))
            .collect();

        Self {
            fields,
            is_valid: true,
        }
    }

    /// Get a field value by key
    ///
    /// Fails with [`Error::KeyNotFound`] if the key is absent; use
    /// [`Record::get_opt`] for a non-failing lookup.
    pub fn get(&self, key: &str) -> Result<&str> {
        self.get_opt(key)
            .ok_or_else(|| Error::key_not_found(key))
    }

    /// Get a field value by key, or `None` if absent
    pub fn get_opt(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The field pairs in original column order
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when the record holds no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Current validity flag
    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// Set the validity flag, returning the record for chaining
    pub fn set_is_valid(&mut self, is_valid: bool) -> &mut Self {
        self.is_valid = is_valid;

        self
    }
}
