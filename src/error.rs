//! Error types and the per-reader error aggregator.
//!
//! Decoding a VCF stream is lenient: most problems found inside a record are
//! collected in an [`ErrorAggregator`] while the stream keeps producing
//! records. Only header problems that make the stream unusable are returned
//! as hard errors.

use std::collections::HashSet;
use std::fmt;

use itertools::Itertools;
use thiserror::Error;

use crate::types::{FieldNumber, FieldType};

/// Entries an [`ErrorAggregator`] keeps before truncating.
pub const DEFAULT_ERROR_CAPACITY: usize = 5000;

#[derive(Debug, Error)]
pub enum VcfError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Niffler(#[from] niffler::Error),

    #[error("file format error: expected '##fileformat=VCFv<version>', found '{line}'")]
    MissingFileFormat { line: String },

    #[error("unexpected header line {line_number}: '{line}'")]
    UnexpectedHeaderLine { line_number: u64, line: String },

    #[error("malformed #CHROM line: expected at least 8 columns, found {columns}")]
    MalformedColumnHeader { columns: usize },

    #[error("header syntax error ({reason}): {line}")]
    HeaderSyntax { line: String, reason: String },

    #[error("not enough fields for a VCF record: expected at least {expected}, found {found}")]
    TooFewFields { expected: usize, found: usize },

    #[error("invalid {field} '{value}'")]
    InvalidNumber { field: &'static str, value: String },

    #[error("value '{value}' is not a valid {kind}")]
    TypeMismatch { kind: FieldType, value: String },

    #[error("flag field ({key}) had value '{value}'")]
    FlagWithValue { key: String, value: String },

    #[error("invalid INFO token '{key}={value}'")]
    InvalidInfoToken { key: String, value: String },

    #[error("{key} not found in header")]
    NotDeclared { key: String },

    #[error("{key} not found")]
    NotFound { key: String },

    #[error("number of fields ({found}) does not match expected ({expected}) in '{value}'")]
    LengthMismatch {
        expected: usize,
        found: usize,
        value: String,
    },

    #[error("invalid genotype allele '{token}'")]
    InvalidGenotype { token: String },

    #[error("bad sample string '{sample}': expected {expected} fields, found {found}")]
    FieldCount {
        sample: String,
        expected: usize,
        found: usize,
    },

    #[error("expected {expected} samples, found {found}")]
    SampleCount { expected: usize, found: usize },

    #[error("{key} reported as float '{value}', rounded to integer")]
    PrecisionLoss { key: String, value: String },

    #[error("no SVLEN or END for symbolic allele at {chrom}:{pos}")]
    UnresolvedSvEnd { chrom: String, pos: u64 },

    #[error("cannot decompose {key} (Number={number}): expected {expected} values, found {found}")]
    Decomposition {
        key: String,
        number: FieldNumber,
        expected: usize,
        found: usize,
    },

    #[error("missing value {missing} does not fit {kind} field {key}")]
    UnsupportedMissing {
        key: String,
        kind: FieldType,
        missing: String,
    },
}

impl VcfError {
    /// Warning-class errors describe a value that was repaired rather than lost.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            VcfError::PrecisionLoss { .. } | VcfError::UnresolvedSvEnd { .. }
        )
    }
}

/// A best-effort result: `value` is always usable, `errors` are informational.
#[derive(Debug)]
pub struct Decoded<T> {
    pub value: T,
    pub errors: Vec<VcfError>,
}

impl<T> Decoded<T> {
    pub fn ok(value: T) -> Self {
        Decoded {
            value,
            errors: Vec::new(),
        }
    }

    pub fn with_error(value: T, error: VcfError) -> Self {
        Decoded {
            value,
            errors: vec![error],
        }
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Decoded<U> {
        Decoded {
            value: f(self.value),
            errors: self.errors,
        }
    }

    /// Strict view: the first recorded error, if any, wins over the value.
    pub fn into_result(self) -> Result<T, VcfError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(error),
            None => Ok(self.value),
        }
    }

    /// Moves the errors into `sink`, returning the value.
    pub fn drain_into(self, sink: &mut Vec<VcfError>) -> T {
        sink.extend(self.errors);
        self.value
    }
}

/// Collects recoverable errors as `(message, line)` pairs.
///
/// Messages are de-duplicated on their exact text; a repeated message keeps
/// the line of its first occurrence. When more than `capacity` entries are
/// held, the oldest third is dropped.
#[derive(Debug, Clone)]
pub struct ErrorAggregator {
    entries: Vec<(String, u64)>,
    seen: HashSet<String>,
    capacity: usize,
}

impl Default for ErrorAggregator {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_ERROR_CAPACITY)
    }
}

impl ErrorAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        ErrorAggregator {
            entries: Vec::new(),
            seen: HashSet::new(),
            capacity: capacity.max(3),
        }
    }

    pub fn add<M: ToString>(&mut self, message: M, line: u64) {
        let message = message.to_string();
        if message.is_empty() || self.seen.contains(&message) {
            return;
        }
        log::trace!("line {}: {}", line, message);
        self.seen.insert(message.clone());
        self.entries.push((message, line));
        if self.entries.len() > self.capacity {
            let dropped = self.capacity / 3;
            log::warn!(
                "more than {} distinct errors collected, dropping the oldest {}",
                self.capacity,
                dropped
            );
            for (message, _) in self.entries.drain(..dropped) {
                self.seen.remove(&message);
            }
        }
    }

    pub fn extend<I: IntoIterator<Item = VcfError>>(&mut self, errors: I, line: u64) {
        for error in errors {
            self.add(error, line);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.seen.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(m, l)| (m.as_str(), *l))
    }

    /// One `"<message>. [line: <n>]"` line per distinct message.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|(message, line)| format!("{}. [line: {}]", message, line))
            .join("\n")
    }
}

impl fmt::Display for ErrorAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl std::error::Error for ErrorAggregator {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_keeps_first_line() {
        let mut errors = ErrorAggregator::new();
        assert!(errors.is_empty());
        errors.add(VcfError::InvalidGenotype { token: "x".into() }, 12);
        errors.add(VcfError::InvalidGenotype { token: "x".into() }, 40);
        assert!(!errors.is_empty());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.render(), "invalid genotype allele 'x'. [line: 12]");
    }

    #[test]
    fn test_empty_message_is_ignored() {
        let mut errors = ErrorAggregator::new();
        errors.add("", 1);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_render_order_and_clear() {
        let mut errors = ErrorAggregator::new();
        errors.add("b", 2);
        errors.add("a", 3);
        errors.add("b", 4);
        assert_eq!(errors.to_string(), "b. [line: 2]\na. [line: 3]");
        errors.clear();
        assert!(errors.is_empty());
        errors.add("b", 9);
        assert_eq!(errors.render(), "b. [line: 9]");
    }

    #[test]
    fn test_capacity_keeps_recent_window() {
        let mut errors = ErrorAggregator::with_capacity(9);
        for i in 0..10 {
            errors.add(format!("error {}", i), i);
        }
        // the tenth entry overflowed, so the three oldest were dropped
        assert_eq!(errors.len(), 7);
        assert_eq!(errors.iter().next(), Some(("error 3", 3)));
        assert_eq!(errors.iter().last(), Some(("error 9", 9)));
        // dropped messages may be recorded again
        errors.add("error 0", 20);
        assert_eq!(errors.iter().last(), Some(("error 0", 20)));
    }

    #[test]
    fn test_decoded_into_result() {
        let clean: Decoded<i32> = Decoded::ok(1);
        assert!(clean.is_clean());
        assert_eq!(clean.into_result().unwrap(), 1);
        let dirty = Decoded::with_error(1, VcfError::NotFound { key: "X".into() });
        assert!(matches!(dirty.into_result(), Err(VcfError::NotFound { .. })));
    }

    #[test]
    fn test_warning_class() {
        let warning = VcfError::UnresolvedSvEnd {
            chrom: "1".into(),
            pos: 10,
        };
        assert!(warning.is_warning());
        assert!(!VcfError::NotFound { key: "X".into() }.is_warning());
    }
}
