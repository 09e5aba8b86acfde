//! Cypher statement errors
//!
//! - [`EncodeError`]: a statement could not be turned into its wire form.
//! - [`DecodeError`]: a tabular result could not be reassembled into the
//!   caller's type. Always client-local.
//! - [`StatementError`] / [`StatementErrors`]: the server rejected individual
//!   statements inside an otherwise successful exchange.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Statement could not be encoded for the wire
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("statement text is empty")]
    EmptyStatement,

    #[error("parameter '{name}' is not representable as JSON: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("parameters must encode to a JSON object, got {0}")]
    ParametersNotObject(&'static str),

    /// Batch job body could not be serialized
    #[error("job body is not representable as JSON: {reason}")]
    InvalidBody { reason: String },
}

/// Tabular result could not be decoded into the requested type
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Row cell count differs from the column count
    #[error("row {row} has {found} cells but there are {expected} columns")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// Scalar decoding needs exactly one column
    #[error("single-column decode requested but the result has {found} columns")]
    ColumnCount { found: usize },

    /// A row did not fit the target type
    #[error("row {row} does not match target type: {message}")]
    Type { row: usize, message: String },

    /// A batch job body did not fit the target type
    #[error("job {job} body does not match target type: {message}")]
    Body { job: usize, message: String },

    /// Result accessed before the statement was executed
    #[error("statement has not been executed")]
    NotExecuted,
}

/// One statement rejected by the server.
///
/// `statement` is the position of the failing statement within the call that
/// produced the error, or `None` when the server reported the failure for the
/// exchange as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementError {
    #[serde(default, skip_deserializing)]
    pub statement: Option<usize>,
    #[serde(default, deserialize_with = "lenient_code")]
    pub code: i64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
}

impl StatementError {
    pub fn new(code: i64, status: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            statement: None,
            code,
            status: status.into(),
            message: message.into(),
        }
    }

    /// Attributes the error to the statement at `index`
    pub fn at(mut self, index: usize) -> Self {
        self.statement = Some(index);
        self
    }
}

impl fmt::Display for StatementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.statement {
            Some(i) => write!(f, "statement {}: ", i)?,
            None => write!(f, "transaction: ")?,
        }
        if self.status.is_empty() {
            write!(f, "{} (code {})", self.message, self.code)
        } else {
            write!(f, "[{}] {} (code {})", self.status, self.message, self.code)
        }
    }
}

// Servers have sent numeric codes, numeric strings and symbolic strings.
fn lenient_code<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_i64().unwrap_or_default(),
        Value::String(s) => s.trim().parse().unwrap_or_default(),
        _ => 0,
    })
}

/// Every statement error reported by one call, in server order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementErrors(Vec<StatementError>);

impl StatementErrors {
    pub fn new(errors: Vec<StatementError>) -> Self {
        Self(errors)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StatementError> {
        self.0.iter()
    }

    /// Errors attributed to the statement at `index`
    pub fn for_statement(&self, index: usize) -> impl Iterator<Item = &StatementError> {
        self.0.iter().filter(move |e| e.statement == Some(index))
    }

    /// Positions of the statements that failed, ascending, no duplicates
    pub fn failed_statements(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.0.iter().filter_map(|e| e.statement).collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    pub fn into_vec(self) -> Vec<StatementError> {
        self.0
    }
}

impl fmt::Display for StatementErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} statement error(s)", self.0.len())?;
        if let Some(first) = self.0.first() {
            write!(f, ", first: {}", first)?;
        }
        Ok(())
    }
}

impl std::error::Error for StatementErrors {}

impl<'a> IntoIterator for &'a StatementErrors {
    type Item = &'a StatementError;
    type IntoIter = std::slice::Iter<'a, StatementError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
