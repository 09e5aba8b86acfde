//! Wire shapes of the statement endpoints and attaching responses to
//! statements

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{DecodeError, StatementError};
use super::result::TabularResult;
use super::statement::{Statement, WireStatement};
use crate::errors::{Error, Result};

/// `{"statements": [...]}`
#[derive(Debug, Clone, Serialize)]
pub struct StatementsRequest {
    pub statements: Vec<WireStatement>,
}

impl StatementsRequest {
    /// Encodes every statement; the first encode failure aborts.
    pub fn encode(statements: &[Statement<'_>]) -> Result<Self> {
        let statements = statements
            .iter()
            .map(|s| s.encode())
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { statements })
    }

    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(|e| {
            Error::Transport(crate::transport::TransportError::Serialize(e.to_string()))
        })
    }
}

/// One row of `data`: either `{"row": [...]}` or a bare array.
///
/// `Bare` is tried first: serde would also accept a one-element array as
/// the struct form.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireRow {
    Bare(Vec<Value>),
    Tagged { row: Vec<Value> },
}

impl WireRow {
    fn into_cells(self) -> Vec<Value> {
        match self {
            WireRow::Tagged { row } => row,
            WireRow::Bare(cells) => cells,
        }
    }
}

/// Result of one statement
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireResult {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub data: Vec<WireRow>,
    /// Errors the server attributed to this statement
    #[serde(default)]
    pub errors: Vec<StatementError>,
}

impl WireResult {
    fn into_parts(self) -> (TabularResult, Vec<StatementError>) {
        let rows = self.data.into_iter().map(WireRow::into_cells).collect();
        (TabularResult::new(self.columns, rows), self.errors)
    }
}

/// `transaction` member of a transaction response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireTxInfo {
    #[serde(default)]
    pub expires: Option<String>,
}

/// Body returned by the transaction and autocommit endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatementsResponse {
    #[serde(default)]
    pub commit: Option<String>,
    #[serde(default)]
    pub results: Vec<WireResult>,
    #[serde(default)]
    pub transaction: Option<WireTxInfo>,
    /// Errors not nested inside a result entry
    #[serde(default)]
    pub errors: Vec<StatementError>,
}

impl StatementsResponse {
    /// Parses a response body; a missing body is an empty response
    pub fn from_body(operation: &'static str, body: Option<Value>) -> Result<Self> {
        match body {
            None => Ok(Self::default()),
            Some(value) => serde_json::from_value(value).map_err(|e| Error::BadResponse {
                operation,
                reason: e.to_string(),
            }),
        }
    }
}

/// What attaching a response to its statements produced
#[derive(Debug, Default)]
pub struct Attached {
    /// Statement errors, each attributed where possible
    pub errors: Vec<StatementError>,
    /// First decode failure and the statement it happened on
    pub decode_error: Option<(usize, DecodeError)>,
}

/// Attaches `results` and `errors` to `statements` and decodes every
/// statement that has a target.
///
/// Results line up with statements by position. Errors nested in a result
/// belong to that statement. A top-level error is attributed to the first
/// statement with no result, since the server stops at a failing statement;
/// when every statement has a result it belongs to the exchange as a whole.
///
/// A statement with its own error is not decoded. Decoding continues past a
/// failing statement so siblings still reach their targets.
pub fn attach_results(
    operation: &'static str,
    statements: &mut [Statement<'_>],
    results: Vec<WireResult>,
    errors: Vec<StatementError>,
) -> Result<Attached> {
    if results.len() > statements.len() {
        return Err(Error::BadResponse {
            operation,
            reason: format!(
                "{} results for {} statements",
                results.len(),
                statements.len()
            ),
        });
    }
    if results.len() < statements.len() && errors.is_empty() {
        let nested_errors = results.iter().any(|r| !r.errors.is_empty());
        if !nested_errors {
            return Err(Error::BadResponse {
                operation,
                reason: format!(
                    "result count {} does not match statement count {}",
                    results.len(),
                    statements.len()
                ),
            });
        }
    }

    for statement in statements.iter_mut() {
        statement.reset();
    }

    let result_count = results.len();
    let mut attached = Attached::default();

    for (index, result) in results.into_iter().enumerate() {
        let (table, nested) = result.into_parts();
        statements[index].set_result(table);
        for error in nested {
            let error = error.at(index);
            statements[index].set_error(error.clone());
            attached.errors.push(error);
        }
    }

    let culprit = if result_count < statements.len() {
        Some(result_count)
    } else {
        None
    };
    for mut error in errors {
        if let Some(index) = culprit {
            error = error.at(index);
            statements[index].set_error(error.clone());
        }
        attached.errors.push(error);
    }

    for (index, statement) in statements.iter_mut().enumerate() {
        if !statement.has_target() || !statement.is_executed() || statement.error().is_some() {
            continue;
        }
        if let Err(e) = statement.decode_into_target() {
            if attached.decode_error.is_none() {
                attached.decode_error = Some((index, e));
            }
        }
    }

    Ok(attached)
}
