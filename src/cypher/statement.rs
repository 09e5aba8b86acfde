//! Statements and their wire encoding

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::{DecodeError, EncodeError, StatementError};
use super::normalize::normalize_whitespace;
use super::result::{ColumnInto, DecodeTarget, RowsInto, TabularResult};

/// Wire form of one statement.
///
/// `parameters` is omitted entirely when the statement has none; an
/// explicitly empty map is sent as `{}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireStatement {
    pub statement: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Map<String, Value>>,
}

/// A Cypher statement: text, parameters, and an optional decode target.
///
/// After execution the statement keeps its raw [`TabularResult`] (or the
/// [`StatementError`] the server reported for it), so results can be decoded
/// again later into any type.
///
/// ```ignore
/// #[derive(Deserialize)]
/// struct Row {
///     #[serde(rename = "n.name")]
///     name: String,
/// }
///
/// let mut rows: Vec<Row> = Vec::new();
/// let mut stmt = Statement::new("MATCH (n:Person) WHERE n.name = $name RETURN n.name")
///     .param("name", "X")
///     .into_rows(&mut rows);
/// db.cypher(&mut stmt)?;
/// ```
pub struct Statement<'a> {
    text: String,
    parameters: Option<Map<String, Value>>,
    /// First parameter that failed to encode; reported by `encode()`
    param_error: Option<EncodeError>,
    target: Option<Box<dyn DecodeTarget + 'a>>,
    result: Option<TabularResult>,
    error: Option<StatementError>,
}

impl<'a> Statement<'a> {
    /// Statement with no parameters
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parameters: None,
            param_error: None,
            target: None,
            result: None,
            error: None,
        }
    }

    /// Adds one parameter.
    ///
    /// A value that cannot be represented as JSON is not coerced; the
    /// failure is reported when the statement is encoded.
    pub fn param(mut self, name: impl Into<String>, value: impl Serialize) -> Self {
        let name = name.into();
        match serde_json::to_value(value) {
            Ok(v) => {
                self.parameters.get_or_insert_with(Map::new).insert(name, v);
            }
            Err(e) => {
                if self.param_error.is_none() {
                    self.param_error = Some(EncodeError::InvalidParameter {
                        name,
                        reason: e.to_string(),
                    });
                }
            }
        }
        self
    }

    /// Replaces all parameters with `params`, which must encode to a JSON
    /// object. `null` clears the parameters.
    pub fn params(mut self, params: impl Serialize) -> Self {
        match serde_json::to_value(params) {
            Ok(Value::Object(map)) => self.parameters = Some(map),
            Ok(Value::Null) => self.parameters = None,
            Ok(other) => {
                self.param_error = Some(EncodeError::ParametersNotObject(json_kind(&other)));
            }
            Err(e) => {
                self.param_error = Some(EncodeError::InvalidParameter {
                    name: "*".to_string(),
                    reason: e.to_string(),
                });
            }
        }
        self
    }

    /// Decode rows into `dest` by column name after execution
    pub fn into_rows<T>(mut self, dest: &'a mut Vec<T>) -> Self
    where
        T: DeserializeOwned + 'a,
    {
        self.target = Some(Box::new(RowsInto(dest)));
        self
    }

    /// Decode the single result column into `dest` after execution
    pub fn into_column<T>(mut self, dest: &'a mut Vec<T>) -> Self
    where
        T: DeserializeOwned + 'a,
    {
        self.target = Some(Box::new(ColumnInto(dest)));
        self
    }

    /// Decode into a caller-provided target after execution
    pub fn into_target(mut self, target: Box<dyn DecodeTarget + 'a>) -> Self {
        self.target = Some(target);
        self
    }

    /// Statement text as written
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Parameters, if any were set
    pub fn parameters(&self) -> Option<&Map<String, Value>> {
        self.parameters.as_ref()
    }

    /// Builds the wire form: normalized text plus parameters
    pub fn encode(&self) -> Result<WireStatement, EncodeError> {
        if let Some(ref e) = self.param_error {
            return Err(e.clone());
        }
        let statement = normalize_whitespace(&self.text);
        if statement.is_empty() {
            return Err(EncodeError::EmptyStatement);
        }
        Ok(WireStatement {
            statement,
            parameters: self.parameters.clone(),
        })
    }

    /// Column names of the last execution; empty before execution
    pub fn columns(&self) -> &[String] {
        self.result.as_ref().map(|r| r.columns()).unwrap_or(&[])
    }

    /// Raw result of the last execution
    pub fn result(&self) -> Option<&TabularResult> {
        self.result.as_ref()
    }

    /// Error the server reported for this statement on the last execution
    pub fn error(&self) -> Option<&StatementError> {
        self.error.as_ref()
    }

    /// True once a result has been attached
    pub fn is_executed(&self) -> bool {
        self.result.is_some()
    }

    /// Decodes the last result by column name
    pub fn rows<T: DeserializeOwned>(&self) -> Result<Vec<T>, DecodeError> {
        self.result
            .as_ref()
            .ok_or(DecodeError::NotExecuted)?
            .decode_rows()
    }

    /// Decodes the single column of the last result
    pub fn column<T: DeserializeOwned>(&self) -> Result<Vec<T>, DecodeError> {
        self.result
            .as_ref()
            .ok_or(DecodeError::NotExecuted)?
            .decode_column()
    }

    pub(crate) fn has_target(&self) -> bool {
        self.target.is_some()
    }

    /// Forgets the outcome of a previous execution
    pub(crate) fn reset(&mut self) {
        self.result = None;
        self.error = None;
    }

    pub(crate) fn set_result(&mut self, result: TabularResult) {
        self.result = Some(result);
    }

    pub(crate) fn set_error(&mut self, error: StatementError) {
        // Keep the first error the server reported for this statement.
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Runs the decode target against the attached result
    pub(crate) fn decode_into_target(&mut self) -> Result<(), DecodeError> {
        let result = self.result.as_ref().ok_or(DecodeError::NotExecuted)?;
        match self.target.as_mut() {
            Some(target) => target.decode_from(result),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Statement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("text", &self.text)
            .field("parameters", &self.parameters)
            .field("has_target", &self.target.is_some())
            .field("result", &self.result)
            .field("error", &self.error)
            .finish()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
