//! Tabular results and the name-matching decoder
//!
//! A statement's result is a list of column names plus rows of raw JSON
//! cells. Decoding pairs cell `i` of every row with column `i`, builds a JSON
//! object keyed by column name, and deserializes that object into the
//! caller's type. Field matching is by name, so callers map server column
//! names such as `"a.name"` or `"type(r)"` with `#[serde(rename = "...")]`.
//!
//! Columns the target does not name are ignored. Rows whose width differs
//! from the column count are always an error.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::DecodeError;

/// Column names plus raw, not yet typed rows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabularResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl TabularResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Column names in server order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Every row as a `column -> cell` object.
    ///
    /// Duplicate column names keep the right-most cell.
    pub fn records(&self) -> Result<Vec<Map<String, Value>>, DecodeError> {
        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| self.record(i, row))
            .collect()
    }

    /// Decodes every row into `T` by column name.
    ///
    /// All-or-nothing: the first failing row aborts the whole decode.
    pub fn decode_rows<T: DeserializeOwned>(&self) -> Result<Vec<T>, DecodeError> {
        let mut out = Vec::with_capacity(self.rows.len());
        for (i, row) in self.rows.iter().enumerate() {
            let record = self.record(i, row)?;
            let item = serde_json::from_value(Value::Object(record)).map_err(|e| {
                DecodeError::Type {
                    row: i,
                    message: e.to_string(),
                }
            })?;
            out.push(item);
        }
        Ok(out)
    }

    /// Decodes the only column of every row into `T`.
    ///
    /// Fails fast when the result has more than one column, or has rows but
    /// no column at all.
    pub fn decode_column<T: DeserializeOwned>(&self) -> Result<Vec<T>, DecodeError> {
        if self.columns.len() > 1 || (self.columns.is_empty() && !self.rows.is_empty()) {
            return Err(DecodeError::ColumnCount {
                found: self.columns.len(),
            });
        }
        let mut out = Vec::with_capacity(self.rows.len());
        for (i, row) in self.rows.iter().enumerate() {
            self.check_width(i, row)?;
            let item = serde_json::from_value(row[0].clone()).map_err(|e| DecodeError::Type {
                row: i,
                message: e.to_string(),
            })?;
            out.push(item);
        }
        Ok(out)
    }

    fn record(&self, index: usize, row: &[Value]) -> Result<Map<String, Value>, DecodeError> {
        self.check_width(index, row)?;
        Ok(self
            .columns
            .iter()
            .cloned()
            .zip(row.iter().cloned())
            .collect())
    }

    fn check_width(&self, index: usize, row: &[Value]) -> Result<(), DecodeError> {
        if row.len() != self.columns.len() {
            return Err(DecodeError::RowWidth {
                row: index,
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        Ok(())
    }
}

/// Destination a statement decodes its result into after execution.
///
/// Implementations must leave themselves untouched when they return an
/// error.
pub trait DecodeTarget {
    fn decode_from(&mut self, result: &TabularResult) -> Result<(), DecodeError>;
}

/// Decodes rows into a `Vec<T>` by column name, replacing its contents
pub struct RowsInto<'a, T>(pub &'a mut Vec<T>);

impl<T: DeserializeOwned> DecodeTarget for RowsInto<'_, T> {
    fn decode_from(&mut self, result: &TabularResult) -> Result<(), DecodeError> {
        *self.0 = result.decode_rows()?;
        Ok(())
    }
}

/// Decodes a single-column result into a `Vec<T>` of scalars
pub struct ColumnInto<'a, T>(pub &'a mut Vec<T>);

impl<T: DeserializeOwned> DecodeTarget for ColumnInto<'_, T> {
    fn decode_from(&mut self, result: &TabularResult) -> Result<(), DecodeError> {
        *self.0 = result.decode_column()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, Serialize, PartialEq)]
    struct Named {
        name: String,
    }

    #[derive(Debug, Deserialize, Serialize, PartialEq)]
    struct Commands {
        #[serde(rename = "a.name")]
        a: String,
        #[serde(rename = "type(r)")]
        rel: String,
        b: Named,
    }

    fn commands_result() -> TabularResult {
        TabularResult::new(
            vec!["a.name".into(), "type(r)".into(), "b".into()],
            vec![
                vec![json!("James T Kirk"), json!("Commands"), json!({"name": "Dr McCoy"})],
                vec![json!("James T Kirk"), json!("Commands"), json!({"name": "Spock"})],
            ],
        )
    }

    #[test]
    fn test_decode_by_tagged_name() {
        let rows: Vec<Commands> = commands_result().decode_rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].a, "James T Kirk");
        assert_eq!(rows[0].rel, "Commands");
        assert_eq!(rows[1].b.name, "Spock");
    }

    #[test]
    fn test_round_trip_reproduces_cells() {
        let result = commands_result();
        let rows: Vec<Commands> = result.decode_rows().unwrap();
        let reencoded: Vec<Value> = rows.iter().map(|r| serde_json::to_value(r).unwrap()).collect();
        let records = result.records().unwrap();
        for (value, record) in reencoded.iter().zip(records.iter()) {
            assert_eq!(value, &Value::Object(record.clone()));
        }
    }

    #[test]
    fn test_unmatched_columns_ignored() {
        let result = TabularResult::new(
            vec!["name".into(), "id(n)".into()],
            vec![vec![json!("X"), json!(17)]],
        );
        let rows: Vec<Named> = result.decode_rows().unwrap();
        assert_eq!(rows, vec![Named { name: "X".into() }]);
    }

    #[test]
    fn test_short_row_is_error() {
        let result = TabularResult::new(vec!["a".into(), "b".into()], vec![vec![json!(1)]]);
        let err = result.decode_rows::<Value>().unwrap_err();
        assert_eq!(
            err,
            DecodeError::RowWidth {
                row: 0,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_long_row_is_error() {
        let result = TabularResult::new(vec!["a".into()], vec![vec![json!(1)], vec![json!(1), json!(2)]]);
        assert!(matches!(
            result.decode_rows::<Value>(),
            Err(DecodeError::RowWidth { row: 1, .. })
        ));
    }

    #[test]
    fn test_empty_decode_is_empty_vec() {
        let none = TabularResult::new(vec![], vec![]);
        assert_eq!(none.decode_rows::<Named>().unwrap(), Vec::<Named>::new());

        let one_col = TabularResult::new(vec!["x".into()], vec![]);
        assert!(one_col.decode_rows::<Named>().unwrap().is_empty());
        assert!(one_col.decode_column::<i64>().unwrap().is_empty());
    }

    #[test]
    fn test_type_mismatch_reports_row() {
        let result = TabularResult::new(
            vec!["name".into()],
            vec![vec![json!("ok")], vec![json!(12)]],
        );
        match result.decode_rows::<Named>() {
            Err(DecodeError::Type { row, .. }) => assert_eq!(row, 1),
            other => panic!("expected type error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_column_scalars() {
        let result = TabularResult::new(
            vec!["type(r)".into()],
            vec![vec![json!("know")], vec![json!("love")]],
        );
        let types: Vec<String> = result.decode_column().unwrap();
        assert_eq!(types, vec!["know", "love"]);
    }

    #[test]
    fn test_decode_column_rejects_many_columns() {
        assert_eq!(
            commands_result().decode_column::<Value>().unwrap_err(),
            DecodeError::ColumnCount { found: 3 }
        );
    }

    #[test]
    fn test_target_untouched_on_failure() {
        let mut names = vec![Named { name: "keep".into() }];
        let bad = TabularResult::new(vec!["name".into()], vec![vec![json!("a")], vec![json!(1)]]);
        assert!(RowsInto(&mut names).decode_from(&bad).is_err());
        assert_eq!(names, vec![Named { name: "keep".into() }]);

        let good = TabularResult::new(vec!["name".into()], vec![vec![json!("a")]]);
        RowsInto(&mut names).decode_from(&good).unwrap();
        assert_eq!(names, vec![Named { name: "a".into() }]);
    }
}
