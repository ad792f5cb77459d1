//! Row conversion helpers shared by the typed row records

use miette::Diagnostic;
use serde_json::Value;
use thiserror::Error;

use crate::core::loader::Record;

/// A row that cannot be turned into a typed record
#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum RowError {
    #[error("line {line}: missing value for '{column}'")]
    #[diagnostic(code(ion::row::missing))]
    Missing { line: usize, column: String },

    #[error("line {line}: '{value}' in '{column}' is not a number")]
    #[diagnostic(code(ion::row::not_a_number))]
    NotANumber {
        line: usize,
        column: String,
        value: String,
    },

    #[error("line {line}: '{value}' in '{column}' is not a valid level")]
    #[diagnostic(code(ion::row::invalid_level))]
    InvalidLevel {
        line: usize,
        column: String,
        value: String,
    },
}

/// A value that must be present
pub fn required(record: &Record<'_>, column: &str) -> Result<String, RowError> {
    record.string(column).ok_or_else(|| RowError::Missing {
        line: record.line,
        column: column.to_string(),
    })
}

/// An optional decimal number. Thousands separators are accepted.
pub fn number(record: &Record<'_>, columns: &[&str]) -> Result<Option<f64>, RowError> {
    let Some((column, raw)) = columns
        .iter()
        .find_map(|c| record.get(c).map(|v| (*c, v)))
    else {
        return Ok(None);
    };
    let cleaned = raw.replace(',', "");
    let cleaned = cleaned.trim_start_matches('$');
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(Some)
        .ok_or_else(|| RowError::NotANumber {
            line: record.line,
            column: column.to_string(),
            value: raw.to_string(),
        })
}

/// An identifier as the API expects it: numeric ids as numbers
pub fn id_value(raw: &str) -> Value {
    match raw.trim().parse::<i64>() {
        Ok(n) => Value::from(n),
        Err(_) => Value::from(raw.trim()),
    }
}
