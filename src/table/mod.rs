//! In-memory tabular data shared by every stage.
//!
//! A [`Table`] is an ordered sequence of rows sharing one [`Schema`]. Stages never
//! mutate a table they were handed; they build new ones.

pub mod json;
pub mod record;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::error::{PipelineError, Result};

pub use record::{from_table, to_table, RowView, TableRecord};

/// Scalar column types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    Utf8,
    Int64,
    Decimal,
    Boolean,
    Date,
    Timestamp,
}

/// A single cell
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    Null,
    Utf8(String),
    Int64(i64),
    Decimal(Decimal),
    Boolean(bool),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn scalar_type(&self) -> Option<ScalarType> {
        match self {
            Value::Null => None,
            Value::Utf8(_) => Some(ScalarType::Utf8),
            Value::Int64(_) => Some(ScalarType::Int64),
            Value::Decimal(_) => Some(ScalarType::Decimal),
            Value::Boolean(_) => Some(ScalarType::Boolean),
            Value::Date(_) => Some(ScalarType::Date),
            Value::Timestamp(_) => Some(ScalarType::Timestamp),
        }
    }

    /// Text view of the value. Blank strings count as missing.
    pub fn coerce_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Utf8(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            other => Some(other.to_string()),
        }
    }

    /// Integer view of the value. Fractional decimals and non-numeric text are missing.
    pub fn coerce_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(n) => Some(*n),
            Value::Decimal(d) if d.fract().is_zero() => i64::try_from(d.trunc()).ok(),
            Value::Utf8(s) => {
                let trimmed = s.trim();
                trimmed
                    .parse::<i64>()
                    .ok()
                    .or_else(|| Decimal::from_str(trimmed).ok().and_then(|d| Value::Decimal(d).coerce_i64()))
            }
            _ => None,
        }
    }

    /// Exact decimal view of the value
    pub fn coerce_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Decimal(d) => Some(*d),
            Value::Int64(n) => Some(Decimal::from(*n)),
            Value::Utf8(s) => {
                let trimmed = s.trim();
                Decimal::from_str(trimmed)
                    .ok()
                    .or_else(|| Decimal::from_scientific(trimmed).ok())
            }
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Utf8(s) => write!(f, "{}", s),
            Value::Int64(n) => write!(f, "{}", n),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%dT%H:%M:%S%.f")),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Utf8(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Utf8(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int64(n)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<Option<String>> for Value {
    fn from(s: Option<String>) -> Self {
        s.map(Value::Utf8).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: ScalarType,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: ScalarType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Ordered mapping from column name to scalar type
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn of(columns: &[(&str, ScalarType)]) -> Self {
        Self::new(
            columns
                .iter()
                .map(|(name, data_type)| Column::new(*name, *data_type))
                .collect(),
        )
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Index of a column the caller cannot work without
    pub fn require(&self, table: &str, name: &str) -> Result<usize> {
        self.index_of(name)
            .ok_or_else(|| PipelineError::schema(table, name))
    }

    pub fn with_column(&self, column: Column) -> Self {
        let mut columns = self.columns.clone();
        columns.push(column);
        Self { columns }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    schema: Schema,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// An empty table with the given schema
    pub fn empty(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    /// Build a table, checking that every row matches the schema's arity and types
    pub fn new(name: &str, schema: Schema, rows: Vec<Vec<Value>>) -> Result<Self> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != schema.len() {
                return Err(PipelineError::malformed(
                    name,
                    format!("row {} has {} values, schema has {} columns", i, row.len(), schema.len()),
                ));
            }
            for (value, column) in row.iter().zip(schema.columns()) {
                if let Some(found) = value.scalar_type() {
                    if found != column.data_type {
                        return Err(PipelineError::malformed(
                            name,
                            format!(
                                "row {} column '{}' holds {:?}, schema declares {:?}",
                                i, column.name, found, column.data_type
                            ),
                        ));
                    }
                }
            }
        }
        Ok(Self { schema, rows })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// New table with one more column. `values` must hold one value per row.
    pub fn with_column(&self, name: &str, column: Column, values: Vec<Value>) -> Result<Self> {
        if values.len() != self.rows.len() {
            return Err(PipelineError::malformed(
                name,
                format!(
                    "column '{}' has {} values for {} rows",
                    column.name,
                    values.len(),
                    self.rows.len()
                ),
            ));
        }
        let schema = self.schema.with_column(column);
        let rows = self
            .rows
            .iter()
            .zip(values)
            .map(|(row, value)| {
                let mut row = row.clone();
                row.push(value);
                row
            })
            .collect();
        Table::new(name, schema, rows)
    }

    /// SHA-256 over the serialized table, hex encoded
    pub fn fingerprint(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(
            "sample",
            Schema::of(&[("id", ScalarType::Utf8), ("qty", ScalarType::Int64)]),
            vec![
                vec![Value::from("a"), Value::Int64(1)],
                vec![Value::from("b"), Value::Null],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_wrong_arity() {
        let err = Table::new(
            "bad",
            Schema::of(&[("id", ScalarType::Utf8)]),
            vec![vec![Value::from("a"), Value::Int64(1)]],
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::MalformedTable { .. }));
    }

    #[test]
    fn test_new_rejects_wrong_type() {
        let err = Table::new(
            "bad",
            Schema::of(&[("id", ScalarType::Int64)]),
            vec![vec![Value::from("a")]],
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::MalformedTable { .. }));
    }

    #[test]
    fn test_require_missing_column_is_schema_error() {
        let table = sample();
        let err = table.schema().require("sample", "price").unwrap_err();
        assert!(matches!(err, PipelineError::Schema { ref column, .. } if column == "price"));
    }

    #[test]
    fn test_with_column_leaves_original_untouched() {
        let table = sample();
        let extended = table
            .with_column(
                "sample",
                Column::new("flag", ScalarType::Boolean),
                vec![Value::Boolean(true), Value::Boolean(false)],
            )
            .unwrap();
        assert_eq!(table.schema().len(), 2);
        assert_eq!(extended.schema().len(), 3);
        assert_eq!(extended.rows()[1][2], Value::Boolean(false));
    }

    #[test]
    fn test_coercions() {
        assert_eq!(Value::from(" 7 ").coerce_i64(), Some(7));
        assert_eq!(Value::from("2.0").coerce_i64(), Some(2));
        assert_eq!(Value::from("2.5").coerce_i64(), None);
        assert_eq!(Value::Decimal(Decimal::new(30, 1)).coerce_i64(), Some(3));
        assert_eq!(Value::from("abc").coerce_i64(), None);
        assert_eq!(Value::Int64(3).coerce_decimal(), Some(Decimal::from(3)));
        assert_eq!(Value::from("10.50").coerce_decimal(), Some(Decimal::new(1050, 2)));
        assert_eq!(Value::from("   ").coerce_text(), None);
        assert_eq!(Value::Int64(42).coerce_text(), Some("42".to_string()));
        assert_eq!(Value::Null.coerce_decimal(), None);
    }

    #[test]
    fn test_fingerprint_is_stable() {
        assert_eq!(sample().fingerprint(), sample().fingerprint());
        let other = Table::empty(sample().schema().clone());
        assert_ne!(sample().fingerprint(), other.fingerprint());
    }
}
