//! Bridge between typed records and untyped [`Table`]s.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use super::{Schema, Table, Value};
use crate::error::{PipelineError, Result};

/// A record type that owns a fixed table schema
pub trait TableRecord: Sized {
    /// Stable table name this record shape is stored under
    const TABLE: &'static str;

    fn schema() -> Schema;

    /// Values in the order of [`TableRecord::schema`]
    fn to_row(&self) -> Vec<Value>;

    fn from_row(row: &RowView<'_>) -> Result<Self>;
}

pub fn to_table<R: TableRecord>(records: &[R]) -> Result<Table> {
    let rows = records.iter().map(TableRecord::to_row).collect();
    Table::new(R::TABLE, R::schema(), rows)
}

/// Decode every row of `table` as `R`. Fails fast on the first absent column.
pub fn from_table<R: TableRecord>(table: &Table) -> Result<Vec<R>> {
    let expected = R::schema();
    let indexes = expected
        .columns()
        .iter()
        .map(|c| table.schema().require(R::TABLE, &c.name))
        .collect::<Result<Vec<_>>>()?;

    table
        .rows()
        .iter()
        .enumerate()
        .map(|(row_index, values)| {
            R::from_row(&RowView {
                table: R::TABLE,
                schema: &expected,
                indexes: &indexes,
                values,
                row_index,
            })
        })
        .collect()
}

/// Read access to one row, addressed by column name
pub struct RowView<'a> {
    table: &'static str,
    schema: &'a Schema,
    indexes: &'a [usize],
    values: &'a [Value],
    row_index: usize,
}

impl<'a> RowView<'a> {
    pub fn row_index(&self) -> usize {
        self.row_index
    }

    pub fn get(&self, column: &str) -> Result<&'a Value> {
        let position = self
            .schema
            .index_of(column)
            .ok_or_else(|| PipelineError::schema(self.table, column))?;
        Ok(&self.values[self.indexes[position]])
    }

    fn mismatch(&self, column: &str, expected: &str, found: &Value) -> PipelineError {
        PipelineError::malformed(
            self.table,
            format!(
                "row {} column '{}': expected {}, found {:?}",
                self.row_index, column, expected, found
            ),
        )
    }

    pub fn text(&self, column: &str) -> Result<String> {
        match self.get(column)? {
            Value::Utf8(s) => Ok(s.clone()),
            other => Err(self.mismatch(column, "text", other)),
        }
    }

    pub fn opt_text(&self, column: &str) -> Result<Option<String>> {
        match self.get(column)? {
            Value::Null => Ok(None),
            Value::Utf8(s) => Ok(Some(s.clone())),
            other => Err(self.mismatch(column, "text or null", other)),
        }
    }

    pub fn int(&self, column: &str) -> Result<i64> {
        match self.get(column)? {
            Value::Int64(n) => Ok(*n),
            other => Err(self.mismatch(column, "integer", other)),
        }
    }

    /// Integer column narrowed to `T`; a value outside `T`'s range is malformed
    pub fn narrow_int<T: TryFrom<i64>>(&self, column: &str) -> Result<T> {
        let n = self.int(column)?;
        T::try_from(n).map_err(|_| self.mismatch(column, std::any::type_name::<T>(), &Value::Int64(n)))
    }

    pub fn decimal(&self, column: &str) -> Result<Decimal> {
        match self.get(column)? {
            Value::Decimal(d) => Ok(*d),
            other => Err(self.mismatch(column, "decimal", other)),
        }
    }

    pub fn boolean(&self, column: &str) -> Result<bool> {
        match self.get(column)? {
            Value::Boolean(b) => Ok(*b),
            other => Err(self.mismatch(column, "boolean", other)),
        }
    }

    pub fn date(&self, column: &str) -> Result<NaiveDate> {
        match self.get(column)? {
            Value::Date(d) => Ok(*d),
            other => Err(self.mismatch(column, "date", other)),
        }
    }

    pub fn timestamp(&self, column: &str) -> Result<NaiveDateTime> {
        match self.get(column)? {
            Value::Timestamp(ts) => Ok(*ts),
            other => Err(self.mismatch(column, "timestamp", other)),
        }
    }
}
