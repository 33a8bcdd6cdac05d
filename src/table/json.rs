//! JSON record import/export for tables.
//!
//! Source extracts arrive as arrays of flat JSON objects. Column order follows the
//! first appearance of each key; column types are inferred from the non-null values.

use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde_json::{Map, Number, Value as Json};
use std::str::FromStr;

use super::{Column, ScalarType, Schema, Table, Value};
use crate::error::{PipelineError, Result};

fn number_to_value(n: &Number) -> Option<Value> {
    if let Some(i) = n.as_i64() {
        return Some(Value::Int64(i));
    }
    if let Some(u) = n.as_u64() {
        return Some(Value::Decimal(Decimal::from(u)));
    }
    let text = n.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
        .map(Value::Decimal)
}

fn json_kind(value: &Json) -> Option<ScalarType> {
    match value {
        Json::Null => None,
        Json::Bool(_) => Some(ScalarType::Boolean),
        Json::Number(n) => match number_to_value(n) {
            Some(Value::Int64(_)) => Some(ScalarType::Int64),
            Some(_) => Some(ScalarType::Decimal),
            None => Some(ScalarType::Utf8),
        },
        _ => Some(ScalarType::Utf8),
    }
}

fn unify(current: Option<ScalarType>, next: ScalarType) -> ScalarType {
    match (current, next) {
        (None, t) => t,
        (Some(a), b) if a == b => a,
        (Some(ScalarType::Int64), ScalarType::Decimal) | (Some(ScalarType::Decimal), ScalarType::Int64) => {
            ScalarType::Decimal
        }
        _ => ScalarType::Utf8,
    }
}

fn convert(value: &Json, target: ScalarType) -> Value {
    match (value, target) {
        (Json::Null, _) => Value::Null,
        (Json::Bool(b), ScalarType::Boolean) => Value::Boolean(*b),
        (Json::Number(n), ScalarType::Int64) => number_to_value(n).unwrap_or(Value::Null),
        (Json::Number(n), ScalarType::Decimal) => match number_to_value(n) {
            Some(Value::Int64(i)) => Value::Decimal(Decimal::from(i)),
            Some(v) => v,
            None => Value::Null,
        },
        (Json::String(s), _) => Value::Utf8(s.clone()),
        (other, _) => Value::Utf8(other.to_string()),
    }
}

/// Build a table from flat JSON objects. Keys absent from a record become nulls.
pub fn table_from_records(name: &str, records: &[Map<String, Json>]) -> Result<Table> {
    let mut kinds: IndexMap<String, Option<ScalarType>> = IndexMap::new();
    for record in records {
        for (key, value) in record {
            let entry = kinds.entry(key.clone()).or_insert(None);
            if let Some(kind) = json_kind(value) {
                *entry = Some(unify(*entry, kind));
            }
        }
    }

    let columns: Vec<Column> = kinds
        .iter()
        .map(|(key, kind)| Column::new(key.clone(), kind.unwrap_or(ScalarType::Utf8)))
        .collect();

    let rows = records
        .iter()
        .map(|record| {
            columns
                .iter()
                .map(|c| record.get(&c.name).map_or(Value::Null, |v| convert(v, c.data_type)))
                .collect()
        })
        .collect();

    Table::new(name, Schema::new(columns), rows)
}

/// Parse a JSON document holding an array of objects
pub fn table_from_json_str(name: &str, text: &str) -> Result<Table> {
    let parsed: Json = serde_json::from_str(text)?;
    let Json::Array(items) = parsed else {
        return Err(PipelineError::malformed(name, "extract must be a JSON array of objects"));
    };
    let records = items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Json::Object(map) => Ok(map),
            _ => Err(PipelineError::malformed(name, format!("element {} is not an object", i))),
        })
        .collect::<Result<Vec<_>>>()?;
    table_from_records(name, &records)
}

fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Utf8(s) => Json::String(s.clone()),
        Value::Int64(n) => Json::from(*n),
        Value::Boolean(b) => Json::Bool(*b),
        other => Json::String(other.to_string()),
    }
}

/// Render rows as JSON objects keyed by column name
pub fn records_from_table(table: &Table) -> Vec<Map<String, Json>> {
    table
        .rows()
        .iter()
        .map(|row| {
            table
                .schema()
                .columns()
                .iter()
                .zip(row)
                .map(|(c, v)| (c.name.clone(), value_to_json(v)))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infers_types_in_first_seen_order() {
        let text = r#"[
            {"transaction_id": "T1", "quantity": 2, "sale_price": 10.5},
            {"transaction_id": "T2", "quantity": null, "sale_price": 4, "note": "late"}
        ]"#;
        let table = table_from_json_str("pos_transactions", text).unwrap();

        let names: Vec<&str> = table.schema().columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["transaction_id", "quantity", "sale_price", "note"]);
        assert_eq!(table.schema().column("quantity").unwrap().data_type, ScalarType::Int64);
        assert_eq!(table.schema().column("sale_price").unwrap().data_type, ScalarType::Decimal);
        assert_eq!(table.rows()[1][2], Value::Decimal(Decimal::from(4)));
        assert_eq!(table.rows()[0][3], Value::Null);
        assert_eq!(table.rows()[1][1], Value::Null);
    }

    #[test]
    fn test_mixed_kinds_fall_back_to_text() {
        let text = r#"[{"store_id": 12}, {"store_id": "S1"}]"#;
        let table = table_from_json_str("pos_transactions", text).unwrap();
        assert_eq!(table.schema().column("store_id").unwrap().data_type, ScalarType::Utf8);
        assert_eq!(table.rows()[0][0], Value::from("12"));
    }

    #[test]
    fn test_rejects_non_array() {
        let err = table_from_json_str("x", r#"{"a": 1}"#).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedTable { .. }));
    }

    #[test]
    fn test_records_from_table() {
        let table = table_from_json_str("x", r#"[{"a": "p", "b": 3}]"#).unwrap();
        let records = records_from_table(&table);
        assert_eq!(records[0]["a"], Json::String("p".to_string()));
        assert_eq!(records[0]["b"], Json::from(3));
    }
}
