use indexmap::IndexSet;
use tracing::debug;

use crate::constants::*;
use crate::error::Result;
use crate::table::{Column, ScalarType, Schema, Table, Value};

/// Distinct tuples of `key_columns` in first-seen order, keyed 1..=n.
///
/// The output schema is the surrogate key column (Int64) followed by the key
/// columns with their source types. Null is an ordinary member value.
pub fn build_dimension(
    source: &Table,
    source_name: &str,
    output_name: &str,
    key_columns: &[&str],
    surrogate_key: &str,
) -> Result<Table> {
    let indexes = key_columns
        .iter()
        .map(|column| source.schema().require(source_name, column))
        .collect::<Result<Vec<_>>>()?;

    let mut columns = vec![Column::new(surrogate_key, ScalarType::Int64)];
    columns.extend(indexes.iter().map(|&i| source.schema().columns()[i].clone()));
    let schema = Schema::new(columns);

    let mut members: IndexSet<Vec<Value>> = IndexSet::new();
    for row in source.rows() {
        members.insert(indexes.iter().map(|&i| row[i].clone()).collect());
    }
    debug!(
        "{}: {} distinct members from {} rows",
        output_name,
        members.len(),
        source.num_rows()
    );

    let rows = members
        .into_iter()
        .zip(1i64..)
        .map(|(tuple, key)| {
            let mut row = Vec::with_capacity(tuple.len() + 1);
            row.push(Value::Int64(key));
            row.extend(tuple);
            row
        })
        .collect();
    Table::new(output_name, schema, rows)
}

pub fn build_dim_product(sales: &Table) -> Result<Table> {
    build_dimension(sales, SALES_UNIFIED, DIM_PRODUCT, &[PRODUCT_ID], PRODUCT_KEY)
}

pub fn build_dim_location(sales: &Table) -> Result<Table> {
    build_dimension(sales, SALES_UNIFIED, DIM_LOCATION, &[LOCATION, CHANNEL], LOCATION_KEY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DimLocation, DimProduct, SalesChannel};
    use crate::error::PipelineError;
    use crate::table::{from_table, TableRecord};

    fn sales(rows: &[(&str, Option<&str>, SalesChannel)]) -> Table {
        Table::new(
            SALES_UNIFIED,
            Schema::of(&[
                (SALE_ID, ScalarType::Utf8),
                (PRODUCT_ID, ScalarType::Utf8),
                (LOCATION, ScalarType::Utf8),
                (CHANNEL, ScalarType::Utf8),
            ]),
            rows.iter()
                .enumerate()
                .map(|(i, (product, location, channel))| {
                    vec![
                        Value::from(format!("S{}", i)),
                        Value::from(*product),
                        Value::from(location.map(str::to_string)),
                        Value::from(*channel),
                    ]
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_location_keys_follow_first_appearance() {
        let table = sales(&[
            ("P1", Some("S1"), SalesChannel::Offline),
            ("P1", Some("Mumbai"), SalesChannel::Online),
            ("P2", Some("S1"), SalesChannel::Offline),
            ("P3", Some("Delhi"), SalesChannel::Online),
        ]);
        let dim: Vec<DimLocation> = from_table(&build_dim_location(&table).unwrap()).unwrap();

        let keys: Vec<(i64, Option<&str>)> = dim
            .iter()
            .map(|d| (d.location_key, d.location.as_deref()))
            .collect();
        assert_eq!(
            keys,
            vec![(1, Some("S1")), (2, Some("Mumbai")), (3, Some("Delhi"))]
        );
    }

    #[test]
    fn test_same_location_different_channel_is_distinct() {
        let table = sales(&[
            ("P1", Some("Pune"), SalesChannel::Offline),
            ("P1", Some("Pune"), SalesChannel::Online),
        ]);
        assert_eq!(build_dim_location(&table).unwrap().num_rows(), 2);
    }

    #[test]
    fn test_null_location_is_a_member() {
        let table = sales(&[
            ("P1", None, SalesChannel::Online),
            ("P2", None, SalesChannel::Online),
            ("P3", Some("Delhi"), SalesChannel::Online),
        ]);
        let dim: Vec<DimLocation> = from_table(&build_dim_location(&table).unwrap()).unwrap();
        assert_eq!(dim.len(), 2);
        assert_eq!(dim[0].location, None);
    }

    #[test]
    fn test_rebuild_is_identical() {
        let table = sales(&[
            ("P9", Some("S1"), SalesChannel::Offline),
            ("P1", Some("S2"), SalesChannel::Offline),
            ("P9", Some("S3"), SalesChannel::Offline),
            ("P4", Some("S1"), SalesChannel::Offline),
        ]);
        let first = build_dim_product(&table).unwrap();
        let second = build_dim_product(&table).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.fingerprint(), second.fingerprint());

        let dim: Vec<DimProduct> = from_table(&first).unwrap();
        let ids: Vec<&str> = dim.iter().map(|d| d.product_id.as_str()).collect();
        assert_eq!(ids, vec!["P9", "P1", "P4"]);
        assert_eq!(dim.iter().map(|d| d.product_key).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_empty_input_keeps_schema() {
        let dim = build_dim_product(&sales(&[])).unwrap();
        assert!(dim.is_empty());
        assert_eq!(dim.schema(), &DimProduct::schema());
    }

    #[test]
    fn test_missing_key_column() {
        let err = build_dimension(&sales(&[]), SALES_UNIFIED, "dim_x", &["region"], "x_key").unwrap_err();
        assert!(matches!(err, PipelineError::Schema { ref column, .. } if column == "region"));
    }
}
