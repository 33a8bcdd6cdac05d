//! Declarative mapping from each sales source to the canonical sale shape.
//!
//! Every canonical field has exactly one source column per variant. Channel is
//! never read from input data; it is a constant of the variant.

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::domain::{SalesChannel, UnifiedSale};
use crate::error::Result;
use crate::table::{Table, Value};

/// Canonical sale fields that are copied from a source column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    SaleId,
    SaleDate,
    ProductId,
    Quantity,
    UnitPrice,
    Location,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 6] = [
        CanonicalField::SaleId,
        CanonicalField::SaleDate,
        CanonicalField::ProductId,
        CanonicalField::Quantity,
        CanonicalField::UnitPrice,
        CanonicalField::Location,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CanonicalField::SaleId => SALE_ID,
            CanonicalField::SaleDate => SALE_DATE,
            CanonicalField::ProductId => PRODUCT_ID,
            CanonicalField::Quantity => QUANTITY,
            CanonicalField::UnitPrice => UNIT_PRICE,
            CanonicalField::Location => LOCATION,
        }
    }

    fn slot(&self) -> usize {
        *self as usize
    }
}

const POS_MAPPING: [(CanonicalField, &str); 6] = [
    (CanonicalField::SaleId, "transaction_id"),
    (CanonicalField::SaleDate, "date"),
    (CanonicalField::ProductId, "product_id"),
    (CanonicalField::Quantity, "quantity"),
    (CanonicalField::UnitPrice, "sale_price"),
    (CanonicalField::Location, "store_id"),
];

const ECOMMERCE_MAPPING: [(CanonicalField, &str); 6] = [
    (CanonicalField::SaleId, "order_id"),
    (CanonicalField::SaleDate, "order_date"),
    (CanonicalField::ProductId, "product_id"),
    (CanonicalField::Quantity, "quantity"),
    (CanonicalField::UnitPrice, "unit_price"),
    (CanonicalField::Location, "shipping_city"),
];

/// The two structurally different sales extracts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalesSource {
    Pos,
    Ecommerce,
}

impl SalesSource {
    pub fn table_name(&self) -> &'static str {
        match self {
            SalesSource::Pos => POS_TRANSACTIONS,
            SalesSource::Ecommerce => ECOMMERCE_ORDERS,
        }
    }

    pub fn channel(&self) -> SalesChannel {
        match self {
            SalesSource::Pos => SalesChannel::Offline,
            SalesSource::Ecommerce => SalesChannel::Online,
        }
    }

    pub fn mapping(&self) -> &'static [(CanonicalField, &'static str); 6] {
        match self {
            SalesSource::Pos => &POS_MAPPING,
            SalesSource::Ecommerce => &ECOMMERCE_MAPPING,
        }
    }

    /// Source column that feeds `field`
    pub fn source_column(&self, field: CanonicalField) -> &'static str {
        self.mapping()
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, column)| *column)
            .unwrap_or_else(|| field.name())
    }

    /// Resolve every mapped column against `table`; a missing column is a schema error
    pub fn resolve(&self, table: &Table) -> Result<ResolvedMapping> {
        let mut indexes = [0usize; 6];
        for (field, column) in self.mapping() {
            indexes[field.slot()] = table.schema().require(self.table_name(), column)?;
        }
        Ok(ResolvedMapping {
            source: *self,
            indexes,
        })
    }

    /// Rename a raw table's rows into canonical staged records, in input order
    pub fn stage(&self, table: &Table) -> Result<Vec<StagedSale>> {
        let mapping = self.resolve(table)?;
        Ok(table
            .rows()
            .iter()
            .enumerate()
            .map(|(i, row)| mapping.extract(i, row))
            .collect())
    }
}

/// Column positions of one source table, indexed by canonical field
#[derive(Debug, Clone)]
pub struct ResolvedMapping {
    source: SalesSource,
    indexes: [usize; 6],
}

impl ResolvedMapping {
    fn value(&self, row: &[Value], field: CanonicalField) -> Value {
        row[self.indexes[field.slot()]].clone()
    }

    pub fn extract(&self, source_row: usize, row: &[Value]) -> StagedSale {
        StagedSale {
            source: self.source,
            source_row,
            sale_id: self.value(row, CanonicalField::SaleId),
            sale_date: self.value(row, CanonicalField::SaleDate),
            product_id: self.value(row, CanonicalField::ProductId),
            quantity: self.value(row, CanonicalField::Quantity),
            unit_price: self.value(row, CanonicalField::UnitPrice),
            channel: self.source.channel(),
            location: self.value(row, CanonicalField::Location),
        }
    }
}

/// A sale renamed to canonical fields but not yet validated
#[derive(Debug, Clone, PartialEq)]
pub struct StagedSale {
    pub source: SalesSource,
    /// Row position in the source table, for error reporting
    pub source_row: usize,
    pub sale_id: Value,
    pub sale_date: Value,
    pub product_id: Value,
    pub quantity: Value,
    pub unit_price: Value,
    pub channel: SalesChannel,
    pub location: Value,
}

impl StagedSale {
    /// Re-stage an already conformed sale, e.g. to re-check quality rules
    pub fn from_unified(source_row: usize, sale: &UnifiedSale) -> Self {
        let source = match sale.channel {
            SalesChannel::Offline => SalesSource::Pos,
            SalesChannel::Online => SalesSource::Ecommerce,
        };
        Self {
            source,
            source_row,
            sale_id: Value::from(sale.sale_id.as_str()),
            sale_date: Value::Date(sale.sale_date),
            product_id: Value::from(sale.product_id.as_str()),
            quantity: Value::Int64(sale.quantity),
            unit_price: Value::Decimal(sale.unit_price),
            channel: sale.channel,
            location: Value::from(sale.location.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::table::{ScalarType, Schema};

    fn ecommerce_table() -> Table {
        Table::new(
            ECOMMERCE_ORDERS,
            Schema::of(&[
                ("shipping_city", ScalarType::Utf8),
                ("order_id", ScalarType::Utf8),
                ("order_date", ScalarType::Utf8),
                ("product_id", ScalarType::Utf8),
                ("quantity", ScalarType::Int64),
                ("unit_price", ScalarType::Decimal),
                (SOURCE_SYSTEM, ScalarType::Utf8),
            ]),
            vec![vec![
                Value::from("Mumbai"),
                Value::from("E1"),
                Value::from("2024-01-06"),
                Value::from("P2"),
                Value::Int64(1),
                Value::Decimal(rust_decimal::Decimal::new(500, 2)),
                Value::from("ECOMMERCE"),
            ]],
        )
        .unwrap()
    }

    #[test]
    fn test_every_canonical_field_mapped_once_per_source() {
        for source in [SalesSource::Pos, SalesSource::Ecommerce] {
            for field in CanonicalField::ALL {
                let count = source.mapping().iter().filter(|(f, _)| *f == field).count();
                assert_eq!(count, 1, "{:?} maps {:?} {} times", source, field, count);
            }
        }
    }

    #[test]
    fn test_stage_renames_and_sets_channel() {
        let staged = SalesSource::Ecommerce.stage(&ecommerce_table()).unwrap();
        assert_eq!(staged.len(), 1);
        let sale = &staged[0];
        assert_eq!(sale.sale_id, Value::from("E1"));
        assert_eq!(sale.location, Value::from("Mumbai"));
        assert_eq!(sale.channel, SalesChannel::Online);
        assert_eq!(sale.source_row, 0);
    }

    #[test]
    fn test_missing_source_column_is_schema_error() {
        let table = ecommerce_table();
        let err = SalesSource::Pos.stage(&table).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Schema { ref table, ref column } if table == POS_TRANSACTIONS && column == "transaction_id"
        ));
    }

    #[test]
    fn test_source_column_lookup() {
        assert_eq!(SalesSource::Pos.source_column(CanonicalField::UnitPrice), "sale_price");
        assert_eq!(SalesSource::Ecommerce.source_column(CanonicalField::SaleDate), "order_date");
    }
}
