use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::dates::DateParser;
use crate::constants::*;
use crate::domain::CleanInventory;
use crate::error::{PipelineError, Result};
use crate::table::{to_table, Table};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryConformanceReport {
    pub rows_in: usize,
    /// Rows whose negative stock was clamped to zero (kept, not dropped)
    pub negative_stock_clamped: usize,
    pub rows_out: usize,
    pub low_stock: usize,
    pub out_of_stock: usize,
}

#[derive(Debug, Clone)]
pub struct InventoryConformance {
    pub positions: Vec<CleanInventory>,
    pub table: Table,
    pub report: InventoryConformanceReport,
}

/// Validate the warehouse extract and derive stock flags. No row is ever dropped.
#[instrument(skip_all, fields(rows = raw.num_rows()))]
pub fn clean_inventory(parser: &DateParser, raw: &Table) -> Result<InventoryConformance> {
    let schema = raw.schema();
    let warehouse_idx = schema.require(WAREHOUSE_INVENTORY, WAREHOUSE_ID)?;
    let product_idx = schema.require(WAREHOUSE_INVENTORY, PRODUCT_ID)?;
    let stock_idx = schema.require(WAREHOUSE_INVENTORY, STOCK_ON_HAND)?;
    let reorder_idx = schema.require(WAREHOUSE_INVENTORY, REORDER_LEVEL)?;
    let updated_idx = schema.require(WAREHOUSE_INVENTORY, LAST_UPDATED)?;

    let mut clamped = 0;
    let positions = raw
        .rows()
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let unparseable = |column: &str, idx: usize| {
                PipelineError::parse(WAREHOUSE_INVENTORY, column, i, row[idx].to_string())
            };
            let stock = row[stock_idx]
                .coerce_i64()
                .ok_or_else(|| unparseable(STOCK_ON_HAND, stock_idx))?;
            let reorder_level = row[reorder_idx]
                .coerce_i64()
                .ok_or_else(|| unparseable(REORDER_LEVEL, reorder_idx))?;
            let last_updated = parser
                .timestamp_from_value(&row[updated_idx])
                .ok_or_else(|| unparseable(LAST_UPDATED, updated_idx))?;
            if stock < 0 {
                clamped += 1;
            }
            Ok(CleanInventory::derive(
                row[warehouse_idx].coerce_text(),
                row[product_idx].coerce_text(),
                stock,
                reorder_level,
                last_updated,
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    let report = InventoryConformanceReport {
        rows_in: raw.num_rows(),
        negative_stock_clamped: clamped,
        rows_out: positions.len(),
        low_stock: positions.iter().filter(|p| p.is_low_stock).count(),
        out_of_stock: positions.iter().filter(|p| p.is_out_of_stock).count(),
    };
    info!(
        "Cleaned {} inventory rows ({} clamped, {} low stock, {} out of stock)",
        report.rows_out, report.negative_stock_clamped, report.low_stock, report.out_of_stock
    );

    let table = to_table(&positions)?;
    Ok(InventoryConformance {
        positions,
        table,
        report,
    })
}
