use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::dates::DateParser;
use super::mapping::{CanonicalField, SalesSource};
use super::quality::{self, DropCounts};
use crate::constants::SALES_UNIFIED;
use crate::domain::UnifiedSale;
use crate::error::{PipelineError, Result};
use crate::table::{to_table, Table};

/// Row accounting for one `unify_sales` run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesConformanceReport {
    pub pos_rows_in: usize,
    pub ecommerce_rows_in: usize,
    pub rows_in: usize,
    pub dropped: DropCounts,
    pub rows_out: usize,
}

#[derive(Debug, Clone)]
pub struct SalesConformance {
    pub sales: Vec<UnifiedSale>,
    pub table: Table,
    pub report: SalesConformanceReport,
}

/// Reconcile the POS and e-commerce extracts into one validated sales table.
///
/// POS rows come first, then e-commerce rows, each in input order. Schema problems
/// and unparseable dates on surviving rows are fatal; everything else is filtered.
#[instrument(skip_all, fields(pos_rows = pos.num_rows(), ecommerce_rows = ecommerce.num_rows()))]
pub fn unify_sales(parser: &DateParser, pos: &Table, ecommerce: &Table) -> Result<SalesConformance> {
    // Resolve both schemas before touching any row
    let mut staged = SalesSource::Pos.stage(pos)?;
    staged.extend(SalesSource::Ecommerce.stage(ecommerce)?);
    let rows_in = staged.len();

    let (checked, dropped) = quality::apply(staged);

    let sales = checked
        .into_iter()
        .map(|sale| {
            let sale_date = parser.date_from_value(&sale.sale_date).ok_or_else(|| {
                PipelineError::parse(
                    sale.source.table_name(),
                    sale.source.source_column(CanonicalField::SaleDate),
                    sale.source_row,
                    sale.sale_date.to_string(),
                )
            })?;
            UnifiedSale::derive(
                sale.sale_id,
                sale_date,
                sale.product_id,
                sale.quantity,
                sale.unit_price,
                sale.channel,
                sale.location,
            )
            .ok_or_else(|| {
                PipelineError::malformed(SALES_UNIFIED, format!("revenue overflow at source row {}", sale.source_row))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let report = SalesConformanceReport {
        pos_rows_in: pos.num_rows(),
        ecommerce_rows_in: ecommerce.num_rows(),
        rows_in,
        dropped,
        rows_out: sales.len(),
    };

    if dropped.total() > 0 {
        warn!(
            "Filtered {} sales rows: {} duplicate sale_ids, {} missing required fields, {} out of range",
            dropped.total(),
            dropped.duplicate_key,
            dropped.missing_required,
            dropped.out_of_range
        );
    }
    info!("Unified {} of {} sales rows", report.rows_out, report.rows_in);

    let table = to_table(&sales)?;
    Ok(SalesConformance { sales, table, report })
}
